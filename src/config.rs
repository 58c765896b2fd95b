use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::capture::{CaptureConstraints, DeviceRegistry, SyntheticConfig};
use crate::filter::{RedFilter, Thresholds, DEFAULT_DIM_FACTOR};

const DEFAULT_FPS: u32 = 30;
const MAX_FPS: u32 = 240;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_SYNTHETIC_NOISE: u8 = 6;
const DEFAULT_SYNTHETIC_SEED: u64 = 0x5eed;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ViewerConfigFile {
    device: Option<String>,
    fps: Option<u32>,
    filter: Option<FilterConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FilterConfigFile {
    preset: Option<String>,
    red_floor: Option<u8>,
    green_ceiling: Option<u8>,
    blue_ceiling: Option<u8>,
    dim_factor: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    noise: Option<u8>,
    seed: Option<u64>,
    stills: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Exact device id to open; `None` prefers an environment-facing camera.
    pub device: Option<String>,
    pub fps: u32,
    pub thresholds: Thresholds,
    pub dim_factor: f64,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Preferred size for V4L2 devices and size of synthetic scenes.
    pub width: u32,
    pub height: u32,
    pub noise: u8,
    pub seed: u64,
    /// Images or image directories listed as extra devices.
    pub still_paths: Vec<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device: None,
            fps: DEFAULT_FPS,
            thresholds: Thresholds::STANDARD,
            dim_factor: DEFAULT_DIM_FACTOR,
            capture: CaptureSettings {
                width: DEFAULT_CAPTURE_WIDTH,
                height: DEFAULT_CAPTURE_HEIGHT,
                noise: DEFAULT_SYNTHETIC_NOISE,
                seed: DEFAULT_SYNTHETIC_SEED,
                still_paths: Vec::new(),
            },
        }
    }
}

impl ViewerConfig {
    /// Load from `path`, else from `REDSCOPE_CONFIG`, else defaults; then
    /// apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("REDSCOPE_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let config_path = path.map(Path::to_path_buf).or(env_path);
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ViewerConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let filter = file.filter.unwrap_or_default();
        let base = match filter.preset.as_deref() {
            Some(preset) => Thresholds::parse(preset)?,
            None => defaults.thresholds,
        };
        let thresholds = Thresholds::new(
            filter.red_floor.unwrap_or(base.red_floor),
            filter.green_ceiling.unwrap_or(base.green_ceiling),
            filter.blue_ceiling.unwrap_or(base.blue_ceiling),
        );
        let capture = file.capture.unwrap_or_default();
        Ok(Self {
            device: file.device.filter(|device| !device.trim().is_empty()),
            fps: file.fps.unwrap_or(defaults.fps),
            thresholds,
            dim_factor: filter.dim_factor.unwrap_or(defaults.dim_factor),
            capture: CaptureSettings {
                width: capture.width.unwrap_or(defaults.capture.width),
                height: capture.height.unwrap_or(defaults.capture.height),
                noise: capture.noise.unwrap_or(defaults.capture.noise),
                seed: capture.seed.unwrap_or(defaults.capture.seed),
                still_paths: capture.stills.unwrap_or_default(),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("REDSCOPE_DEVICE") {
            if !device.trim().is_empty() {
                self.device = Some(device);
            }
        }
        if let Ok(thresholds) = std::env::var("REDSCOPE_THRESHOLDS") {
            self.thresholds = Thresholds::parse(&thresholds)
                .map_err(|e| anyhow!("REDSCOPE_THRESHOLDS: {}", e))?;
        }
        if let Ok(dim) = std::env::var("REDSCOPE_DIM_FACTOR") {
            self.dim_factor = dim
                .trim()
                .parse()
                .map_err(|_| anyhow!("REDSCOPE_DIM_FACTOR must be a number between 0 and 1"))?;
        }
        if let Ok(fps) = std::env::var("REDSCOPE_FPS") {
            self.fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("REDSCOPE_FPS must be an integer frame rate"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dim_factor.is_finite() || !(0.0..=1.0).contains(&self.dim_factor) {
            return Err(anyhow!(
                "dim factor must be between 0 and 1, got {}",
                self.dim_factor
            ));
        }
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(anyhow!("fps must be in 1..={}, got {}", MAX_FPS, self.fps));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture size must be non-zero"));
        }
        Ok(())
    }

    pub fn filter(&self) -> RedFilter {
        RedFilter::new(self.thresholds, self.dim_factor)
    }

    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            device_id: self.device.clone(),
            ..CaptureConstraints::default()
        }
    }

    /// Device provider for this configuration.
    pub fn registry(&self) -> DeviceRegistry {
        let synthetic = SyntheticConfig {
            width: self.capture.width,
            height: self.capture.height,
            noise: self.capture.noise,
            seed: self.capture.seed,
            ..SyntheticConfig::default()
        };
        self.capture
            .still_paths
            .iter()
            .fold(DeviceRegistry::new(synthetic), |registry, path| {
                registry.with_still_path(path)
            })
    }
}

fn read_config_file(path: &Path) -> Result<ViewerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ViewerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.thresholds, Thresholds::STANDARD);
        assert_eq!(cfg.dim_factor, 0.9);
        assert_eq!(cfg.constraints(), CaptureConstraints::default());
    }

    #[test]
    fn preset_with_field_override() {
        let file: ViewerConfigFile = toml::from_str(
            r#"
            [filter]
            preset = "strict"
            blue_ceiling = 90
            dim_factor = 0.8
            "#,
        )
        .unwrap();
        let cfg = ViewerConfig::from_file(file).unwrap();
        assert_eq!(cfg.thresholds, Thresholds::new(150, 110, 90));
        assert_eq!(cfg.dim_factor, 0.8);
    }

    #[test]
    fn out_of_range_dim_factor_is_rejected() {
        let cfg = ViewerConfig {
            dim_factor: 1.5,
            ..ViewerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ViewerConfigFile>("colour = \"red\"").is_err());
    }
}

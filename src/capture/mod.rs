//! Camera capture sources.
//!
//! This module provides the sources a viewer can attach to:
//! - Synthetic scenes (`stub://<name>`, always available)
//! - Still images or image directories (filesystem paths)
//! - USB/V4L2 devices (feature: capture-v4l2)
//!
//! A `CameraProvider` enumerates devices and hands out streams for a set of
//! `CaptureConstraints`. A stream is a `CaptureSource`: it is opened once,
//! reports its native size, then draws its current frame into the viewer's
//! RGBA buffer on every tick.
//!
//! Failures surface as `ViewerError::CameraAccess`. Providers never retry and
//! never fall back to another device on their own.

pub(crate) mod normalize;
pub mod still;
pub mod synthetic;
#[cfg(feature = "capture-v4l2")]
pub mod v4l2;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::ViewerError;
use crate::frame::FrameBuffer;

pub use still::StillSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "capture-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Scheme prefix for generated scenes.
pub const STUB_SCHEME: &str = "stub://";

/// Which way a camera points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Away from the user (rear camera).
    Environment,
    /// Towards the user (front camera).
    User,
}

/// A video input as listed to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub facing: Option<FacingMode>,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            facing: infer_facing(&label),
            label,
        }
    }
}

/// What a stream request asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Exact device id. When set, no other device is considered.
    pub device_id: Option<String>,
    /// Preferred facing when no device id is given.
    pub facing: FacingMode,
}

impl CaptureConstraints {
    pub fn device(id: impl Into<String>) -> Self {
        Self {
            device_id: Some(id.into()),
            facing: FacingMode::Environment,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            facing: FacingMode::Environment,
        }
    }
}

/// Native stream properties, known once the stream is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
}

/// Counters exposed by every source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// A live frame stream.
pub trait CaptureSource: Send {
    /// Id of the device backing this stream.
    fn device_id(&self) -> &str;

    /// Start the stream and report its native size.
    fn open(&mut self) -> Result<StreamMetadata>;

    /// Draw the current frame into `frame`. Dimensions must match the stream's.
    fn draw_into(&mut self, frame: &mut FrameBuffer) -> Result<()>;

    /// Stop the stream. Safe to call more than once.
    fn close(&mut self);

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Enumerates devices and opens streams on them.
pub trait CameraProvider {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>>;

    fn request_stream(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureSource>>;
}

/// Default provider: dispatches on the device id scheme.
///
/// - `stub://...` opens a synthetic scene
/// - `/dev/video*` opens a V4L2 device (feature: capture-v4l2)
/// - anything else is treated as a still image or image directory path
pub struct DeviceRegistry {
    synthetic: SyntheticConfig,
    stub_devices: Vec<DeviceInfo>,
    still_paths: Vec<PathBuf>,
    scan_v4l2: bool,
}

impl DeviceRegistry {
    pub fn new(synthetic: SyntheticConfig) -> Self {
        Self {
            synthetic,
            stub_devices: vec![
                DeviceInfo::new("stub://rear", "Synthetic rear camera"),
                DeviceInfo::new("stub://front", "Synthetic front camera"),
            ],
            still_paths: Vec::new(),
            scan_v4l2: cfg!(feature = "capture-v4l2"),
        }
    }

    /// Only list the given synthetic devices.
    pub fn with_stub_devices(mut self, devices: Vec<DeviceInfo>) -> Self {
        self.stub_devices = devices;
        self
    }

    /// List a still image (or directory) as an extra device.
    pub fn with_still_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.still_paths.push(path.into());
        self
    }

    /// Skip scanning `/dev/video*` during enumeration.
    pub fn without_v4l2(mut self) -> Self {
        self.scan_v4l2 = false;
        self
    }

    fn open_device(&self, id: &str) -> Result<Box<dyn CaptureSource>> {
        if id.starts_with(STUB_SCHEME) {
            let mut config = self.synthetic.clone();
            config.device = id.to_string();
            return Ok(Box::new(SyntheticSource::new(config)));
        }
        if id.contains("://") {
            return Err(ViewerError::UnknownDevice(id.to_string()).into());
        }
        if is_v4l2_path(id) {
            return open_v4l2(id, &self.synthetic);
        }
        let path = Path::new(id);
        if !path.exists() {
            return Err(ViewerError::camera_access(id, "no such file or directory").into());
        }
        Ok(Box::new(StillSource::new(path)))
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl CameraProvider for DeviceRegistry {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();
        if self.scan_v4l2 {
            devices.extend(enumerate_v4l2()?);
        }
        devices.extend(self.stub_devices.iter().cloned());
        for path in &self.still_paths {
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            devices.push(DeviceInfo::new(path.display().to_string(), label));
        }
        Ok(devices)
    }

    fn request_stream(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureSource>> {
        if let Some(id) = &constraints.device_id {
            return self.open_device(id);
        }
        let devices = self.enumerate()?;
        let chosen = select_device(&devices, constraints.facing)
            .ok_or_else(|| ViewerError::camera_access("default", "no video input devices"))?;
        log::debug!("capture: selected {} ({})", chosen.id, chosen.label);
        self.open_device(&chosen.id)
    }
}

/// Prefer a device with the requested facing, else the first one listed.
pub fn select_device(devices: &[DeviceInfo], facing: FacingMode) -> Option<&DeviceInfo> {
    devices
        .iter()
        .find(|device| device.facing == Some(facing))
        .or_else(|| devices.first())
}

/// Guess facing from a device label.
pub fn infer_facing(label: &str) -> Option<FacingMode> {
    let label = label.to_lowercase();
    const ENVIRONMENT: [&str; 4] = ["rear", "back", "world", "environment"];
    const USER: [&str; 3] = ["front", "user", "face"];
    if ENVIRONMENT.iter().any(|word| label.contains(word)) {
        Some(FacingMode::Environment)
    } else if USER.iter().any(|word| label.contains(word)) {
        Some(FacingMode::User)
    } else {
        None
    }
}

fn is_v4l2_path(id: &str) -> bool {
    id.starts_with("/dev/video")
}

#[cfg(feature = "capture-v4l2")]
fn open_v4l2(id: &str, synthetic: &SyntheticConfig) -> Result<Box<dyn CaptureSource>> {
    let config = V4l2Config {
        device: id.to_string(),
        width: synthetic.width,
        height: synthetic.height,
        ..V4l2Config::default()
    };
    Ok(Box::new(V4l2Source::new(config)))
}

#[cfg(not(feature = "capture-v4l2"))]
fn open_v4l2(id: &str, _synthetic: &SyntheticConfig) -> Result<Box<dyn CaptureSource>> {
    Err(ViewerError::camera_access(id, "V4L2 capture requires the capture-v4l2 feature").into())
}

#[cfg(feature = "capture-v4l2")]
fn enumerate_v4l2() -> Result<Vec<DeviceInfo>> {
    Ok(v4l2::enumerate_devices())
}

#[cfg(not(feature = "capture-v4l2"))]
fn enumerate_v4l2() -> Result<Vec<DeviceInfo>> {
    Ok(Vec::new())
}

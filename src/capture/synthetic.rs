//! Synthetic frame source.
//!
//! `stub://` devices generate a scene in memory: a dim gradient background
//! with a red block sliding left to right, plus optional seeded sensor noise.
//! The background never satisfies the default red predicate, so with zero
//! noise the red share of every frame is exactly the block's share of the
//! frame area.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::normalize::{to_rgba, PixelFormat};
use super::{CaptureSource, SourceStats, StreamMetadata};
use crate::error::ViewerError;
use crate::frame::FrameBuffer;

const BLOCK_COLOR: [u8; 3] = [220, 30, 25];
const BLOCK_STEP_PX: u32 = 4;

/// Configuration for a synthetic source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticConfig {
    /// Device id (e.g., "stub://rear").
    pub device: String,
    pub width: u32,
    pub height: u32,
    /// Maximum per-channel noise added to every pixel.
    pub noise: u8,
    /// Seed for the noise generator.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            device: "stub://rear".to_string(),
            width: 640,
            height: 480,
            noise: 0,
            seed: 0x5eed,
        }
    }
}

/// Generated-scene source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    frame_count: u64,
    open: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            frame_count: 0,
            open: false,
        }
    }

    /// Width and height of the red block in pixels.
    pub fn block_size(&self) -> (u32, u32) {
        (
            (self.config.width / 4).max(1),
            (self.config.height / 3).max(1),
        )
    }

    fn generate_rgb(&mut self) -> Vec<u8> {
        let SyntheticConfig {
            width,
            height,
            noise,
            ..
        } = self.config;
        let (block_w, block_h) = self.block_size();
        let block_x = ((self.frame_count * BLOCK_STEP_PX as u64) % width.max(1) as u64) as u32;
        let block_y = height / 3;

        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let in_block = (x + width - block_x) % width < block_w
                    && y >= block_y
                    && y < block_y + block_h;
                let rgb = if in_block {
                    BLOCK_COLOR
                } else {
                    [
                        (x * 90 / width) as u8,
                        (y * 90 / height) as u8 + 20,
                        60,
                    ]
                };
                for channel in rgb {
                    pixels.push(self.jitter(channel, noise));
                }
            }
        }
        pixels
    }

    fn jitter(&mut self, channel: u8, noise: u8) -> u8 {
        if noise == 0 {
            return channel;
        }
        let delta: i16 = self.rng.gen_range(-(noise as i16)..=noise as i16);
        (channel as i16 + delta).clamp(0, 255) as u8
    }
}

impl CaptureSource for SyntheticSource {
    fn device_id(&self) -> &str {
        &self.config.device
    }

    fn open(&mut self) -> Result<StreamMetadata> {
        if self.config.width == 0 || self.config.height == 0 {
            return Err(ViewerError::camera_access(
                &self.config.device,
                "synthetic scene has zero size",
            )
            .into());
        }
        self.open = true;
        log::info!(
            "SyntheticSource: opened {} ({}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(StreamMetadata {
            width: self.config.width,
            height: self.config.height,
        })
    }

    fn draw_into(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        if !self.open {
            return Err(ViewerError::camera_access(&self.config.device, "stream not open").into());
        }
        frame.ensure_dimensions(self.config.width, self.config.height)?;
        let rgb = self.generate_rgb();
        let rgba = to_rgba(&rgb, self.config.width, self.config.height, PixelFormat::Rgb24)
            .context("normalize synthetic frame")?;
        frame.as_bytes_mut().copy_from_slice(&rgba);
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            log::info!("SyntheticSource: closed {}", self.config.device);
        }
        self.open = false;
    }

    fn is_healthy(&self) -> bool {
        self.open
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Thresholds;
    use crate::stats::red_percentage;

    fn config(noise: u8) -> SyntheticConfig {
        SyntheticConfig {
            device: "stub://test".to_string(),
            width: 64,
            height: 48,
            noise,
            seed: 7,
        }
    }

    #[test]
    fn produces_opaque_frames_of_configured_size() -> Result<()> {
        let mut source = SyntheticSource::new(config(0));
        let meta = source.open()?;
        assert_eq!((meta.width, meta.height), (64, 48));

        let mut frame = FrameBuffer::new(64, 48)?;
        source.draw_into(&mut frame)?;
        assert!(frame.pixels().all(|px| px[3] == 255));
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn red_share_equals_block_size_without_noise() -> Result<()> {
        let mut source = SyntheticSource::new(config(0));
        source.open()?;
        let mut frame = FrameBuffer::new(64, 48)?;
        for _ in 0..20 {
            source.draw_into(&mut frame)?;
            let stat = red_percentage(frame.as_bytes(), &Thresholds::STANDARD);
            assert_eq!(stat.matched, 16 * 16);
        }
        Ok(())
    }

    #[test]
    fn block_moves_between_frames() -> Result<()> {
        let mut source = SyntheticSource::new(config(0));
        source.open()?;
        let mut first = FrameBuffer::new(64, 48)?;
        let mut second = FrameBuffer::new(64, 48)?;
        source.draw_into(&mut first)?;
        source.draw_into(&mut second)?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn same_seed_same_frames() -> Result<()> {
        let mut a = SyntheticSource::new(config(12));
        let mut b = SyntheticSource::new(config(12));
        a.open()?;
        b.open()?;
        let mut fa = FrameBuffer::new(64, 48)?;
        let mut fb = FrameBuffer::new(64, 48)?;
        a.draw_into(&mut fa)?;
        b.draw_into(&mut fb)?;
        assert_eq!(fa, fb);
        Ok(())
    }

    #[test]
    fn drawing_before_open_fails() -> Result<()> {
        let mut source = SyntheticSource::new(config(0));
        let mut frame = FrameBuffer::new(64, 48)?;
        assert!(source.draw_into(&mut frame).is_err());
        Ok(())
    }

    #[test]
    fn mismatched_buffer_is_rejected() -> Result<()> {
        let mut source = SyntheticSource::new(config(0));
        source.open()?;
        let mut frame = FrameBuffer::new(32, 48)?;
        assert!(source.draw_into(&mut frame).is_err());
        Ok(())
    }
}

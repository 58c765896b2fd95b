//! V4L2 frame source.
//!
//! This module provides `V4l2Source` for capturing frames from local V4L2
//! devices (e.g., /dev/video0) and `enumerate_devices` for listing them.
//!
//! RGB3 is requested. When the driver keeps another format, YUYV and NV12
//! frames are converted to RGBA in memory; other formats fail the stream.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::normalize::{to_rgba, PixelFormat};
use super::{CaptureSource, DeviceInfo, SourceStats, StreamMetadata};
use crate::error::ViewerError;
use crate::frame::FrameBuffer;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate. 0 leaves the driver default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// List V4L2 capture nodes.
pub fn enumerate_devices() -> Vec<DeviceInfo> {
    v4l::context::enum_devices()
        .into_iter()
        .map(|node| {
            let id = node.path().display().to_string();
            let label = node
                .name()
                .unwrap_or_else(|| format!("Video device {}", node.index()));
            DeviceInfo::new(id, label)
        })
        .collect()
}

/// Production V4L2 source using libv4l.
pub struct V4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    format: PixelFormat,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            format: PixelFormat::Rgb24,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        self.format = pixel_format(&format.fourcc.repr)?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceV4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.format
        );
        Ok(())
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

impl CaptureSource for V4l2Source {
    fn device_id(&self) -> &str {
        &self.config.device
    }

    fn open(&mut self) -> Result<StreamMetadata> {
        self.connect()
            .map_err(|err| ViewerError::camera_access(&self.config.device, format!("{:#}", err)))?;
        Ok(StreamMetadata {
            width: self.active_width,
            height: self.active_height,
        })
    }

    fn draw_into(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        use v4l::io::traits::CaptureStream;

        frame.ensure_dimensions(self.active_width, self.active_height)?;
        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (buf, meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture v4l2 frame")
            })?;
        let used = (meta.bytesused as usize).min(buf.len());
        let payload = if used == 0 { buf } else { &buf[..used] };

        let rgba = to_rgba(payload, self.active_width, self.active_height, self.format)?;
        frame.as_bytes_mut().copy_from_slice(&rgba);

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(())
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Source: disconnected from {}", self.config.device);
        }
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() || self.state.is_none() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

fn pixel_format(fourcc: &[u8; 4]) -> Result<PixelFormat> {
    match fourcc {
        b"RGB3" => Ok(PixelFormat::Rgb24),
        b"YUYV" => Ok(PixelFormat::Yuyv),
        b"NV12" => Ok(PixelFormat::Nv12),
        other => Err(anyhow!(
            "unsupported v4l2 pixel format {}",
            String::from_utf8_lossy(other)
        )),
    }
}

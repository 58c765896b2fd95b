//! Off-screen raster surface.
//!
//! Stands in for a 2D canvas: it owns the RGBA buffer frames are drawn into,
//! hands it out for in-place processing (get/put image data), and can be
//! cleared to empty. A surface has no buffer until it is sized to a stream.

use anyhow::Result;

use crate::capture::CaptureSource;
use crate::error::ViewerError;
use crate::frame::FrameBuffer;

#[derive(Debug, Default)]
pub struct OffscreenSurface {
    buffer: Option<FrameBuffer>,
}

impl OffscreenSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a buffer of the given size. Existing contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.dimensions() == Some((width, height)) {
            if let Some(buffer) = self.buffer.as_mut() {
                buffer.clear();
            }
            return Ok(());
        }
        self.buffer = Some(FrameBuffer::new(width, height)?);
        Ok(())
    }

    /// Drop the buffer; the surface becomes unavailable until resized.
    pub fn release(&mut self) {
        self.buffer = None;
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.buffer.as_ref().map(FrameBuffer::dimensions)
    }

    pub fn is_available(&self) -> bool {
        self.buffer.is_some()
    }

    /// Draw the source's current frame onto the surface.
    pub fn draw_from(&mut self, source: &mut dyn CaptureSource) -> Result<()> {
        let buffer = self.image_data_mut()?;
        source.draw_into(buffer)
    }

    /// Read access to the pixels.
    pub fn image_data(&self) -> Result<&FrameBuffer> {
        self.buffer
            .as_ref()
            .ok_or_else(|| ViewerError::SurfaceUnavailable.into())
    }

    /// In-place access to the pixels for one processing pass.
    pub fn image_data_mut(&mut self) -> Result<&mut FrameBuffer> {
        self.buffer
            .as_mut()
            .ok_or_else(|| ViewerError::SurfaceUnavailable.into())
    }

    /// Replace the pixels with `frame`. Dimensions must match.
    pub fn put_image_data(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.image_data_mut()?.copy_from(frame)
    }

    /// Clear every pixel to transparent black.
    pub fn clear(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
    }

    pub fn is_blank(&self) -> bool {
        self.buffer
            .as_ref()
            .map_or(true, |buffer| buffer.as_bytes().iter().all(|&b| b == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{SyntheticConfig, SyntheticSource};

    #[test]
    fn unsized_surface_is_unavailable() {
        let mut surface = OffscreenSurface::new();
        let err = surface.image_data_mut().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::SurfaceUnavailable)
        ));
        assert!(surface.is_blank());
    }

    #[test]
    fn draw_then_clear() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            width: 8,
            height: 6,
            ..SyntheticConfig::default()
        });
        let meta = source.open()?;

        let mut surface = OffscreenSurface::new();
        surface.resize(meta.width, meta.height)?;
        surface.draw_from(&mut source)?;
        assert!(!surface.is_blank());

        surface.clear();
        assert!(surface.is_blank());
        assert_eq!(surface.dimensions(), Some((8, 6)));
        Ok(())
    }

    #[test]
    fn put_image_data_round_trip() -> Result<()> {
        let mut surface = OffscreenSurface::new();
        surface.resize(1, 1)?;
        let frame = FrameBuffer::from_pixels(1, 1, &[[9, 8, 7, 6]])?;
        surface.put_image_data(&frame)?;
        assert_eq!(surface.image_data()?.pixel(0, 0), Some([9, 8, 7, 6]));
        Ok(())
    }
}

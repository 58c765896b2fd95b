//! RGBA frame buffer.
//!
//! `FrameBuffer` is the pixel grid the viewer works on each tick:
//! - 4 bytes per pixel, in (red, green, blue, alpha) order
//! - byte length is always `width * height * 4`
//! - dimensions are fixed when the buffer is allocated

use anyhow::{anyhow, Result};

use crate::error::ViewerError;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Rectangular RGBA pixel grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Allocate a transparent black buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = rgba_len(width, height)?;
        Ok(Self {
            data: vec![0u8; len],
            width,
            height,
        })
    }

    /// Wrap existing RGBA bytes. Fails if the length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = rgba_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGBA frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a buffer from a list of pixels, row-major.
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<Self> {
        let data = pixels.iter().flatten().copied().collect();
        Self::from_rgba(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / BYTES_PER_PIXEL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at (x, y), or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// Reset every byte to zero (transparent black).
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite this buffer with `other`. Dimensions must match.
    pub fn copy_from(&mut self, other: &FrameBuffer) -> Result<()> {
        self.ensure_dimensions(other.width, other.height)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Check that a frame of the given size can be drawn into this buffer.
    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if (width, height) != (self.width, self.height) {
            return Err(ViewerError::FrameMismatch {
                expected: (self.width, self.height),
                actual: (width, height),
            }
            .into());
        }
        Ok(())
    }
}

fn rgba_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| anyhow!("RGBA frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent_black() -> Result<()> {
        let frame = FrameBuffer::new(3, 2)?;
        assert_eq!(frame.as_bytes().len(), 24);
        assert_eq!(frame.pixel_count(), 6);
        assert!(frame.pixels().all(|px| px == [0, 0, 0, 0]));
        Ok(())
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(FrameBuffer::from_rgba(2, 2, vec![0u8; 15]).is_err());
    }

    #[test]
    fn pixel_lookup_is_row_major() -> Result<()> {
        let frame = FrameBuffer::from_pixels(
            2,
            2,
            &[[1, 0, 0, 255], [2, 0, 0, 255], [3, 0, 0, 255], [4, 0, 0, 255]],
        )?;
        assert_eq!(frame.pixel(1, 0), Some([2, 0, 0, 255]));
        assert_eq!(frame.pixel(0, 1), Some([3, 0, 0, 255]));
        assert_eq!(frame.pixel(2, 0), None);
        Ok(())
    }

    #[test]
    fn copy_from_requires_matching_dimensions() -> Result<()> {
        let mut dst = FrameBuffer::new(2, 2)?;
        let src = FrameBuffer::new(4, 1)?;
        let err = dst.copy_from(&src).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::FrameMismatch { .. })
        ));
        Ok(())
    }
}

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "capture-v4l2"), allow(dead_code))]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Driver fallbacks; only V4L2 devices produce these.
    Nv12,
    Yuyv,
}

/// Convert a captured frame to RGBA with opaque alpha.
pub(crate) fn to_rgba(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let area = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            expect_len("RGB", pixels, area * 3)?;
            let mut rgba = Vec::with_capacity(area * 4);
            for px in pixels.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            Ok(rgba)
        }
        PixelFormat::Nv12 => nv12_to_rgba(pixels, w, h, area),
        PixelFormat::Yuyv => yuyv_to_rgba(pixels, w, h, area),
    }
}

fn expect_len(label: &str, pixels: &[u8], expected: usize) -> Result<()> {
    if pixels.len() != expected {
        return Err(anyhow!(
            "{} frame length mismatch: expected {}, got {}",
            label,
            expected,
            pixels.len()
        ));
    }
    Ok(())
}

fn nv12_to_rgba(pixels: &[u8], w: usize, h: usize, y_plane: usize) -> Result<Vec<u8>> {
    expect_len("NV12", pixels, y_plane + y_plane / 2)?;

    let mut rgba = vec![255u8; y_plane * 4];
    for j in 0..h {
        for i in 0..w {
            let y = pixels[j * w + i] as f32;
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;
            write_yuv(&mut rgba[(j * w + i) * 4..], y, u, v);
        }
    }
    Ok(rgba)
}

fn yuyv_to_rgba(pixels: &[u8], w: usize, h: usize, area: usize) -> Result<Vec<u8>> {
    if w % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", w));
    }
    expect_len("YUYV", pixels, area * 2)?;

    let mut rgba = vec![255u8; area * 4];
    for (pair, chunk) in pixels.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        let offset = pair * 8;
        write_yuv(&mut rgba[offset..], chunk[0] as f32, u, v);
        write_yuv(&mut rgba[offset + 4..], chunk[2] as f32, u, v);
    }
    debug_assert_eq!(rgba.len(), w * h * 4);
    Ok(rgba)
}

fn write_yuv(out: &mut [u8], y: f32, u: f32, v: f32) {
    out[0] = clamp_to_u8(y + 1.402_f32 * v);
    out[1] = clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v);
    out[2] = clamp_to_u8(y + 1.772_f32 * u);
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_conversion_produces_gray() -> Result<()> {
        let y_plane = vec![128u8; 4];
        let uv_plane = vec![128u8; 2];
        let nv12 = [y_plane, uv_plane].concat();

        let rgba = to_rgba(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(rgba, [128, 128, 128, 255].repeat(4));
        Ok(())
    }

    #[test]
    fn yuyv_conversion_keeps_per_pixel_luma() -> Result<()> {
        let yuyv = vec![16u8, 128, 235, 128];
        let rgba = to_rgba(&yuyv, 2, 1, PixelFormat::Yuyv)?;
        assert_eq!(rgba, vec![16, 16, 16, 255, 235, 235, 235, 255]);
        Ok(())
    }

    #[test]
    fn rgb_gains_opaque_alpha() -> Result<()> {
        let rgba = to_rgba(&[1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Rgb24)?;
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        Ok(())
    }

    #[test]
    fn length_is_validated() {
        assert!(to_rgba(&[0u8; 8], 1, 3, PixelFormat::Rgb24).is_err());
        assert!(to_rgba(&[0u8; 4], 3, 1, PixelFormat::Yuyv).is_err());
    }
}

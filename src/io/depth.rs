//! 16-bit depth image decoding into pre-allocated frames.

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::ColorType;

use crate::tracking::frame::DepthFrame;

/// Decodes a depth image file into an existing frame buffer.
///
/// Implementations must reject images whose size differs from the buffer.
pub trait DepthLoader {
    fn load_into(&self, path: &Path, frame: &mut DepthFrame) -> Result<()>;
}

/// Single-channel 16-bit PNG loader.
///
/// Raw samples are integer-divided by `depth_factor` (1 for sensors that
/// already store millimetres, 5 for the TUM RGB-D convention).
#[derive(Debug, Clone, Copy)]
pub struct PngDepthLoader {
    pub depth_factor: u16,
}

impl PngDepthLoader {
    pub fn new(depth_factor: u16) -> Self {
        Self {
            depth_factor: depth_factor.max(1),
        }
    }
}

impl Default for PngDepthLoader {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DepthLoader for PngDepthLoader {
    fn load_into(&self, path: &Path, frame: &mut DepthFrame) -> Result<()> {
        let img = image::open(path)
            .with_context(|| format!("Failed to read depth image {:?}", path))?;
        if img.color() != ColorType::L16 {
            bail!(
                "Depth image {:?} is {:?}, expected single-channel 16-bit",
                path,
                img.color()
            );
        }
        let img = img.into_luma16();

        let (w, h) = img.dimensions();
        if w as usize != frame.width || h as usize != frame.height {
            bail!(
                "Depth image {:?} is {}x{}, expected {}x{}",
                path,
                w,
                h,
                frame.width,
                frame.height
            );
        }

        let factor = self.depth_factor;
        for (dst, src) in frame.data.iter_mut().zip(img.as_raw()) {
            *dst = *src / factor;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    fn write_png(path: &Path, w: u32, h: u32, f: impl Fn(u32, u32) -> u16) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(w, h, |x, y| Luma([f(x, y)]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_loads_raw_samples_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.png");
        write_png(&path, 4, 3, |x, y| (y * 1000 + x) as u16);

        let mut frame = DepthFrame::new(4, 3);
        PngDepthLoader::default().load_into(&path, &mut frame).unwrap();

        assert_eq!(frame.data[0], 0);
        assert_eq!(frame.data[3], 3);
        assert_eq!(frame.data[2 * 4 + 1], 2001);
    }

    #[test]
    fn test_depth_factor_divides_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.png");
        write_png(&path, 2, 2, |_, _| 5004);

        let mut frame = DepthFrame::new(2, 2);
        PngDepthLoader::new(5).load_into(&path, &mut frame).unwrap();

        assert!(frame.data.iter().all(|&d| d == 1000));
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.png");
        write_png(&path, 2, 2, |_, _| 1);

        let mut frame = DepthFrame::new(4, 4);
        let err = PngDepthLoader::default().load_into(&path, &mut frame).unwrap_err();
        assert!(err.to_string().contains("expected 4x4"));
    }

    #[test]
    fn test_eight_bit_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gray = dir.path().join("gray8.png");
        let gray_img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Luma([10]));
        gray_img.save(&gray).unwrap();
        let rgb = dir.path().join("rgb8.png");
        let rgb_img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([200, 0, 0]));
        rgb_img.save(&rgb).unwrap();

        let mut frame = DepthFrame::new(2, 2);
        for path in [&gray, &rgb] {
            let err = PngDepthLoader::default().load_into(path, &mut frame).unwrap_err();
            assert!(err.to_string().contains("expected single-channel 16-bit"), "{err}");
        }
        assert!(frame.data.iter().all(|&d| d == 0));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut frame = DepthFrame::new(2, 2);
        let result = PngDepthLoader::default().load_into(Path::new("/nonexistent/d.png"), &mut frame);
        assert!(result.is_err());
    }
}

//! Loading a single hand-drawn digit.
//!
//! Digit images are dark strokes on a light background, the opposite of MNIST, so
//! the pixel scale is inverted while normalizing.

use std::path::Path;

use image::GrayImage;

use crate::mnist::{HEIGHT, WIDTH};
use crate::{Error, Result};

/// Decode an image file into one 784-wide input row.
pub fn load_png<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let p = path.as_ref();
    let img = image::open(p)
        .map_err(|e| Error::InvalidData(format!("failed to decode {}: {e}", p.display())))?;
    let gray = img.to_luma8();
    tracing::debug!(path = %p.display(), width = gray.width(), height = gray.height(), "image decoded");
    from_gray(&gray)
}

/// Normalize an 8-bit grayscale image that must be 28x28.
pub fn from_gray(img: &GrayImage) -> Result<Vec<f32>> {
    let (w, h) = img.dimensions();
    if (w as usize, h as usize) != (WIDTH, HEIGHT) {
        return Err(Error::DimensionMismatch(format!(
            "digit image must be {WIDTH}x{HEIGHT}, got {w}x{h}"
        )));
    }
    Ok(normalize_inverted(img.as_raw()))
}

/// Map raw luminance to `(255 - raw) / 255 * 0.99 + 0.01`, so white is 0.01 and
/// black is 1.0.
pub fn normalize_inverted(raw: &[u8]) -> Vec<f32> {
    raw.iter()
        .map(|&p| (255.0 - p as f32) / 255.0 * 0.99 + 0.01)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnist::PIXELS;
    use image::Luma;

    #[test]
    fn inverts_and_scales() {
        let out = normalize_inverted(&[255, 0, 128]);
        assert!((out[0] - 0.01).abs() < 1e-7);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(out[2] > 0.01 && out[2] < 1.0);
    }

    #[test]
    fn loads_a_png_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digit.png");
        let mut img = GrayImage::from_pixel(28, 28, Luma([255]));
        img.put_pixel(3, 1, Luma([0]));
        img.save(&path).unwrap();

        let row = load_png(&path).unwrap();
        assert_eq!(row.len(), PIXELS);
        assert!((row[28 + 3] - 1.0).abs() < 1e-6);
        assert!((row[0] - 0.01).abs() < 1e-7);
    }

    #[test]
    fn rejects_wrong_size_and_bad_files() {
        let img = GrayImage::from_pixel(10, 28, Luma([0]));
        assert!(matches!(from_gray(&img), Err(Error::DimensionMismatch(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"hello").unwrap();
        assert!(load_png(&path).is_err());
        assert!(load_png(dir.path().join("missing.png")).is_err());
    }
}

//! Rendering of mean faces, eigenfaces and reconstructions to grayscale images.

use image::{GrayImage, Luma};
use ndarray::ArrayView1;
use std::path::Path;

use crate::config::ImageShape;
use crate::error::{EigenfaceError, Result};

/// Converts a flattened image into an 8-bit grayscale image.
///
/// Values are min-max scaled to 0..=255, so eigenfaces (which have arbitrary sign and
/// scale) render the same way as mean faces. A constant vector renders black.
pub fn to_gray_image(values: ArrayView1<f64>, shape: ImageShape) -> Result<GrayImage> {
    if values.len() != shape.n_pixels() {
        return Err(EigenfaceError::DimensionMismatch {
            context: "image rendering",
            expected: shape.n_pixels(),
            got: values.len(),
        });
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let width = shape.width as usize;
    Ok(GrayImage::from_fn(shape.width, shape.height, |x, y| {
        let value = values[y as usize * width + x as usize];
        let scaled = if range > 0.0 { (value - min) / range * 255.0 } else { 0.0 };
        Luma([scaled.round().clamp(0.0, 255.0) as u8])
    }))
}

/// Renders `values` with [`to_gray_image`] and writes it to `path`, creating parent
/// directories as needed. The format follows the file extension (PNG in practice).
pub fn save_grayscale<P: AsRef<Path>>(values: ArrayView1<f64>, shape: ImageShape, path: P) -> Result<()> {
    let path = path.as_ref();
    let image = to_gray_image(values, shape)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path)?;
    Ok(())
}

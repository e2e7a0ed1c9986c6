//! Image preprocessing for tensor-serving models

use crate::config::Preprocessing;
use crate::error::{PlantGuardError, Result};
use image::imageops::FilterType;
use image::DynamicImage;

/// Per-channel ImageNet means in BGR order
const IMAGENET_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Model input laid out as `[row][column][channel]`
pub type ImageTensor = Vec<Vec<[f32; 3]>>;

/// Decode an uploaded image
///
/// # Errors
///
/// Returns `Validation` if the bytes are not a supported image format
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| PlantGuardError::Validation(format!("cannot open image: {}", e)).into())
}

/// Decode, fit and normalize an image into a model input tensor
///
/// The image is converted to RGB, scaled and center-cropped to exactly
/// `target_size` (`[height, width]`) with Lanczos3 resampling, then each
/// pixel is normalized according to `mode`.
pub fn preprocess(bytes: &[u8], target_size: [u32; 2], mode: Preprocessing) -> Result<ImageTensor> {
    let [height, width] = target_size;
    let fitted = decode(bytes)?
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .to_rgb8();

    Ok(fitted
        .rows()
        .map(|row| row.map(|pixel| normalize_pixel(pixel.0, mode)).collect())
        .collect())
}

fn normalize_pixel([r, g, b]: [u8; 3], mode: Preprocessing) -> [f32; 3] {
    match mode {
        Preprocessing::Imagenet => [
            f32::from(b) - IMAGENET_MEAN_BGR[0],
            f32::from(g) - IMAGENET_MEAN_BGR[1],
            f32::from(r) - IMAGENET_MEAN_BGR[2],
        ],
        Preprocessing::Unit => [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        ],
    }
}

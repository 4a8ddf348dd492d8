//! Image normalization: arbitrary raster input to the fixed model tensor.
//!
//! The classifier expects a (1, 48, 48, 1) NHWC tensor of `f32` in
//! [0.0, 1.0]: a single grayscale image, resized to 48x48 with bilinear
//! interpolation and rescaled from 0-255. Aspect ratio is not preserved;
//! the distortion is a known, accepted approximation of the model's
//! training pipeline.

use crate::core::errors::{EmotionError, EmotionResult};
use crate::core::Tensor4D;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use std::path::Path;

/// Model input height in pixels.
pub const INPUT_HEIGHT: u32 = 48;
/// Model input width in pixels.
pub const INPUT_WIDTH: u32 = 48;

/// Decodes the file at `path` and normalizes it to the model tensor.
///
/// Fails with a decode error when the file cannot be parsed as an image,
/// which callers keep distinct from validation failures upstream.
pub fn normalize(path: impl AsRef<Path>) -> EmotionResult<Tensor4D> {
    let img = image::open(path.as_ref()).map_err(EmotionError::ImageDecode)?;
    Ok(image_to_tensor(&img))
}

/// Decodes an in-memory encoded image and normalizes it to the model tensor.
pub fn normalize_bytes(bytes: &[u8]) -> EmotionResult<Tensor4D> {
    let img = image::load_from_memory(bytes).map_err(EmotionError::ImageDecode)?;
    Ok(image_to_tensor(&img))
}

/// Converts a decoded image into the (1, 48, 48, 1) tensor.
///
/// Pure with respect to its input; every produced value lies in [0.0, 1.0]
/// regardless of the source resolution or channel count.
pub fn image_to_tensor(img: &DynamicImage) -> Tensor4D {
    let gray = img.to_luma8();
    let resized = image::imageops::resize(&gray, INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::zeros((1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, 1));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, y as usize, x as usize, 0]] = pixel[0] as f32 / 255.0;
    }
    tensor
}

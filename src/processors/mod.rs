//! Image processing stages of the pipeline.

pub mod normalization;

pub use normalization::{image_to_tensor, normalize, normalize_bytes, INPUT_HEIGHT, INPUT_WIDTH};

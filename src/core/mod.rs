//! Core building blocks of the classification pipeline: error types,
//! ONNX Runtime configuration, and the inference engine.

pub mod config;
pub mod errors;
pub mod inference;

pub use config::{OrtGraphOptimizationLevel, OrtSessionConfig};
pub use errors::{EmotionError, EmotionResult};
pub use inference::{load_session, OrtInfer};

/// 4D `f32` tensor in NHWC layout, the only tensor shape this pipeline moves
/// between stages.
pub type Tensor4D = ndarray::Array4<f32>;

//! High-level predictors over the inference engine.

pub mod emotion;

pub use emotion::{EmotionClassifier, EmotionClassifierBuilder, InferenceBackend};

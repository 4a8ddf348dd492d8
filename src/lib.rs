//! Facial emotion recognition backed by ONNX Runtime.
//!
//! This crate wraps a pretrained grayscale emotion classifier (48x48 input,
//! 7 output classes) behind a small pipeline: decode an image, normalize it
//! to the fixed tensor shape the model expects, run the forward pass, and
//! shape the raw scores into a labeled prediction.
//!
//! The `emonet-server` binary exposes the pipeline over HTTP and as a
//! one-shot CLI.
//!
//! ```no_run
//! use emonet::predictors::EmotionClassifier;
//! use emonet::processors::normalization;
//!
//! # fn main() -> Result<(), emonet::core::EmotionError> {
//! let classifier = EmotionClassifier::builder().build("models/emotion.onnx")?;
//! let tensor = normalization::normalize("face.png")?;
//! let scores = classifier.score(&tensor)?;
//! let prediction = emonet::domain::EmotionPrediction::from_scores(scores);
//! println!("{} ({:.1}%)", prediction.label, prediction.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod predictors;
pub mod processors;
pub mod utils;

pub use crate::core::{EmotionError, EmotionResult};
pub use crate::domain::{EmotionLabel, EmotionPrediction, EMOTION_LABELS, NUM_EMOTIONS};
pub use crate::predictors::EmotionClassifier;

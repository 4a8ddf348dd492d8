//! Error types for the emotion classification pipeline.
//!
//! A decode failure (unreadable or corrupt image) is kept distinct from an
//! inference failure (the model itself raising), because the two map to
//! different failure channels at the request boundary.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type EmotionResult<T> = Result<T, EmotionError>;

/// Errors that can occur while classifying an image.
#[derive(Error, Debug)]
pub enum EmotionError {
    /// The input could not be decoded as an image.
    #[error("image decode")]
    ImageDecode(#[source] image::ImageError),

    /// The model's forward pass failed.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error loading the model artifact, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from basic tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for EmotionError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageDecode(error)
    }
}

impl EmotionError {
    /// Creates a configuration error from context and details.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Wraps an error raised by a model's forward pass.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a model load error for the given path.
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion: suggestion.map(|s| format!("; {s}")).unwrap_or_default(),
            source,
        }
    }

    /// True when the error means the uploaded bytes were not a readable image.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::ImageDecode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_error_formats_suggestion() {
        let err = EmotionError::model_load_error(
            "models/emotion.onnx",
            "failed to create ONNX session",
            Some("verify model file exists and is readable"),
            None,
        );
        let msg = err.to_string();
        assert!(msg.contains("models/emotion.onnx"));
        assert!(msg.contains("; verify model file exists"));
    }

    #[test]
    fn test_config_error_joins_context_and_details() {
        let err = EmotionError::config_error("session pool", "size must be at least 1");
        assert!(matches!(err, EmotionError::ConfigError { .. }));
        assert_eq!(
            err.to_string(),
            "configuration: session pool: size must be at least 1"
        );
    }

    #[test]
    fn test_decode_errors_are_distinguishable() {
        let decode = EmotionError::from(image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated",
        )));
        assert!(decode.is_decode());

        let inference = EmotionError::inference_error(
            "emotion",
            "forward pass",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(!inference.is_decode());
    }
}

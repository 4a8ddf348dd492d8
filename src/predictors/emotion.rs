//! Emotion Classifier
//!
//! Wraps the preloaded scoring model behind a `score(tensor) -> scores`
//! contract. The model is loaded exactly once, when the classifier is
//! built; the classifier is read-only afterwards and safe to share across
//! request handlers.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{EmotionError, EmotionResult};
use crate::core::inference::OrtInfer;
use crate::core::Tensor4D;
use crate::domain::{EmotionPrediction, NUM_EMOTIONS};
use crate::processors::normalization;
use std::path::Path;

/// The forward-pass seam between the classifier and the model runtime.
///
/// Production uses the ONNX Runtime engine; tests substitute a stub scoring
/// function so the pipeline can be exercised without a model artifact.
pub trait InferenceBackend: Send + Sync {
    /// Runs the forward pass and returns the flattened output tensor.
    fn forward(&self, batch: &Tensor4D) -> EmotionResult<Vec<f32>>;
}

impl InferenceBackend for OrtInfer {
    fn forward(&self, batch: &Tensor4D) -> EmotionResult<Vec<f32>> {
        let (_shape, data) = self.infer_4d(batch)?;
        Ok(data)
    }
}

/// Emotion classifier over a preloaded scoring model.
pub struct EmotionClassifier {
    backend: Box<dyn InferenceBackend>,
}

impl EmotionClassifier {
    pub fn builder() -> EmotionClassifierBuilder {
        EmotionClassifierBuilder::new()
    }

    /// Wraps an already-constructed backend. This is the seam used to hand
    /// the request handler a stub scoring function in tests.
    pub fn from_backend(backend: Box<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    /// Scores a normalized (1, 48, 48, 1) tensor.
    ///
    /// Returns exactly one score per emotion class, for the single batch
    /// element. Any failure of the underlying scoring function surfaces as
    /// an inference error; input validation problems never reach here.
    pub fn score(&self, tensor: &Tensor4D) -> EmotionResult<[f32; NUM_EMOTIONS]> {
        let raw = self.backend.forward(tensor)?;
        if raw.len() != NUM_EMOTIONS {
            return Err(EmotionError::InvalidInput {
                message: format!(
                    "model returned {} scores, expected {} (one per emotion class)",
                    raw.len(),
                    NUM_EMOTIONS
                ),
            });
        }
        let mut scores = [0.0f32; NUM_EMOTIONS];
        scores.copy_from_slice(&raw);
        Ok(scores)
    }

    /// Full pipeline over a file on disk: normalize, score, shape.
    pub fn classify_file(&self, path: impl AsRef<Path>) -> EmotionResult<EmotionPrediction> {
        let tensor = normalization::normalize(path)?;
        let scores = self.score(&tensor)?;
        Ok(EmotionPrediction::from_scores(scores))
    }

    /// Full pipeline over in-memory encoded image bytes.
    pub fn classify_bytes(&self, bytes: &[u8]) -> EmotionResult<EmotionPrediction> {
        let tensor = normalization::normalize_bytes(bytes)?;
        let scores = self.score(&tensor)?;
        Ok(EmotionPrediction::from_scores(scores))
    }
}

impl std::fmt::Debug for EmotionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionClassifier").finish_non_exhaustive()
    }
}

/// Builder for [`EmotionClassifier`].
pub struct EmotionClassifierBuilder {
    input_name: Option<String>,
    session_pool_size: usize,
    ort_config: Option<OrtSessionConfig>,
}

impl EmotionClassifierBuilder {
    pub fn new() -> Self {
        Self {
            input_name: None,
            session_pool_size: 1,
            ort_config: None,
        }
    }

    /// Overrides the model's input tensor name (default `input`).
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    /// Sets the session pool size.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = size;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn with_ort_config(mut self, config: OrtSessionConfig) -> Self {
        self.ort_config = Some(config);
        self
    }

    /// Loads the model artifact and builds the classifier.
    ///
    /// This is the only place a session is created; a failure here must be
    /// treated as fatal by callers that serve traffic.
    pub fn build(self, model_path: impl AsRef<Path>) -> EmotionResult<EmotionClassifier> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(EmotionError::model_load_error(
                path,
                "model file not found",
                Some("pass --model or set EMONET_MODEL to a valid .onnx artifact"),
                None,
            ));
        }

        let engine = OrtInfer::with_pool(
            path,
            self.input_name.as_deref(),
            self.session_pool_size,
            self.ort_config.as_ref(),
        )?;
        Ok(EmotionClassifier {
            backend: Box::new(engine),
        })
    }
}

impl Default for EmotionClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EmotionLabel;
    use ndarray::Array4;

    struct FixedBackend(Vec<f32>);

    impl InferenceBackend for FixedBackend {
        fn forward(&self, _batch: &Tensor4D) -> EmotionResult<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn forward(&self, _batch: &Tensor4D) -> EmotionResult<Vec<f32>> {
            Err(EmotionError::inference_error(
                "stub",
                "forward pass",
                std::io::Error::new(std::io::ErrorKind::Other, "numeric failure"),
            ))
        }
    }

    fn unit_tensor() -> Tensor4D {
        Array4::zeros((1, 48, 48, 1))
    }

    #[test]
    fn test_score_returns_one_value_per_class() {
        let classifier = EmotionClassifier::from_backend(Box::new(FixedBackend(vec![
            0.05, 0.01, 0.02, 0.8, 0.04, 0.03, 0.05,
        ])));
        let scores = classifier.score(&unit_tensor()).unwrap();
        assert_eq!(scores.len(), NUM_EMOTIONS);
        assert_eq!(scores[3], 0.8);
    }

    #[test]
    fn test_wrong_output_arity_is_rejected() {
        let classifier = EmotionClassifier::from_backend(Box::new(FixedBackend(vec![0.5; 10])));
        let err = classifier.score(&unit_tensor()).unwrap_err();
        assert!(matches!(err, EmotionError::InvalidInput { .. }));
    }

    #[test]
    fn test_backend_failure_surfaces_as_inference_error() {
        let classifier = EmotionClassifier::from_backend(Box::new(FailingBackend));
        let err = classifier.score(&unit_tensor()).unwrap_err();
        assert!(matches!(err, EmotionError::Inference { .. }));
    }

    #[test]
    fn test_classify_bytes_runs_the_whole_pipeline() {
        let classifier = EmotionClassifier::from_backend(Box::new(FixedBackend(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 0.9, 0.1,
        ])));

        let img = image::RgbImage::from_pixel(200, 200, image::Rgb([90, 90, 90]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut encoded, image::ImageFormat::Png)
            .unwrap();

        let prediction = classifier.classify_bytes(encoded.get_ref()).unwrap();
        assert_eq!(prediction.label, EmotionLabel::Surprise);
        assert!((prediction.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_build_fails_for_missing_model_file() {
        let err = EmotionClassifier::builder()
            .build("does/not/exist.onnx")
            .unwrap_err();
        assert!(matches!(err, EmotionError::ModelLoad { .. }));
    }
}

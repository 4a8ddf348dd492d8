//! The /predict request pipeline.
//!
//! One upload moves through a fixed lifecycle: received, rejected (no file,
//! empty selection, disallowed extension), stored, normalized, scored,
//! succeeded. Rejections short-circuit before anything touches disk; once
//! the file is stored, the RAII guard from [`crate::upload`] guarantees
//! removal at every terminal state, including unexpected failures.

use crate::server::AppState;
use crate::upload::StoredUpload;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emonet::core::EmotionError;
use emonet::domain::EmotionPrediction;
use emonet::predictors::EmotionClassifier;
use emonet::processors::normalization;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Extensions accepted for upload, matched case-insensitively against the
/// substring after the last dot. A filename without a dot is invalid.
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

pub(crate) fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// User-correctable rejections, detected before any file is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationError {
    NoFile,
    EmptySelection,
    BadExtension,
}

impl ValidationError {
    pub(crate) fn message(&self) -> &'static str {
        match self {
            ValidationError::NoFile => "No file provided",
            ValidationError::EmptySelection => "No file selected",
            ValidationError::BadExtension => "Invalid file type. Please upload an image file.",
        }
    }
}

/// Tagged failure channels of the pipeline, one per stage.
#[derive(Debug)]
pub(crate) enum PredictError {
    /// Request rejected during validation.
    Validation(ValidationError),
    /// The multipart body itself could not be read.
    BadRequest(String),
    /// The stored file could not be written.
    Storage(std::io::Error),
    /// The stored file could not be decoded as an image.
    Decode(EmotionError),
    /// The model's forward pass failed.
    Inference(EmotionError),
}

impl PredictError {
    fn public_message(&self) -> String {
        match self {
            PredictError::Validation(v) => v.message().to_string(),
            PredictError::BadRequest(msg) => format!("Malformed upload: {msg}"),
            PredictError::Storage(err) => format!("Failed to store upload: {err}"),
            PredictError::Decode(EmotionError::ImageDecode(src)) => {
                format!("Failed to decode image: {src}")
            }
            PredictError::Decode(err) => format!("Failed to decode image: {err}"),
            PredictError::Inference(err) => format!("Inference failed: {err}"),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        match self {
            PredictError::Validation(_) | PredictError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                Json(RejectionBody {
                    error: self.public_message(),
                }),
            )
                .into_response(),
            PredictError::Storage(_) | PredictError::Decode(_) | PredictError::Inference(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureBody {
                    success: false,
                    error: self.public_message(),
                }),
            )
                .into_response(),
        }
    }
}

/// Wire form of a successful prediction.
#[derive(Debug, Serialize)]
pub(crate) struct PredictResponse {
    pub success: bool,
    pub emotion: String,
    pub confidence: f32,
    pub all_confidences: serde_json::Map<String, serde_json::Value>,
}

impl PredictResponse {
    pub(crate) fn from_prediction(prediction: &EmotionPrediction) -> Self {
        let mut all_confidences = serde_json::Map::new();
        for (label, score) in prediction.confidences() {
            all_confidences.insert(label.as_str().to_string(), serde_json::json!(score));
        }
        Self {
            success: true,
            emotion: prediction.label.as_str().to_string(),
            confidence: prediction.confidence,
            all_confidences,
        }
    }
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct FailureBody {
    success: bool,
    error: String,
}

/// Emotion prediction endpoint
pub(crate) async fn predict_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    match run_pipeline(&state, multipart).await {
        Ok(prediction) => {
            info!(
                request_id = %request_id,
                emotion = %prediction.label,
                confidence = prediction.confidence,
                total_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Prediction completed"
            );
            (
                StatusCode::OK,
                Json(PredictResponse::from_prediction(&prediction)),
            )
                .into_response()
        }
        Err(err) => {
            error!(
                request_id = %request_id,
                error = %err.public_message(),
                total_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Prediction failed"
            );
            err.into_response()
        }
    }
}

/// Drives one upload through the full lifecycle.
async fn run_pipeline(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<EmotionPrediction, PredictError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| PredictError::BadRequest(e.to_string()))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) = upload.ok_or(PredictError::Validation(ValidationError::NoFile))?;
    if filename.is_empty() {
        return Err(PredictError::Validation(ValidationError::EmptySelection));
    }
    if !allowed_file(&filename) {
        return Err(PredictError::Validation(ValidationError::BadExtension));
    }

    // Stored. From here on the guard owns the file's lifetime.
    let stored = state
        .uploads
        .store(&filename, &data)
        .map_err(PredictError::Storage)?;

    classify_stored(&state.classifier, &stored)
}

/// Normalized -> Scored -> Succeeded, each failure on its own channel.
fn classify_stored(
    classifier: &EmotionClassifier,
    stored: &StoredUpload,
) -> Result<EmotionPrediction, PredictError> {
    let tensor = normalization::normalize(stored.path()).map_err(PredictError::Decode)?;
    let scores = classifier.score(&tensor).map_err(PredictError::Inference)?;
    Ok(EmotionPrediction::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::app;
    use crate::upload::UploadStore;
    use axum::body::Body;
    use axum::http::Request;
    use emonet::core::{EmotionResult, Tensor4D};
    use emonet::predictors::InferenceBackend;
    use http_body_util::BodyExt;
    use std::path::Path;
    use tower::ServiceExt;

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
                std::io::Error::new(std::io::ErrorKind::Other, "shape mismatch"),
            ))
        }
    }

    fn test_state(upload_dir: &Path, backend: Box<dyn InferenceBackend>) -> Arc<AppState> {
        Arc::new(AppState {
            classifier: EmotionClassifier::from_backend(backend),
            uploads: UploadStore::new(upload_dir).unwrap(),
        })
    }

    fn happy_backend() -> Box<dyn InferenceBackend> {
        Box::new(FixedBackend(vec![0.01, 0.0, 0.02, 0.9, 0.03, 0.02, 0.02]))
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(200, 200, image::Rgb([120, 100, 80]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut encoded, image::ImageFormat::Png)
            .unwrap();
        encoded.into_inner()
    }

    const BOUNDARY: &str = "emonet-test-boundary";

    fn multipart_request(field_name: &str, filename: Option<&str>, bytes: &[u8]) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{name}\"\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field_name}\"\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_allowed_file_matches_extension_case_insensitively() {
        assert!(allowed_file("face.png"));
        assert!(allowed_file("face.JPG"));
        assert!(allowed_file("face.JpEg"));
        assert!(allowed_file("archive.tar.bmp"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("no_extension"));
        assert!(!allowed_file("trailing."));
    }

    #[tokio::test]
    async fn test_valid_upload_returns_labeled_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), happy_backend());
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request("file", Some("face.JPG"), &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["emotion"], serde_json::json!("happy"));
        let confidence = json["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));

        let all = json["all_confidences"].as_object().unwrap();
        assert_eq!(all.len(), 7);
        for label in ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"] {
            assert!(all.contains_key(label), "missing label {label}");
        }

        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), happy_backend());
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request("note", None, b"just text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "No file provided"})
        );
        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_empty_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), happy_backend());
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request("file", Some(""), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "No file selected"})
        );
    }

    #[tokio::test]
    async fn test_disallowed_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), happy_backend());
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request("file", Some("notes.txt"), b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid file type. Please upload an image file."})
        );
        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_corrupt_image_reports_decode_failure_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), happy_backend());
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request(
                "file",
                Some("corrupt.png"),
                b"these are not image bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], serde_json::json!(false));
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("decode"), "unexpected message: {message}");

        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_inference_failure_reports_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Box::new(FailingBackend));
        let router = app(state, dir.path());

        let response = router
            .oneshot(multipart_request("file", Some("face.png"), &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], serde_json::json!(false));
        assert!(json["error"].as_str().unwrap().contains("Inference failed"));

        assert!(upload_dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_all_confidences_serialize_in_label_order() {
        let prediction = EmotionPrediction::from_scores([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        let response = PredictResponse::from_prediction(&prediction);
        let keys: Vec<&String> = response.all_confidences.keys().collect();
        assert_eq!(
            keys,
            ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"]
        );
    }
}

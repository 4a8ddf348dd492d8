//! ONNX Runtime session handling and the forward-pass engine.
//!
//! ONNX Runtime sessions require `&mut` to run, so concurrent callers must
//! not share one session freely. `OrtInfer` holds a fixed pool of
//! `Mutex<Session>` handed out round-robin: each forward pass locks exactly
//! one session, and a pool larger than one lets parallel requests proceed
//! without contending on a single lock. The session itself is loaded once
//! and never reloaded or mutated afterwards.

use crate::core::config::{OrtGraphOptimizationLevel as OG, OrtSessionConfig};
use crate::core::errors::{EmotionError, EmotionResult};
use crate::core::Tensor4D;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel as GOL, SessionBuilder};
use ort::session::{Session, SessionInputs};
use ort::value::TensorRef;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const SESSION_CREATION_FAILURE: &str = "failed to create ONNX session";

/// Loads a session with default logging configuration.
pub fn load_session(model_path: impl AsRef<Path>) -> EmotionResult<Session> {
    load_session_with(
        model_path,
        |builder| builder.with_log_level(LogLevel::Error),
        Some("verify model file exists and is readable"),
    )
}

/// Builds a session using a caller-provided builder configuration.
fn load_session_with<F>(
    model_path: impl AsRef<Path>,
    configure_builder: F,
    suggestion: Option<&str>,
) -> EmotionResult<Session>
where
    F: FnOnce(SessionBuilder) -> Result<SessionBuilder, ort::Error>,
{
    let path = model_path.as_ref();
    let builder = Session::builder()?;
    let builder = configure_builder(builder)?;
    let session = builder.commit_from_file(path).map_err(|e| {
        EmotionError::model_load_error(path, SESSION_CREATION_FAILURE, suggestion, Some(Box::new(e)))
    })?;
    Ok(session)
}

fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(par) = cfg.parallel_execution {
        builder = builder.with_parallel_execution(par)?;
    }
    if let Some(level) = cfg.optimization_level {
        let mapped = match level {
            OG::DisableAll => GOL::Disable,
            OG::Level1 => GOL::Level1,
            OG::Level2 => GOL::Level2,
            OG::Level3 => GOL::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    builder.with_log_level(LogLevel::Error)
}

/// Forward-pass engine over a pool of ONNX Runtime sessions.
pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("model_name", &self.model_name)
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("pool_size", &self.sessions.len())
            .finish()
    }
}

impl OrtInfer {
    /// Creates a new engine with a single session and default runtime settings.
    pub fn new(model_path: impl AsRef<Path>, input_name: Option<&str>) -> EmotionResult<Self> {
        Self::with_pool(model_path, input_name, 1, None)
    }

    /// Creates a new engine with `pool_size` sessions over the same model,
    /// applying the optional session configuration to each.
    pub fn with_pool(
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
        pool_size: usize,
        ort_config: Option<&OrtSessionConfig>,
    ) -> EmotionResult<Self> {
        if pool_size == 0 {
            return Err(EmotionError::config_error(
                "session pool",
                "size must be at least 1",
            ));
        }

        let path = model_path.as_ref();
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let session = load_session_with(
                path,
                |builder| {
                    if let Some(cfg) = ort_config {
                        apply_ort_config(builder, cfg)
                    } else {
                        builder.with_log_level(LogLevel::Error)
                    }
                },
                Some("verify model path and ONNX opset compatibility"),
            )?;
            sessions.push(Mutex::new(session));
        }

        let model_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown_model".to_string());

        Ok(OrtInfer {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name: input_name.unwrap_or("input").to_string(),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Returns the model path associated with this engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name associated with this engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs the forward pass for a single 4D `f32` input and returns the
    /// first output tensor as `(shape, data)`.
    ///
    /// The engine makes no assumptions about the output shape; the caller
    /// validates it against the label set.
    pub fn infer_4d(&self, batch: &Tensor4D) -> EmotionResult<(Vec<usize>, Vec<f32>)> {
        let dims: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
        let data = batch
            .as_slice()
            .ok_or_else(|| EmotionError::InvalidInput {
                message: "input tensor is not contiguous in memory".to_string(),
            })?;
        let tensor_ref =
            TensorRef::from_array_view((dims, data)).map_err(|e| EmotionError::InvalidInput {
                message: format!("failed to create input TensorRef: {e}"),
            })?;

        // Round-robin over the pool.
        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session_guard =
            self.sessions[idx]
                .lock()
                .map_err(|_| EmotionError::InvalidInput {
                    message: format!(
                        "model '{}': failed to acquire session lock for session {}/{}",
                        self.model_name,
                        idx,
                        self.sessions.len()
                    ),
                })?;

        let first_output = session_guard
            .outputs
            .first()
            .map(|o| o.name.to_string())
            .ok_or_else(|| EmotionError::InvalidInput {
                message: format!("model '{}' declares no outputs", self.model_name),
            })?;

        let ort_inputs: SessionInputs<'_, '_, 0> = SessionInputs::ValueMap(vec![(
            Cow::Borrowed(self.input_name.as_str()),
            tensor_ref.into(),
        )]);
        let outputs = session_guard.run(ort_inputs).map_err(|e| {
            EmotionError::inference_error(
                &self.model_name,
                format!(
                    "forward pass with input '{}' of shape {:?}",
                    self.input_name,
                    batch.shape()
                ),
                e,
            )
        })?;

        let value = &outputs[first_output.as_str()];
        let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
            EmotionError::inference_error(
                &self.model_name,
                format!("extracting output '{first_output}' as f32"),
                e,
            )
        })?;

        Ok((
            shape.iter().map(|&d| d as usize).collect(),
            data.to_vec(),
        ))
    }
}

//! Configuration types for the emotion server and CLI.

use std::path::PathBuf;

/// Configuration for loading the classifier
#[derive(Clone)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub input_name: String,
    pub session_pool_size: usize,
    pub intra_threads: Option<usize>,
}

/// Configuration for the HTTP server
#[derive(Clone)]
pub struct ServerConfig {
    pub model: ModelConfig,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub web_root: PathBuf,
}

//! Emonet Server and CLI
//!
//! A cross-platform binary for facial emotion classification via CLI or
//! HTTP server.
//!
//! # Usage
//!
//! ## CLI Mode
//! ```bash
//! emonet-server classify --file face.jpg --model models/emotion.onnx
//! emonet-server classify --url "https://example.com/face.jpg" --model models/emotion.onnx
//! ```
//!
//! ## Server Mode
//! ```bash
//! emonet-server serve --model models/emotion.onnx --port 8080
//! ```

mod cli;
mod config;
mod predict;
mod server;
mod upload;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "emonet-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Facial emotion classification via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single image via CLI
    Classify {
        /// URL of the image to classify
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Local file path of the image to classify
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Path to the emotion classification model
        #[arg(long, env = "EMONET_MODEL")]
        model: PathBuf,

        /// Name of the model's input tensor
        #[arg(long, default_value = "input", env = "EMONET_INPUT_NAME")]
        input_name: String,

        /// Output format (json, text, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,
    },
    /// Start the HTTP server
    Serve {
        /// Path to the emotion classification model
        #[arg(long, env = "EMONET_MODEL")]
        model: PathBuf,

        /// Name of the model's input tensor
        #[arg(long, default_value = "input", env = "EMONET_INPUT_NAME")]
        input_name: String,

        /// Port to listen on
        #[arg(long, short, default_value = "8080", env = "EMONET_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "EMONET_HOST")]
        host: String,

        /// Directory for transient upload storage
        #[arg(long, default_value = "uploads", env = "EMONET_UPLOAD_DIR")]
        upload_dir: PathBuf,

        /// Directory holding the static web pages
        #[arg(long, default_value = "webapp", env = "EMONET_WEB_ROOT")]
        web_root: PathBuf,

        /// Number of ONNX Runtime sessions to pool
        #[arg(long, default_value = "1", env = "EMONET_SESSION_POOL")]
        session_pool_size: usize,

        /// Intra-op thread count per session
        #[arg(long, env = "EMONET_INTRA_THREADS")]
        intra_threads: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    emonet::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            url,
            file,
            model,
            input_name,
            output,
        } => {
            let config = config::ModelConfig {
                model_path: model,
                input_name,
                session_pool_size: 1,
                intra_threads: None,
            };

            if let Some(url) = url {
                info!("Classifying URL: {}", url);
                cli::classify_url(&url, &config, &output).await?;
            } else if let Some(file) = file {
                info!("Classifying file: {}", file.display());
                cli::classify_file(&file, &config, &output)?;
            } else {
                eprintln!("Error: Either --url or --file must be provided");
                std::process::exit(1);
            }
        }
        Commands::Serve {
            model,
            input_name,
            port,
            host,
            upload_dir,
            web_root,
            session_pool_size,
            intra_threads,
        } => {
            let config = config::ServerConfig {
                model: config::ModelConfig {
                    model_path: model,
                    input_name,
                    session_pool_size,
                    intra_threads,
                },
                host,
                port,
                upload_dir,
                web_root,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
    }

    Ok(())
}

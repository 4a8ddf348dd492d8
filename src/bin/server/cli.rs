//! CLI mode for one-shot emotion classification.

use crate::config::ModelConfig;
use crate::predict::PredictResponse;
use emonet::core::EmotionResult;
use emonet::domain::EmotionPrediction;
use emonet::predictors::EmotionClassifier;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to download image: {0}")]
    Download(String),
}

/// Classify an image fetched from a URL
pub async fn classify_url(
    url: &str,
    config: &ModelConfig,
    output_format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    info!("Downloading image from URL...");
    let bytes = download_bytes(url).await?;
    let download_time = start.elapsed();
    info!(
        "Downloaded {} bytes in {:.2}ms",
        bytes.len(),
        download_time.as_secs_f64() * 1000.0
    );

    info!("Loading emotion model...");
    let classifier = build_classifier(config)?;
    let init_time = start.elapsed() - download_time;
    info!(
        "Model loaded in {:.2}ms",
        init_time.as_secs_f64() * 1000.0
    );

    let infer_start = Instant::now();
    let prediction = classifier.classify_bytes(&bytes)?;
    let processing_time = infer_start.elapsed();
    info!(
        "Classification completed in {:.2}ms",
        processing_time.as_secs_f64() * 1000.0
    );

    output_result(
        &prediction,
        output_format,
        processing_time.as_secs_f64() * 1000.0,
    );
    Ok(())
}

/// Classify a local image file
pub fn classify_file(
    path: &Path,
    config: &ModelConfig,
    output_format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    info!("Loading emotion model...");
    let classifier = build_classifier(config)?;
    let init_time = start.elapsed();
    info!("Model loaded in {:.2}ms", init_time.as_secs_f64() * 1000.0);

    let infer_start = Instant::now();
    let prediction = classifier.classify_file(path)?;
    let processing_time = infer_start.elapsed();
    info!(
        "Classification completed in {:.2}ms",
        processing_time.as_secs_f64() * 1000.0
    );

    output_result(
        &prediction,
        output_format,
        processing_time.as_secs_f64() * 1000.0,
    );
    Ok(())
}

fn build_classifier(config: &ModelConfig) -> EmotionResult<EmotionClassifier> {
    EmotionClassifier::builder()
        .input_name(&config.input_name)
        .session_pool_size(config.session_pool_size)
        .build(&config.model_path)
}

/// Download bytes from a URL
async fn download_bytes(url: &str) -> Result<Vec<u8>, CliError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| CliError::Download(format!("Failed to fetch URL: {}", e)))?;

    if !response.status().is_success() {
        return Err(CliError::Download(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CliError::Download(format!("Failed to read response body: {}", e)))?;

    Ok(bytes.to_vec())
}

/// Output the prediction in the specified format
fn output_result(prediction: &EmotionPrediction, format: &str, processing_time_ms: f64) {
    match format {
        "json" => {
            let response = PredictResponse::from_prediction(prediction);
            println!("{}", serde_json::to_string(&response).unwrap());
        }
        "text" => {
            println!("{}", prediction.label);
        }
        _ => {
            println!("\n=== Emotion Prediction ===");
            println!("Processing time: {:.2}ms", processing_time_ms);
            println!(
                "Emotion: {} ({:.1}%)",
                prediction.label,
                prediction.confidence * 100.0
            );
            println!();
            println!("--- All Confidences ---");
            for (label, score) in prediction.confidences() {
                let bar_len = (score.clamp(0.0, 1.0) * 40.0).round() as usize;
                println!(
                    "{:<10} {:>6.1}%  {}",
                    label.as_str(),
                    score * 100.0,
                    "#".repeat(bar_len)
                );
            }
        }
    }
}

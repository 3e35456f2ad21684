// Model download helper for the `/predict` ONNX model.
//
// Fetches an ONNX sequence-classification model and its tokenizer from a
// Hugging Face repository into the directory MODEL_PATH points at
// (~/.local/share/quill/models/predict/ on Linux by default).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Path of the model inside the Hugging Face repository.
const REMOTE_MODEL_FILE: &str = "onnx/model.onnx";
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    crate::config::default_data_dir().join("models").join("predict")
}

/// Download the tokenizer and model from `repo_url` into `model_path`'s
/// directory. Skips files that already exist.
pub async fn download_model(repo_url: &str, model_path: &Path) -> Result<()> {
    let dir = model_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nPredict model ({repo_url}):");

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("Tokenizer already exists, skipping");
        println!("  {TOKENIZER_FILE} (already exists)");
    } else {
        println!("  Downloading {TOKENIZER_FILE}...");
        download_file(&format!("{repo_url}/{TOKENIZER_FILE}"), &tokenizer_path, false).await?;
    }

    if model_path.exists() {
        info!("Model already exists, skipping");
        println!("  {} (already exists)", model_path.display());
    } else {
        println!("  Downloading {REMOTE_MODEL_FILE}...");
        download_file(&format!("{repo_url}/{REMOTE_MODEL_FILE}"), model_path, true).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(ProgressStyle::default_spinner().template("    {spinner} {bytes}")?);
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    // temp + rename so an interrupted download is retried next time
    let tmp = dest.with_extension("part");
    std::fs::write(&tmp, &bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, dest).with_context(|| format!("Failed to move {} into place", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_quill() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("quill") && path_str.ends_with("predict"),
            "Expected path containing quill/models/predict, got: {path_str}"
        );
    }
}

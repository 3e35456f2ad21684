// Terminal output for the CLI: artifact status and token listings.

use colored::Colorize;

use crate::config::Config;
use crate::models::{ArtifactKind, ArtifactStore};

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Respects UTF-8 character boundaries, so it never panics on multi-byte
/// characters the way byte slicing would.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Print which artifacts are trained and which backends `serve` would use.
pub fn display_status(config: &Config) {
    let store = ArtifactStore::new(&config.artifact_dir);

    println!("\n{}", format!("=== {} ===", config.project_name).bold());
    println!("  Artifacts: {}", store.base_dir().display());
    for kind in ArtifactKind::ALL {
        let state = if store.exists(kind) {
            "trained".green()
        } else {
            "missing (trained on next serve)".yellow()
        };
        println!("    {:<12} {}", kind.to_string(), state);
    }

    println!();
    let predictor = if config.predict_model_present() {
        format!("onnx ({})", config.model_path.display()).green()
    } else {
        "sentiment classifier fallback".yellow()
    };
    println!("  Predictor:  {predictor}");

    let generator = if config.huggingface_token.is_empty() {
        "disabled (HUGGINGFACE_TOKEN not set)".dimmed()
    } else {
        config.generator_url.normal()
    };
    println!("  Generator:  {generator}");
    println!();
}

/// Print a normalized token list, one line.
pub fn display_tokens(tokens: &[String]) {
    if tokens.is_empty() {
        println!("{}", "(no tokens)".dimmed());
    } else {
        println!("{}", tokens.join(" "));
    }
}

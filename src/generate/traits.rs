// TextGenerator trait: the instruct model is reached over HTTP, so this is
// async and swap-ready.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` with at most `max_new_tokens` new tokens.
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String>;
}

/// Used when no Hugging Face token is configured. Errors on every call so
/// the endpoint never answers with made-up output.
pub struct NoopGenerator;

#[async_trait]
impl TextGenerator for NoopGenerator {
    async fn generate(&self, _prompt: &str, _max_new_tokens: u32) -> Result<String> {
        anyhow::bail!("Text generation is disabled; set HUGGINGFACE_TOKEN to enable it")
    }
}

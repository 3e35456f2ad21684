// Hugging Face inference endpoint for an instruct model (Mistral 7B Instruct
// by default).
//
// The prompt is wrapped in the `[INST] ... [/INST]` instruct template and
// decoded greedily, so the same prompt yields the same completion. Only the
// generated continuation is returned, not the echoed prompt.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::TextGenerator;

pub struct HuggingFaceGenerator {
    client: Client,
    url: String,
    token: String,
}

impl HuggingFaceGenerator {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token: token.into(),
        }
    }
}

/// Wrap a user prompt in the instruct chat template.
pub fn instruct_prompt(prompt: &str) -> String {
    format!("<s>[INST] {} [/INST]", prompt.trim())
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String> {
        let request = GenerationRequest {
            inputs: instruct_prompt(prompt),
            parameters: GenerationParameters {
                max_new_tokens,
                do_sample: false,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .context("Failed to call text generation endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Text generation endpoint returned {}: {}", status, body);
        }

        let generations: Vec<Generation> = response
            .json()
            .await
            .context("Failed to parse text generation response")?;

        let text = extract_generated_text(generations)?;
        debug!(
            max_new_tokens,
            prompt_preview = %crate::output::truncate_chars(prompt, 50),
            "Generated completion"
        );
        Ok(text)
    }
}

fn extract_generated_text(generations: Vec<Generation>) -> Result<String> {
    generations
        .into_iter()
        .next()
        .map(|g| g.generated_text.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Text generation endpoint returned no output"))
}

// --- Inference API request/response types ---

#[derive(Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

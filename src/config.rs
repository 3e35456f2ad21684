use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::models::lda::DEFAULT_NUM_TOPICS;
use crate::predict::download::{MODEL_FILE, TOKENIZER_FILE};

pub const DEFAULT_GENERATOR_URL: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.3";

/// Hugging Face repository the `download-model` command pulls the ONNX
/// sentiment model and tokenizer from.
pub const DEFAULT_PREDICT_MODEL_URL: &str =
    "https://huggingface.co/Xenova/distilbert-base-uncased-finetuned-sst-2-english/resolve/main";

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy before this runs; after
/// that the config is never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    /// Prefix for the versioned routes (`/predict`, `/preprocess`)
    pub api_v1_str: String,
    /// ONNX model used by `/predict`. `tokenizer.json` must sit beside it.
    pub model_path: PathBuf,
    /// Bearer token for the text generator. Empty disables generation.
    pub huggingface_token: String,
    /// Directory holding the trained artifacts
    pub artifact_dir: PathBuf,
    /// Labeled `review,sentiment` CSV for the classifier
    pub sentiment_corpus: PathBuf,
    /// 20 Newsgroups tree (one sub-directory per group)
    pub newsgroups_dir: PathBuf,
    pub num_topics: usize,
    pub generator_url: String,
    pub predict_model_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default; the `require_*` checks validate what a
    /// particular command needs.
    pub fn load() -> Result<Self> {
        let num_topics = match env::var("QUILL_NUM_TOPICS") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("QUILL_NUM_TOPICS must be a positive integer, got {raw:?}")
                })?,
            Err(_) => DEFAULT_NUM_TOPICS,
        };

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::predict::download::default_model_dir().join(MODEL_FILE));

        Ok(Self {
            project_name: env::var("PROJECT_NAME")
                .unwrap_or_else(|_| "Quill NLP service".to_string()),
            api_v1_str: env::var("API_V1_STR").unwrap_or_else(|_| "/api/v1".to_string()),
            model_path,
            huggingface_token: env::var("HUGGINGFACE_TOKEN").unwrap_or_default(),
            artifact_dir: env::var("QUILL_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir().join("artifacts")),
            sentiment_corpus: env::var("QUILL_SENTIMENT_CORPUS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/IMDB Dataset.csv")),
            newsgroups_dir: env::var("QUILL_NEWSGROUPS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/20news")),
            num_topics,
            generator_url: env::var("QUILL_GENERATOR_URL")
                .unwrap_or_else(|_| DEFAULT_GENERATOR_URL.to_string()),
            predict_model_url: env::var("QUILL_PREDICT_MODEL_URL")
                .unwrap_or_else(|_| DEFAULT_PREDICT_MODEL_URL.to_string()),
        })
    }

    /// The model directory is wherever MODEL_PATH points.
    pub fn model_dir(&self) -> PathBuf {
        self.model_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Check that the labeled sentiment corpus is readable.
    /// Call this before training the classifier.
    pub fn require_sentiment_corpus(&self) -> Result<()> {
        if !self.sentiment_corpus.is_file() {
            anyhow::bail!(
                "Sentiment corpus not found at {}\n\
                 Set QUILL_SENTIMENT_CORPUS to a CSV with `review` and `sentiment` columns.",
                self.sentiment_corpus.display()
            );
        }
        Ok(())
    }

    /// Check that the newsgroups tree exists.
    /// Call this before training the embedding or topic models.
    pub fn require_newsgroups(&self) -> Result<()> {
        if !self.newsgroups_dir.is_dir() {
            anyhow::bail!(
                "Newsgroups corpus not found at {}\n\
                 Set QUILL_NEWSGROUPS_DIR to the unpacked 20 Newsgroups directory.",
                self.newsgroups_dir.display()
            );
        }
        Ok(())
    }

    /// True when the ONNX predictor can be used instead of the fallback.
    pub fn predict_model_present(&self) -> bool {
        self.model_path.is_file()
            && self
                .model_dir()
                .join(TOKENIZER_FILE)
                .is_file()
    }
}

/// `<data dir>/quill`, falling back to `./quill` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
}

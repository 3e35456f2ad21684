// Fallback predictor backed by the live sentiment classifier.

use anyhow::Result;
use async_trait::async_trait;

use super::traits::Predictor;
use crate::models::classifier::SharedClassifier;

pub const POSITIVE_LABEL: &str = "positive";

pub struct SentimentScorePredictor {
    classifier: SharedClassifier,
}

impl SentimentScorePredictor {
    pub fn new(classifier: SharedClassifier) -> Self {
        Self { classifier }
    }
}

/// Probability of the positive label, or of the most likely label when the
/// classifier has no positive class.
pub fn positive_probability(proba: &[(String, f64)]) -> Option<f64> {
    proba
        .iter()
        .find(|(label, _)| label == POSITIVE_LABEL)
        .or_else(|| proba.iter().max_by(|a, b| a.1.total_cmp(&b.1)))
        .map(|&(_, p)| p)
}

#[async_trait]
impl Predictor for SentimentScorePredictor {
    async fn predict(&self, text: &str) -> Result<f64> {
        let pipeline = self.classifier.current().await;
        let proba = pipeline.predict_proba(text);
        positive_probability(&proba).ok_or_else(|| anyhow::anyhow!("classifier has no labels"))
    }

    fn name(&self) -> &'static str {
        "sentiment-classifier"
    }
}

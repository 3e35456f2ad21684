// Predictor trait: the swap-ready abstraction behind `/predict`.

use anyhow::Result;
use async_trait::async_trait;

/// Maps a text to a single score in [0, 1].
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, text: &str) -> Result<f64>;

    /// Backend name, for logs and the status command.
    fn name(&self) -> &'static str;
}

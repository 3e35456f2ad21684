// Trainer trait: one implementation per artifact kind.
//
// The bootstrap only needs to know which kind a trainer produces and how to
// run it, which also lets tests count training runs with a stub.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::store::{ArtifactKind, ArtifactStore};

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub kind: ArtifactKind,
    /// Number of documents the artifact was fit on
    pub documents: usize,
    /// Fit quality, when the trainer has one (accuracy, log-likelihood)
    pub metric: Option<Metric>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub value: f64,
}

impl TrainingReport {
    pub fn new(kind: ArtifactKind, documents: usize, metric: Option<Metric>) -> Self {
        Self {
            kind,
            documents,
            metric,
            trained_at: Utc::now(),
        }
    }
}

/// Produces one artifact kind and persists it into the store.
pub trait Trainer: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// Fit and persist. Nothing is written when this returns an error.
    fn train(&self, store: &ArtifactStore) -> Result<TrainingReport>;
}

// Start-up bootstrap: train whatever artifact is missing, then load all three.
//
// Runs synchronously; async callers wrap it in spawn_blocking. A present
// artifact is never retrained, and any training or load failure aborts.

use anyhow::{Context, Result};
use tracing::info;

use super::classifier::{ClassifierTrainer, SentimentPipeline};
use super::doc2vec::{Doc2Vec, Doc2VecParams, EmbeddingTrainer};
use super::lda::{TopicModel, TopicTrainer, DEFAULT_PASSES};
use super::store::{ArtifactKind, ArtifactStore};
use super::traits::{Trainer, TrainingReport};
use crate::config::Config;

#[derive(Debug)]
pub enum BootstrapOutcome {
    AlreadyPresent,
    Trained(TrainingReport),
}

/// Run `trainer` only if its artifact is not in the store yet.
pub fn ensure_artifact(store: &ArtifactStore, trainer: &dyn Trainer) -> Result<BootstrapOutcome> {
    let kind = trainer.kind();
    if store.exists(kind) {
        info!(%kind, "Artifact present, skipping training");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    info!(%kind, "Artifact missing, training...");
    let report = trainer
        .train(store)
        .with_context(|| format!("Failed to train {kind} artifact"))?;

    match report.metric {
        Some(metric) => info!(%kind, documents = report.documents, "{}: {:.4}", metric.name, metric.value),
        None => info!(%kind, documents = report.documents, "Training finished"),
    }
    Ok(BootstrapOutcome::Trained(report))
}

/// The immutable model set the service runs on.
#[derive(Debug)]
pub struct LoadedModels {
    pub classifier: SentimentPipeline,
    pub embeddings: Doc2Vec,
    pub topics: TopicModel,
}

impl LoadedModels {
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Ok(Self {
            classifier: SentimentPipeline::load(&store.path_of(ArtifactKind::Classifier))?,
            embeddings: Doc2Vec::load(&store.path_of(ArtifactKind::Embeddings))?,
            topics: TopicModel::load(store)?,
        })
    }
}

/// The three trainers, wired from config, in bootstrap order.
pub fn trainers(config: &Config) -> Vec<Box<dyn Trainer>> {
    vec![
        Box::new(ClassifierTrainer {
            corpus_path: config.sentiment_corpus.clone(),
        }),
        Box::new(EmbeddingTrainer {
            corpus_dir: config.newsgroups_dir.clone(),
            params: Doc2VecParams::default(),
        }),
        Box::new(TopicTrainer {
            corpus_dir: config.newsgroups_dir.clone(),
            num_topics: config.num_topics,
            passes: DEFAULT_PASSES,
        }),
    ]
}

pub fn bootstrap(config: &Config) -> Result<LoadedModels> {
    let store = ArtifactStore::new(&config.artifact_dir);
    bootstrap_with(&store, &trainers(config))
}

/// Ensure each trainer's artifact, then load the full set from `store`.
pub fn bootstrap_with(store: &ArtifactStore, trainers: &[Box<dyn Trainer>]) -> Result<LoadedModels> {
    for trainer in trainers {
        ensure_artifact(store, trainer.as_ref())?;
    }
    info!(dir = %store.base_dir().display(), "Loading artifacts");
    LoadedModels::load(store)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::store::write_json_atomic;

    struct CountingTrainer {
        kind: ArtifactKind,
        runs: AtomicUsize,
    }

    impl Trainer for CountingTrainer {
        fn kind(&self) -> ArtifactKind {
            self.kind
        }

        fn train(&self, store: &ArtifactStore) -> Result<TrainingReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            for path in store.files_of(self.kind) {
                write_json_atomic(&path, &serde_json::json!({}))?;
            }
            Ok(TrainingReport::new(self.kind, 0, None))
        }
    }

    struct FailingTrainer;

    impl Trainer for FailingTrainer {
        fn kind(&self) -> ArtifactKind {
            ArtifactKind::Classifier
        }

        fn train(&self, _store: &ArtifactStore) -> Result<TrainingReport> {
            anyhow::bail!("corpus unavailable")
        }
    }

    #[test]
    fn test_missing_artifact_trains_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let trainer = CountingTrainer {
            kind: ArtifactKind::Topics,
            runs: AtomicUsize::new(0),
        };

        let first = ensure_artifact(&store, &trainer).unwrap();
        assert!(matches!(first, BootstrapOutcome::Trained(_)));
        let second = ensure_artifact(&store, &trainer).unwrap();
        assert!(matches!(second, BootstrapOutcome::AlreadyPresent));
        assert_eq!(trainer.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_training_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = ensure_artifact(&store, &FailingTrainer).unwrap_err();
        assert!(format!("{err:#}").contains("corpus unavailable"));
        assert!(!store.exists(ArtifactKind::Classifier));
    }
}

// Composition tests: the trained pieces chained together the way the
// service uses them (corpus → trainer → store → bootstrap → grouping).

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use quill::models::bootstrap::{bootstrap_with, ensure_artifact, BootstrapOutcome};
use quill::models::classifier::{fit_and_evaluate, ClassifierTrainer, SentimentPipeline};
use quill::models::doc2vec::EmbeddingTrainer;
use quill::models::lda::TopicTrainer;
use quill::models::{ArtifactKind, ArtifactStore, Trainer, TrainingReport};
use quill::topics::{ClusterLabel, TopicGrouper};

// ============================================================
// Classifier: a word seen only in positives drives the label
// ============================================================

#[test]
fn held_out_sentence_with_positive_word_is_positive() {
    let (pipeline, accuracy) = fit_and_evaluate(&common::sentiment_examples()).unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    assert_eq!(pipeline.predict("this movie was wonderful"), "positive");
}

#[test]
fn full_corpus_pipeline_separates_the_classes() {
    let examples = common::sentiment_examples();
    let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
    let labels: Vec<String> = examples.iter().map(|e| e.label.clone()).collect();
    let pipeline = SentimentPipeline::fit(&texts, &labels).unwrap();

    assert_eq!(pipeline.predict("wonderful"), "positive");
    assert!(pipeline.accuracy(&examples) >= 0.9);
}

// ============================================================
// Grouping
// ============================================================

fn grouper() -> TopicGrouper {
    TopicGrouper::new(common::embeddings(), common::topic_model(2))
}

#[test]
fn grouping_keeps_every_sentence() {
    let sentences: Vec<String> = [
        "The rocket reached orbit",
        "My car engine failed",
        "Satellite launch tomorrow",
        "",
        "New tires and brakes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let result = grouper().group(&sentences);
    let total: usize = result.groups.values().map(Vec::len).sum();
    assert_eq!(total, sentences.len());
    assert_eq!(result.clusters.len(), sentences.len());
}

#[test]
fn identical_sentences_share_a_group() {
    let sentences = vec![
        "rocket orbit launch".to_string(),
        "engine brakes car".to_string(),
        "rocket orbit launch".to_string(),
    ];
    let result = grouper().group(&sentences);
    let group = result
        .groups
        .values()
        .find(|members| members.contains(&sentences[0]))
        .unwrap();
    assert_eq!(group.iter().filter(|s| **s == sentences[0]).count(), 2);
}

#[test]
fn group_labels_are_capitalized_terms() {
    let result = grouper().group(&["rocket orbit".to_string()]);
    let label = result.groups.keys().next().unwrap();
    assert!(label.chars().next().unwrap().is_uppercase());
}

#[test]
fn small_batches_are_all_noise_with_default_min_samples() {
    let sentences: Vec<String> = (0..5).map(|i| format!("rocket launch {i}")).collect();
    let result = grouper().group(&sentences);
    assert!(result.clusters.iter().all(|c| c.is_noise()));
}

#[test]
fn wide_radius_puts_every_sentence_in_one_cluster() {
    let sentences: Vec<String> = ["rocket orbit", "car engine", "satellite launch"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let result = grouper().with_clustering(1000.0, 2).group(&sentences);
    assert!(result.clusters.iter().all(|c| *c == ClusterLabel::Cluster(0)));
}

#[test]
fn empty_batch_groups_nothing() {
    let result = grouper().group(&[]);
    assert!(result.groups.is_empty());
    assert!(result.clusters.is_empty());
}

// ============================================================
// Bootstrap
// ============================================================

struct Counting<T> {
    inner: T,
    runs: AtomicUsize,
}

impl<T> Counting<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            runs: AtomicUsize::new(0),
        }
    }
}

impl<T: Trainer> Trainer for Counting<T> {
    fn kind(&self) -> ArtifactKind {
        self.inner.kind()
    }

    fn train(&self, store: &ArtifactStore) -> Result<TrainingReport> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.train(store)
    }
}

#[test]
fn bootstrap_trains_missing_artifacts_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reviews.csv");
    common::write_sentiment_csv(&csv);
    let news = dir.path().join("20news");
    common::write_newsgroups(&news);
    let store = ArtifactStore::new(dir.path().join("artifacts"));

    let classifier = Counting::new(ClassifierTrainer { corpus_path: csv });
    let embeddings = Counting::new(EmbeddingTrainer {
        corpus_dir: news.clone(),
        params: common::small_doc2vec_params(),
    });
    let topics = Counting::new(TopicTrainer {
        corpus_dir: news,
        num_topics: 2,
        passes: 3,
    });

    for trainer in [&classifier as &dyn Trainer, &embeddings, &topics] {
        assert!(matches!(
            ensure_artifact(&store, trainer).unwrap(),
            BootstrapOutcome::Trained(_)
        ));
    }
    for trainer in [&classifier as &dyn Trainer, &embeddings, &topics] {
        assert!(matches!(
            ensure_artifact(&store, trainer).unwrap(),
            BootstrapOutcome::AlreadyPresent
        ));
    }
    assert_eq!(classifier.runs.load(Ordering::SeqCst), 1);
    assert_eq!(embeddings.runs.load(Ordering::SeqCst), 1);
    assert_eq!(topics.runs.load(Ordering::SeqCst), 1);

    for kind in ArtifactKind::ALL {
        assert!(store.exists(kind), "{kind} missing");
    }
}

#[test]
fn bootstrap_loads_a_usable_model_set() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reviews.csv");
    common::write_sentiment_csv(&csv);
    let news = dir.path().join("20news");
    common::write_newsgroups(&news);
    let store = ArtifactStore::new(dir.path().join("artifacts"));

    let trainers: Vec<Box<dyn Trainer>> = vec![
        Box::new(ClassifierTrainer { corpus_path: csv }),
        Box::new(EmbeddingTrainer {
            corpus_dir: news.clone(),
            params: common::small_doc2vec_params(),
        }),
        Box::new(TopicTrainer {
            corpus_dir: news,
            num_topics: 2,
            passes: 3,
        }),
    ];

    let models = bootstrap_with(&store, &trainers).unwrap();
    assert_eq!(models.classifier.labels().len(), 2);
    assert_eq!(models.topics.model.num_topics(), 2);

    let grouper = TopicGrouper::new(models.embeddings, models.topics);
    let result = grouper.group(&["rocket orbit".to_string(), "car engine".to_string()]);
    assert_eq!(result.groups.values().map(Vec::len).sum::<usize>(), 2);
}

#[test]
fn bootstrap_fails_when_a_corpus_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("artifacts"));
    let trainers: Vec<Box<dyn Trainer>> = vec![Box::new(ClassifierTrainer {
        corpus_path: dir.path().join("missing.csv"),
    })];

    assert!(bootstrap_with(&store, &trainers).is_err());
    assert!(!store.exists(ArtifactKind::Classifier));
}

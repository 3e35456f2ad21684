// Model tests: each model family fitted on a tiny corpus, persisted and
// reloaded from a temp artifact store.

mod common;

use quill::corpus::{Corpus, LabeledExample};
use quill::models::classifier::{
    fit_and_evaluate, train_classifier, train_test_split, SentimentPipeline,
};
use quill::models::doc2vec::{train_embeddings, Doc2Vec};
use quill::models::lda::{train_topics, Dictionary, TopicModel};
use quill::models::store::write_json_atomic;
use quill::models::{ArtifactKind, ArtifactStore};

// ============================================================
// Sentiment classifier
// ============================================================

#[test]
fn classifier_accuracy_is_a_fraction() {
    let (_, accuracy) = fit_and_evaluate(&common::sentiment_examples()).unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn classifier_labels_are_sorted_and_distinct() {
    let (pipeline, _) = fit_and_evaluate(&common::sentiment_examples()).unwrap();
    assert_eq!(pipeline.labels(), ["negative", "positive"]);
}

#[test]
fn classifier_probabilities_sum_to_one() {
    let (pipeline, _) = fit_and_evaluate(&common::sentiment_examples()).unwrap();
    let proba = pipeline.predict_proba("a wonderful evening");
    let total: f64 = proba.iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn classifier_rejects_single_class() {
    let examples = vec![
        LabeledExample::new("good", "positive"),
        LabeledExample::new("fine", "positive"),
    ];
    assert!(fit_and_evaluate(&examples).is_err());
}

#[test]
fn classifier_rejects_tiny_corpus() {
    assert!(fit_and_evaluate(&[LabeledExample::new("good", "positive")]).is_err());
}

#[test]
fn split_is_seeded_and_sized() {
    let items: Vec<u32> = (0..10).collect();
    let (train_a, test_a) = train_test_split(&items, 0.2, 42);
    let (train_b, test_b) = train_test_split(&items, 0.2, 42);
    assert_eq!(test_a.len(), 2);
    assert_eq!(train_a.len(), 8);
    assert_eq!((train_a, test_a), (train_b, test_b));
}

#[test]
fn classifier_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reviews.csv");
    common::write_sentiment_csv(&csv);
    let out = dir.path().join("sentiment_classifier.json");

    let (pipeline, report) = train_classifier(&csv, &out).unwrap();
    assert_eq!(report.kind, ArtifactKind::Classifier);
    assert_eq!(report.documents, 20);
    assert_eq!(report.metric.unwrap().name, "accuracy");

    let reloaded = SentimentPipeline::load(&out).unwrap();
    let text = "wonderful cast";
    assert_eq!(reloaded.predict(text), pipeline.predict(text));
}

#[test]
fn failed_training_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reviews.csv");
    std::fs::write(&csv, "review,sentiment\nonly one,positive\n").unwrap();
    let out = dir.path().join("sentiment_classifier.json");

    assert!(train_classifier(&csv, &out).is_err());
    assert!(!out.exists());
}

// ============================================================
// Paragraph vectors
// ============================================================

#[test]
fn embeddings_persist_and_infer_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("doc2vec.json");
    let corpus = Corpus::from_documents(
        common::newsgroup_posts()
            .into_iter()
            .map(|(_, body)| body.to_string())
            .collect(),
    );

    let (model, report) = train_embeddings(&corpus, common::small_doc2vec_params(), &out).unwrap();
    assert_eq!(report.documents, 8);

    let reloaded = Doc2Vec::load(&out).unwrap();
    let tokens = vec!["rocket".to_string(), "orbit".to_string()];
    let (a, b) = (model.infer(&tokens), reloaded.infer(&tokens));
    assert_eq!(a.len(), b.len());
    assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-4));
    assert_eq!(reloaded.vector_size(), 12);
}

// ============================================================
// Topic model
// ============================================================

#[test]
fn topics_persist_with_dictionary() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let corpus = Corpus::from_documents(
        common::newsgroup_posts()
            .into_iter()
            .map(|(_, body)| body.to_string())
            .collect(),
    );

    let (trained, report) = train_topics(&corpus, 2, 3, &store).unwrap();
    assert!(store.exists(ArtifactKind::Topics));
    assert!(report.metric.unwrap().value < 0.0);

    let loaded = TopicModel::load(&store).unwrap();
    assert_eq!(loaded.model.num_topics(), 2);
    assert_eq!(loaded.dictionary.len(), trained.dictionary.len());
    assert_eq!(loaded.format_topic(0, 10), trained.format_topic(0, 10));
}

fn newsgroup_corpus() -> Corpus {
    Corpus::from_documents(
        common::newsgroup_posts()
            .into_iter()
            .map(|(_, body)| body.to_string())
            .collect(),
    )
}

#[test]
fn topics_reject_a_dictionary_from_another_fit() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let (trained, _) = train_topics(&newsgroup_corpus(), 2, 2, &store).unwrap();

    // same size, different token ids
    let reversed: Vec<Vec<String>> = (0..trained.dictionary.len())
        .rev()
        .map(|id| vec![trained.dictionary.token(id).unwrap().to_string()])
        .collect();
    let swapped = Dictionary::from_documents(&reversed);
    assert_eq!(swapped.len(), trained.dictionary.len());
    write_json_atomic(&store.topic_dictionary_path(), &swapped).unwrap();

    let err = TopicModel::load(&store).unwrap_err();
    assert!(format!("{err:#}").contains("does not match"));
}

#[test]
fn failed_topic_retrain_keeps_previous_pair() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let (trained, _) = train_topics(&newsgroup_corpus(), 2, 2, &store).unwrap();

    assert!(train_topics(&newsgroup_corpus(), 0, 2, &store).is_err());

    let loaded = TopicModel::load(&store).unwrap();
    assert_eq!(loaded.dictionary.fingerprint(), trained.dictionary.fingerprint());
    assert_eq!(loaded.format_topic(0, 5), trained.format_topic(0, 5));
}

#[test]
fn document_topics_are_never_empty() {
    let topics = common::topic_model(4);
    for text in ["rocket orbit", "", "completely unknown vocabulary"] {
        let bow = topics.bow(&quill::text::normalize(text));
        assert!(!topics.model.document_topics(&bow).is_empty());
    }
}

#[test]
fn format_topic_lists_ten_terms() {
    let topics = common::topic_model(2);
    let formatted = topics.format_topic(1, 10);
    assert_eq!(formatted.split(" + ").count(), 10);
}

// Sentiment classifier: TF-IDF vectorizer feeding a multinomial Naive Bayes
// model, fit and persisted as one pipeline.
//
// The vectorizer uses the shared normalizer as its tokenizer. Vocabulary ids
// follow sorted token order; idf is the smoothed ln((1 + n) / (1 + df)) + 1;
// rows are raw term counts times idf, L2-normalized. Naive Bayes uses Laplace
// smoothing over the (fractional) tf-idf mass per class.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use super::store::{read_json, write_json_atomic, ArtifactKind, ArtifactStore};
use super::traits::{Metric, Trainer, TrainingReport};
use crate::corpus::{load_labeled, LabeledExample};
use crate::text::normalize;

/// Fraction of the labeled corpus held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;
/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Sparse document row: (feature id, weight), ascending by id.
pub type SparseRow = Vec<(usize, f64)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Learn vocabulary and idf weights from tokenized documents.
    pub fn fit(documents: &[Vec<String>]) -> Result<Self> {
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for token in unique {
                *df.entry(token).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            anyhow::bail!("empty vocabulary; the training documents contain only stopwords");
        }

        let n = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(df.len());
        let mut idf = Vec::with_capacity(df.len());
        for (id, (token, count)) in df.into_iter().enumerate() {
            vocabulary.insert(token.to_string(), id);
            idf.push(((1.0 + n) / (1.0 + count as f64)).ln() + 1.0);
        }

        Ok(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    /// L2-normalized tf-idf row for a token sequence. Unknown tokens are
    /// ignored; a document with no known tokens gives an empty row.
    pub fn transform(&self, tokens: &[String]) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&id) = self.vocabulary.get(token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut row {
                *v /= norm;
            }
        }
        row
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Class labels in sorted order; index = class id
    labels: Vec<String>,
    class_log_prior: Vec<f64>,
    /// log P(feature | class), flattened [class * n_features + feature]
    feature_log_prob: Vec<f64>,
    n_features: usize,
}

impl MultinomialNb {
    pub fn fit(rows: &[SparseRow], targets: &[&str], n_features: usize, alpha: f64) -> Result<Self> {
        if rows.len() != targets.len() {
            anyhow::bail!("{} rows but {} targets", rows.len(), targets.len());
        }
        if rows.is_empty() {
            anyhow::bail!("cannot fit Naive Bayes on zero rows");
        }

        let labels: Vec<String> = targets
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let class_of: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let n_classes = labels.len();
        let mut class_counts = vec![0usize; n_classes];
        let mut feature_mass = vec![0.0f64; n_classes * n_features];

        for (row, target) in rows.iter().zip(targets) {
            let c = class_of[target];
            class_counts[c] += 1;
            for &(f, v) in row {
                feature_mass[c * n_features + f] += v;
            }
        }

        let total = rows.len() as f64;
        let class_log_prior = class_counts
            .iter()
            .map(|&count| (count as f64 / total).ln())
            .collect();

        let mut feature_log_prob = vec![0.0f64; n_classes * n_features];
        for c in 0..n_classes {
            let row = &feature_mass[c * n_features..(c + 1) * n_features];
            let denom = (row.iter().sum::<f64>() + alpha * n_features as f64).ln();
            for f in 0..n_features {
                feature_log_prob[c * n_features + f] = (row[f] + alpha).ln() - denom;
            }
        }

        Ok(Self {
            labels,
            class_log_prior,
            feature_log_prob,
            n_features,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn joint_log_likelihood(&self, row: &SparseRow) -> Vec<f64> {
        (0..self.labels.len())
            .map(|c| {
                let base = c * self.n_features;
                self.class_log_prior[c]
                    + row
                        .iter()
                        .map(|&(f, v)| v * self.feature_log_prob[base + f])
                        .sum::<f64>()
            })
            .collect()
    }

    /// Most likely class id; ties go to the earlier label.
    pub fn predict_class(&self, row: &SparseRow) -> usize {
        let jll = self.joint_log_likelihood(row);
        let mut best = 0;
        for (c, score) in jll.iter().enumerate() {
            if *score > jll[best] {
                best = c;
            }
        }
        best
    }

    /// Posterior probability per class (softmax of the joint log-likelihood).
    pub fn predict_proba(&self, row: &SparseRow) -> Vec<f64> {
        let jll = self.joint_log_likelihood(row);
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = jll.iter().map(|s| (s - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }
}

/// The persisted classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPipeline {
    vectorizer: TfIdfVectorizer,
    classifier: MultinomialNb,
}

impl SentimentPipeline {
    /// Fit vectorizer and classifier on raw texts.
    pub fn fit(texts: &[String], labels: &[String]) -> Result<Self> {
        let tokenized: Vec<Vec<String>> = texts.par_iter().map(|t| normalize(t)).collect();
        let vectorizer = TfIdfVectorizer::fit(&tokenized)?;
        let rows: Vec<SparseRow> = tokenized
            .par_iter()
            .map(|tokens| vectorizer.transform(tokens))
            .collect();
        let targets: Vec<&str> = labels.iter().map(String::as_str).collect();
        let classifier = MultinomialNb::fit(&rows, &targets, vectorizer.vocabulary_len(), 1.0)?;
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vectorizer.vocabulary_len()
    }

    pub fn predict(&self, text: &str) -> String {
        let row = self.vectorizer.transform(&normalize(text));
        self.classifier.labels()[self.classifier.predict_class(&row)].clone()
    }

    pub fn predict_proba(&self, text: &str) -> Vec<(String, f64)> {
        let row = self.vectorizer.transform(&normalize(text));
        self.labels()
            .iter()
            .cloned()
            .zip(self.classifier.predict_proba(&row))
            .collect()
    }

    /// Fraction of `examples` whose predicted label matches.
    pub fn accuracy(&self, examples: &[LabeledExample]) -> f64 {
        if examples.is_empty() {
            return 0.0;
        }
        let correct = examples
            .par_iter()
            .filter(|ex| self.predict(&ex.text) == ex.label)
            .count();
        correct as f64 / examples.len() as f64
    }
}

/// Seeded shuffle split. The test side gets ceil(len * test_fraction) items.
pub fn train_test_split<T: Clone>(items: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let n_test = ((items.len() as f64) * test_fraction).ceil() as usize;
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let test = order[..n_test].iter().map(|&i| items[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| items[i].clone()).collect();
    (train, test)
}

/// Split, fit and evaluate. Returns the fitted pipeline and its held-out
/// accuracy in [0, 1].
pub fn fit_and_evaluate(examples: &[LabeledExample]) -> Result<(SentimentPipeline, f64)> {
    if examples.len() < 2 {
        anyhow::bail!(
            "labeled corpus has {} rows; at least 2 are needed for a train/test split",
            examples.len()
        );
    }
    let distinct: BTreeSet<&str> = examples.iter().map(|e| e.label.as_str()).collect();
    if distinct.len() < 2 {
        anyhow::bail!("labeled corpus has a single label; nothing to classify");
    }

    info!("Separation of data into training and test sets...");
    let (train, test) = train_test_split(examples, TEST_FRACTION, SPLIT_SEED);

    info!(train = train.len(), test = test.len(), "Training the model...");
    let texts: Vec<String> = train.iter().map(|e| e.text.clone()).collect();
    let labels: Vec<String> = train.iter().map(|e| e.label.clone()).collect();
    let pipeline = SentimentPipeline::fit(&texts, &labels)?;

    info!("Evaluating the model...");
    let accuracy = pipeline.accuracy(&test);
    Ok((pipeline, accuracy))
}

/// Full training run from a CSV on disk to a persisted artifact.
pub fn train_classifier(corpus_path: &Path, out_path: &Path) -> Result<(SentimentPipeline, TrainingReport)> {
    info!("Loading data...");
    let examples = load_labeled(corpus_path)?;
    let (pipeline, accuracy) = fit_and_evaluate(&examples)?;

    info!("Saving model...");
    write_json_atomic(out_path, &pipeline)?;

    info!("Training completed with accuracy: {accuracy:.2}");
    let report = TrainingReport::new(
        ArtifactKind::Classifier,
        examples.len(),
        Some(Metric {
            name: "accuracy",
            value: accuracy,
        }),
    );
    Ok((pipeline, report))
}

pub struct ClassifierTrainer {
    pub corpus_path: PathBuf,
}

impl Trainer for ClassifierTrainer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Classifier
    }

    fn train(&self, store: &ArtifactStore) -> Result<TrainingReport> {
        let (_, report) =
            train_classifier(&self.corpus_path, &store.path_of(ArtifactKind::Classifier))?;
        Ok(report)
    }
}

/// The live classifier, shared by request handlers.
///
/// Retraining builds a new pipeline off to the side and swaps it in here; a
/// classification running at the same time sees either the old or the new
/// pipeline in full.
#[derive(Clone)]
pub struct SharedClassifier {
    inner: Arc<RwLock<Arc<SentimentPipeline>>>,
}

impl SharedClassifier {
    pub fn new(pipeline: SentimentPipeline) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(pipeline))),
        }
    }

    pub async fn current(&self) -> Arc<SentimentPipeline> {
        Arc::clone(&*self.inner.read().await)
    }

    pub async fn replace(&self, pipeline: SentimentPipeline) {
        *self.inner.write().await = Arc::new(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let v = TfIdfVectorizer::fit(&[tokens(&["zebra", "apple"]), tokens(&["mango"])]).unwrap();
        assert_eq!(v.vocabulary["apple"], 0);
        assert_eq!(v.vocabulary["mango"], 1);
        assert_eq!(v.vocabulary["zebra"], 2);
    }

    #[test]
    fn test_idf_smoothing() {
        // "apple" in both docs, "zebra" in one: idf = ln(3/3)+1 and ln(3/2)+1
        let v = TfIdfVectorizer::fit(&[tokens(&["apple", "zebra"]), tokens(&["apple"])]).unwrap();
        assert!((v.idf[0] - 1.0).abs() < 1e-12);
        assert!((v.idf[1] - (1.5f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_transform_is_unit_length() {
        let v = TfIdfVectorizer::fit(&[tokens(&["apple", "zebra"]), tokens(&["apple"])]).unwrap();
        let row = v.transform(&tokens(&["apple", "zebra", "zebra", "unknown"]));
        let norm: f64 = row.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(v.transform(&tokens(&["unknown"])).is_empty());
    }

    #[test]
    fn test_empty_vocabulary_fails() {
        assert!(TfIdfVectorizer::fit(&[vec![], vec![]]).is_err());
    }

    #[test]
    fn test_naive_bayes_separates_features() {
        let rows = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]];
        let nb = MultinomialNb::fit(&rows, &["pos", "pos", "neg"], 2, 1.0).unwrap();
        assert_eq!(nb.labels(), ["neg", "pos"]);
        assert_eq!(nb.predict_class(&vec![(0, 1.0)]), 1);
        assert_eq!(nb.predict_class(&vec![(1, 1.0)]), 0);

        let proba = nb.predict_proba(&vec![(0, 1.0)]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba[1] > proba[0]);
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test) = train_test_split(&items, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let (train2, test2) = train_test_split(&items, 0.2, 42);
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, items);
    }

    #[test]
    fn test_split_rounds_test_side_up() {
        let items: Vec<usize> = (0..3).collect();
        let (train, test) = train_test_split(&items, 0.2, 42);
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 2);
    }

    #[test]
    fn test_fit_and_evaluate_rejects_tiny_corpora() {
        assert!(fit_and_evaluate(&[LabeledExample::new("good", "positive")]).is_err());
        assert!(fit_and_evaluate(&[
            LabeledExample::new("good film", "positive"),
            LabeledExample::new("nice film", "positive"),
        ])
        .is_err());
    }
}

// Paragraph vectors (PV-DM) trained with negative sampling.
//
// Each training step averages the document vector with the word vectors in a
// (randomly shrunk) window around a centre word and nudges that average
// towards predicting the centre word and away from a handful of noise words
// drawn from the unigram^0.75 distribution. Frequent words are subsampled and
// the learning rate decays linearly across all epochs.
//
// Inference for unseen text freezes the word and output weights and trains a
// fresh document vector from a seed derived from the tokens, so the same
// tokens always map to the same vector.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::store::{read_json, write_json_atomic, ArtifactKind, ArtifactStore};
use super::traits::{Trainer, TrainingReport};
use crate::corpus::{load_newsgroups, Corpus};
use crate::text::normalize;

/// Logit bound used when computing the sigmoid.
const MAX_EXP: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Doc2VecParams {
    pub vector_size: usize,
    pub window: usize,
    pub min_count: usize,
    pub epochs: usize,
    /// Noise words per positive example
    pub negative: usize,
    pub alpha: f32,
    pub min_alpha: f32,
    /// Subsampling threshold for frequent words (0 disables)
    pub sample: f64,
    pub seed: u64,
}

impl Default for Doc2VecParams {
    fn default() -> Self {
        Self {
            vector_size: 100,
            window: 5,
            min_count: 2,
            epochs: 40,
            negative: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            sample: 1e-3,
            seed: 1,
        }
    }
}

/// A token sequence tagged with its document identifier.
#[derive(Debug, Clone)]
pub struct TaggedDocument {
    pub words: Vec<String>,
    pub tag: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Doc2Vec {
    params: Doc2VecParams,
    vocab: HashMap<String, usize>,
    words: Vec<String>,
    counts: Vec<u64>,
    /// Input word vectors, flattened [word * vector_size]
    word_vectors: Vec<f32>,
    /// Negative-sampling output weights, flattened [word * vector_size]
    output_weights: Vec<f32>,
    /// Trained document vectors, flattened [doc * vector_size]
    doc_vectors: Vec<f32>,
    tags: Vec<String>,
    /// Cumulative unigram^0.75 distribution, rebuilt after loading
    #[serde(skip)]
    noise: OnceLock<Vec<f64>>,
}

impl Doc2Vec {
    pub fn train(documents: &[TaggedDocument], params: Doc2VecParams) -> Result<Self> {
        if params.vector_size == 0 || params.epochs == 0 {
            anyhow::bail!("vector_size and epochs must be positive");
        }

        let (vocab, words, counts) = build_vocab(documents, params.min_count);
        if words.is_empty() {
            anyhow::bail!(
                "no word occurs at least {} times; cannot train paragraph vectors",
                params.min_count
            );
        }

        let dim = params.vector_size;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let word_vectors = random_vectors(&mut rng, words.len(), dim);
        let doc_vectors = random_vectors(&mut rng, documents.len(), dim);

        let mut model = Self {
            params,
            vocab,
            output_weights: vec![0.0; words.len() * dim],
            words,
            counts,
            word_vectors,
            doc_vectors,
            tags: documents.iter().map(|d| d.tag.clone()).collect(),
            noise: OnceLock::new(),
        };

        let encoded: Vec<Vec<usize>> = documents.iter().map(|d| model.encode(&d.words)).collect();
        let keep_prob = model.keep_probabilities();
        let total_words: usize = encoded.iter().map(Vec::len).sum::<usize>().max(1);
        let total_steps = (total_words * params.epochs) as f32;

        let mut processed = 0usize;
        for epoch in 0..params.epochs {
            for (doc, ids) in encoded.iter().enumerate() {
                let alpha = params.alpha
                    - (params.alpha - params.min_alpha) * (processed as f32 / total_steps);
                let alpha = alpha.max(params.min_alpha);
                processed += ids.len();

                let kept: Vec<usize> = ids
                    .iter()
                    .copied()
                    .filter(|&w| keep_prob[w] >= 1.0 || rng.random::<f64>() < keep_prob[w])
                    .collect();

                let mut doc_vec = model.doc_vectors[doc * dim..(doc + 1) * dim].to_vec();
                model.train_document(&mut doc_vec, &kept, alpha, &mut rng);
                model.doc_vectors[doc * dim..(doc + 1) * dim].copy_from_slice(&doc_vec);
            }
            info!(epoch = epoch + 1, epochs = params.epochs, "Doc2Vec epoch complete");
        }

        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn vector_size(&self) -> usize {
        self.params.vector_size
    }

    pub fn vocabulary_len(&self) -> usize {
        self.words.len()
    }

    pub fn document_count(&self) -> usize {
        self.tags.len()
    }

    /// Trained vector for a training document tag.
    pub fn document_vector(&self, tag: &str) -> Option<&[f32]> {
        let dim = self.params.vector_size;
        self.tags
            .iter()
            .position(|t| t == tag)
            .map(|i| &self.doc_vectors[i * dim..(i + 1) * dim])
    }

    /// Embed an unseen token sequence.
    pub fn infer(&self, tokens: &[String]) -> Vec<f32> {
        let dim = self.params.vector_size;
        let mut rng = StdRng::seed_from_u64(self.params.seed ^ token_hash(tokens));
        let mut doc_vec = random_vectors(&mut rng, 1, dim);

        let ids = self.encode(tokens);
        if ids.is_empty() {
            return doc_vec;
        }

        let epochs = self.params.epochs;
        for epoch in 0..epochs {
            let alpha = self.params.alpha
                - (self.params.alpha - self.params.min_alpha) * (epoch as f32 / epochs as f32);
            self.infer_step(&mut doc_vec, &ids, alpha, &mut rng);
        }
        doc_vec
    }

    fn encode(&self, tokens: &[String]) -> Vec<usize> {
        tokens.iter().filter_map(|t| self.vocab.get(t).copied()).collect()
    }

    fn noise(&self) -> &[f64] {
        self.noise.get_or_init(|| {
            let mut cumulative = Vec::with_capacity(self.counts.len());
            let mut running = 0.0;
            for &c in &self.counts {
                running += (c as f64).powf(0.75);
                cumulative.push(running);
            }
            cumulative
        })
    }

    fn sample_noise(&self, rng: &mut StdRng) -> usize {
        let noise = self.noise();
        let total = noise.last().copied().unwrap_or(0.0);
        let target = rng.random::<f64>() * total;
        noise.partition_point(|&c| c <= target).min(noise.len() - 1)
    }

    fn keep_probabilities(&self) -> Vec<f64> {
        if self.params.sample <= 0.0 {
            return vec![1.0; self.counts.len()];
        }
        let total: u64 = self.counts.iter().sum();
        let threshold = self.params.sample * total as f64;
        self.counts
            .iter()
            .map(|&c| {
                let c = c as f64;
                ((c / threshold).sqrt() + 1.0) * threshold / c
            })
            .collect()
    }

    /// One pass over a document's words, updating every weight it touches.
    fn train_document(&mut self, doc_vec: &mut [f32], ids: &[usize], alpha: f32, rng: &mut StdRng) {
        let dim = self.params.vector_size;
        let mut hidden = vec![0.0f32; dim];
        let mut grad = vec![0.0f32; dim];

        for (pos, &centre) in ids.iter().enumerate() {
            let context = self.context(ids, pos, rng);
            let n = (context.len() + 1) as f32;

            hidden.copy_from_slice(doc_vec);
            for &w in &context {
                add_into(&mut hidden, &self.word_vectors[w * dim..(w + 1) * dim]);
            }
            hidden.iter_mut().for_each(|h| *h /= n);
            grad.iter_mut().for_each(|g| *g = 0.0);

            self.negative_sampling(centre, &hidden, &mut grad, alpha, rng);

            for (d, g) in doc_vec.iter_mut().zip(&grad) {
                *d += g / n;
            }
            for &w in &context {
                for (x, g) in self.word_vectors[w * dim..(w + 1) * dim].iter_mut().zip(&grad) {
                    *x += g / n;
                }
            }
        }
    }

    fn infer_step(&self, doc_vec: &mut [f32], ids: &[usize], alpha: f32, rng: &mut StdRng) {
        let dim = self.params.vector_size;
        let mut hidden = vec![0.0f32; dim];
        let mut grad = vec![0.0f32; dim];

        for (pos, &centre) in ids.iter().enumerate() {
            let context = self.context(ids, pos, rng);
            let n = (context.len() + 1) as f32;

            hidden.copy_from_slice(doc_vec);
            for &w in &context {
                add_into(&mut hidden, &self.word_vectors[w * dim..(w + 1) * dim]);
            }
            hidden.iter_mut().for_each(|h| *h /= n);
            grad.iter_mut().for_each(|g| *g = 0.0);

            for k in 0..=self.params.negative {
                let (target, label) = if k == 0 {
                    (centre, 1.0)
                } else {
                    let t = self.sample_noise(rng);
                    if t == centre {
                        continue;
                    }
                    (t, 0.0)
                };
                let out = &self.output_weights[target * dim..(target + 1) * dim];
                let g = (label - sigmoid(dot(&hidden, out))) * alpha;
                for (gr, o) in grad.iter_mut().zip(out) {
                    *gr += g * o;
                }
            }

            for (d, g) in doc_vec.iter_mut().zip(&grad) {
                *d += g / n;
            }
        }
    }

    fn negative_sampling(
        &mut self,
        centre: usize,
        hidden: &[f32],
        grad: &mut [f32],
        alpha: f32,
        rng: &mut StdRng,
    ) {
        let dim = self.params.vector_size;
        for k in 0..=self.params.negative {
            let (target, label) = if k == 0 {
                (centre, 1.0)
            } else {
                let t = self.sample_noise(rng);
                if t == centre {
                    continue;
                }
                (t, 0.0)
            };
            let out = &mut self.output_weights[target * dim..(target + 1) * dim];
            let g = (label - sigmoid(dot(hidden, out))) * alpha;
            for ((gr, o), h) in grad.iter_mut().zip(out.iter_mut()).zip(hidden) {
                *gr += g * *o;
                *o += g * h;
            }
        }
    }

    /// Word ids around `pos`, window shrunk by a random amount as in word2vec.
    fn context(&self, ids: &[usize], pos: usize, rng: &mut StdRng) -> Vec<usize> {
        let window = self.params.window.max(1);
        let reduced = window - rng.random_range(0..window);
        let lo = pos.saturating_sub(reduced);
        let hi = (pos + reduced + 1).min(ids.len());
        (lo..hi).filter(|&i| i != pos).map(|i| ids[i]).collect()
    }
}

fn build_vocab(
    documents: &[TaggedDocument],
    min_count: usize,
) -> (HashMap<String, usize>, Vec<String>, Vec<u64>) {
    let mut freq: HashMap<&str, u64> = HashMap::new();
    for doc in documents {
        for w in &doc.words {
            *freq.entry(w.as_str()).or_insert(0) += 1;
        }
    }

    let mut kept: Vec<(&str, u64)> = freq
        .into_iter()
        .filter(|&(_, c)| c >= min_count as u64)
        .collect();
    // most frequent first, ties alphabetical, so ids are stable
    kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let words: Vec<String> = kept.iter().map(|(w, _)| w.to_string()).collect();
    let counts = kept.iter().map(|&(_, c)| c).collect();
    let vocab = words.iter().enumerate().map(|(i, w)| (w.clone(), i)).collect();
    (vocab, words, counts)
}

fn random_vectors(rng: &mut StdRng, rows: usize, dim: usize) -> Vec<f32> {
    (0..rows * dim)
        .map(|_| (rng.random::<f32>() - 0.5) / dim as f32)
        .collect()
}

pub(crate) fn token_hash(tokens: &[String]) -> u64 {
    // FNV-1a, stable across runs and platforms
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for token in tokens {
        for byte in token.bytes().chain(std::iter::once(0)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    hash
}

fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-MAX_EXP, MAX_EXP);
    1.0 / (1.0 + (-x).exp())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn add_into(acc: &mut [f32], v: &[f32]) {
    for (a, x) in acc.iter_mut().zip(v) {
        *a += x;
    }
}

/// Normalize, tag by position, fit, persist.
pub fn train_embeddings(
    corpus: &Corpus,
    params: Doc2VecParams,
    out_path: &Path,
) -> Result<(Doc2Vec, TrainingReport)> {
    let documents: Vec<TaggedDocument> = corpus
        .documents
        .par_iter()
        .enumerate()
        .map(|(i, doc)| TaggedDocument {
            words: normalize(doc),
            tag: i.to_string(),
        })
        .collect();

    info!(documents = documents.len(), "Training Doc2Vec model...");
    let model = Doc2Vec::train(&documents, params)?;

    info!(vocabulary = model.vocabulary_len(), "Saving Doc2Vec model...");
    write_json_atomic(out_path, &model)?;

    let report = TrainingReport::new(ArtifactKind::Embeddings, documents.len(), None);
    Ok((model, report))
}

pub struct EmbeddingTrainer {
    pub corpus_dir: PathBuf,
    pub params: Doc2VecParams,
}

impl Trainer for EmbeddingTrainer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Embeddings
    }

    fn train(&self, store: &ArtifactStore) -> Result<TrainingReport> {
        let corpus = load_newsgroups(&self.corpus_dir)?;
        let (_, report) =
            train_embeddings(&corpus, self.params, &store.path_of(ArtifactKind::Embeddings))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> Doc2VecParams {
        Doc2VecParams {
            vector_size: 16,
            window: 2,
            min_count: 1,
            epochs: 5,
            sample: 0.0,
            ..Doc2VecParams::default()
        }
    }

    fn docs() -> Vec<TaggedDocument> {
        [
            "rocket orbit launch satellite orbit",
            "engine car wheel engine brake",
            "rocket launch pad satellite",
            "car brake wheel tire",
        ]
        .iter()
        .enumerate()
        .map(|(i, text)| TaggedDocument {
            words: text.split_whitespace().map(str::to_string).collect(),
            tag: i.to_string(),
        })
        .collect()
    }

    #[test]
    fn test_default_params() {
        let p = Doc2VecParams::default();
        assert_eq!((p.vector_size, p.window, p.min_count, p.epochs), (100, 5, 2, 40));
    }

    #[test]
    fn test_vocab_respects_min_count() {
        let (vocab, words, counts) = build_vocab(&docs(), 2);
        assert!(vocab.contains_key("rocket"));
        assert!(!vocab.contains_key("tire"));
        assert_eq!(words.len(), counts.len());
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_train_shapes() {
        let model = Doc2Vec::train(&docs(), small_params()).unwrap();
        assert_eq!(model.document_count(), 4);
        assert_eq!(model.document_vector("0").unwrap().len(), 16);
        assert!(model.document_vector("missing").is_none());
        assert!(model.doc_vectors.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_infer_is_deterministic() {
        let model = Doc2Vec::train(&docs(), small_params()).unwrap();
        let tokens: Vec<String> = vec!["rocket".into(), "orbit".into()];
        let a = model.infer(&tokens);
        let b = model.infer(&tokens);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_infer_unknown_tokens() {
        let model = Doc2Vec::train(&docs(), small_params()).unwrap();
        let v = model.infer(&["zzz".to_string()]);
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_train_fails_without_vocabulary() {
        let params = Doc2VecParams {
            min_count: 100,
            ..small_params()
        };
        assert!(Doc2Vec::train(&docs(), params).is_err());
    }

    #[test]
    fn test_noise_sampling_in_range() {
        let model = Doc2Vec::train(&docs(), small_params()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(model.sample_noise(&mut rng) < model.vocabulary_len());
        }
    }

    #[test]
    fn test_token_hash_depends_on_order() {
        let a = token_hash(&["a".to_string(), "b".to_string()]);
        let b = token_hash(&["b".to_string(), "a".to_string()]);
        assert_ne!(a, b);
    }
}

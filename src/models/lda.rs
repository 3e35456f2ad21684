// Latent Dirichlet Allocation fit by batch variational Bayes.
//
// lambda (topics x vocabulary) holds the variational Dirichlet parameters of
// the topic-word distributions. Each pass runs the per-document E-step
// against exp(E[log beta]) in parallel, accumulates sufficient statistics,
// then replaces lambda in one M-step. Priors are symmetric: alpha = eta = 1/K.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::digamma;
use tracing::info;

use super::doc2vec::token_hash;
use super::store::{read_json, write_json_pair, ArtifactKind, ArtifactStore};
use super::traits::{Metric, Trainer, TrainingReport};
use crate::corpus::{load_newsgroups, Corpus};
use crate::text::normalize;

pub const DEFAULT_NUM_TOPICS: usize = 20;
pub const DEFAULT_PASSES: usize = 15;

const MAX_ESTEP_ITERATIONS: usize = 50;
const GAMMA_THRESHOLD: f64 = 0.001;
/// Topics below this weight are left out of a document's distribution.
pub const MINIMUM_PROBABILITY: f64 = 0.01;
const LDA_SEED: u64 = 42;

/// Sparse bag-of-words: (token id, count), sorted by id.
pub type Bow = Vec<(usize, u32)>;

/// Token ↔ id mapping with document frequencies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    dfs: Vec<usize>,
    num_docs: usize,
}

impl Dictionary {
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut dict = Self::default();
        for doc in documents {
            dict.add_document(doc);
        }
        dict
    }

    /// New tokens get the next free ids, in sorted order within a document.
    pub fn add_document(&mut self, tokens: &[String]) {
        let mut unique: Vec<&String> = tokens.iter().collect();
        unique.sort();
        unique.dedup();

        for token in unique {
            let id = match self.token2id.get(token) {
                Some(&id) => id,
                None => {
                    let id = self.id2token.len();
                    self.token2id.insert(token.clone(), id);
                    self.id2token.push(token.clone());
                    self.dfs.push(0);
                    id
                }
            };
            self.dfs[id] += 1;
        }
        self.num_docs += 1;
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn id_of(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    pub fn doc_freq(&self, id: usize) -> usize {
        self.dfs.get(id).copied().unwrap_or(0)
    }

    /// Hash of the id → token assignment. A topic model is only valid
    /// against the dictionary whose fingerprint it records.
    pub fn fingerprint(&self) -> u64 {
        token_hash(&self.id2token)
    }

    /// Count known tokens; unknown ones are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> Bow {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: Bow = counts.into_iter().collect();
        bow.sort_unstable_by_key(|&(id, _)| id);
        bow
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LdaModel {
    num_topics: usize,
    num_terms: usize,
    alpha: f64,
    eta: f64,
    /// Flattened [topic * num_terms + term]
    lambda: Vec<f64>,
    /// `Dictionary::fingerprint` of the dictionary this model was fit against
    dictionary_fingerprint: u64,
    #[serde(skip)]
    exp_elog_beta: OnceLock<Vec<f64>>,
}

impl LdaModel {
    pub fn train(corpus: &[Bow], num_terms: usize, num_topics: usize, passes: usize) -> Result<Self> {
        if num_topics == 0 {
            anyhow::bail!("num_topics must be positive");
        }
        if num_terms == 0 {
            anyhow::bail!("cannot fit a topic model on an empty dictionary");
        }

        let prior = 1.0 / num_topics as f64;
        let mut rng = StdRng::seed_from_u64(LDA_SEED);
        let lambda = (0..num_topics * num_terms)
            .map(|_| rng.random_range(0.9..1.1))
            .collect();

        let mut model = Self {
            num_topics,
            num_terms,
            alpha: prior,
            eta: prior,
            lambda,
            dictionary_fingerprint: 0,
            exp_elog_beta: OnceLock::new(),
        };

        for pass in 0..passes {
            let eb = model.compute_exp_elog_beta();
            let sstats = model.accumulate_sstats(corpus, &eb);

            let eta = model.eta;
            model.lambda = sstats.iter().zip(&eb).map(|(s, b)| eta + s * b).collect();

            info!(pass = pass + 1, passes, "LDA pass complete");
        }
        model.exp_elog_beta = OnceLock::new();

        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = read_json(path)?;
        if model.lambda.len() != model.num_topics * model.num_terms {
            anyhow::bail!("topic model at {} is corrupt", path.display());
        }
        Ok(model)
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    /// Normalized topic weights for one document, entries under
    /// `MINIMUM_PROBABILITY` omitted. Never empty.
    pub fn document_topics(&self, bow: &[(usize, u32)]) -> Vec<(usize, f64)> {
        let gamma = self.infer_gamma(bow, self.exp_elog_beta());
        let total: f64 = gamma.iter().sum();
        let weights: Vec<(usize, f64)> = gamma
            .iter()
            .enumerate()
            .map(|(k, g)| (k, g / total))
            .collect();

        let kept: Vec<(usize, f64)> = weights
            .iter()
            .copied()
            .filter(|&(_, w)| w >= MINIMUM_PROBABILITY)
            .collect();
        if kept.is_empty() {
            weights
                .into_iter()
                .fold(None, |best: Option<(usize, f64)>, cur| match best {
                    Some(b) if b.1 >= cur.1 => Some(b),
                    _ => Some(cur),
                })
                .into_iter()
                .collect()
        } else {
            kept
        }
    }

    /// Highest-weight topic; ties go to the lowest id.
    pub fn dominant_topic(&self, bow: &[(usize, u32)]) -> usize {
        let mut best = (0, f64::MIN);
        for (topic, weight) in self.document_topics(bow) {
            if weight > best.1 {
                best = (topic, weight);
            }
        }
        best.0
    }

    /// Top `n` term ids of a topic by normalized lambda, ties by id.
    pub fn top_term_ids(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics {
            return Vec::new();
        }
        let row = &self.lambda[topic * self.num_terms..(topic + 1) * self.num_terms];
        let total: f64 = row.iter().sum();
        let mut terms: Vec<(usize, f64)> =
            row.iter().enumerate().map(|(i, v)| (i, v / total)).collect();
        terms.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        terms.truncate(n);
        terms
    }

    pub fn top_terms(&self, dictionary: &Dictionary, topic: usize, n: usize) -> Vec<(String, f64)> {
        self.top_term_ids(topic, n)
            .into_iter()
            .filter_map(|(id, w)| dictionary.token(id).map(|t| (t.to_string(), w)))
            .collect()
    }

    /// `0.015*"word" + 0.012*"other"`
    pub fn format_topic(&self, dictionary: &Dictionary, topic: usize, n: usize) -> String {
        self.top_terms(dictionary, topic, n)
            .iter()
            .map(|(term, w)| format!("{w:.3}*\"{term}\""))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// Average log-likelihood per token under the fitted means.
    pub fn per_word_log_likelihood(&self, corpus: &[Bow]) -> f64 {
        let k = self.num_topics;
        let v = self.num_terms;
        let mut beta = Vec::with_capacity(self.lambda.len());
        for row in self.lambda.chunks(v) {
            let total: f64 = row.iter().sum();
            beta.extend(row.iter().map(|x| x / total));
        }

        let (ll, words) = corpus
            .par_iter()
            .map(|bow| {
                let gamma = self.infer_gamma(bow, self.exp_elog_beta());
                let total: f64 = gamma.iter().sum();
                let mut ll = 0.0;
                let mut words = 0u64;
                for &(id, cnt) in bow {
                    let p: f64 = (0..k).map(|t| gamma[t] / total * beta[t * v + id]).sum();
                    ll += f64::from(cnt) * p.max(f64::MIN_POSITIVE).ln();
                    words += u64::from(cnt);
                }
                (ll, words)
            })
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        if words == 0 {
            0.0
        } else {
            ll / words as f64
        }
    }

    fn exp_elog_beta(&self) -> &[f64] {
        self.exp_elog_beta.get_or_init(|| self.compute_exp_elog_beta())
    }

    fn compute_exp_elog_beta(&self) -> Vec<f64> {
        let v = self.num_terms;
        let mut out = Vec::with_capacity(self.lambda.len());
        for row in self.lambda.chunks(v) {
            let psi_total = digamma(row.iter().sum());
            out.extend(row.iter().map(|&x| (digamma(x) - psi_total).exp()));
        }
        out
    }

    fn accumulate_sstats(&self, corpus: &[Bow], eb: &[f64]) -> Vec<f64> {
        let size = self.lambda.len();
        let chunk = corpus.len().div_ceil(rayon::current_num_threads()).max(1);

        corpus
            .par_chunks(chunk)
            .map(|docs| {
                let mut sstats = vec![0.0; size];
                for bow in docs {
                    self.estep_document(bow, eb, Some(&mut sstats));
                }
                sstats
            })
            .reduce(
                || vec![0.0; size],
                |mut acc, part| {
                    acc.iter_mut().zip(&part).for_each(|(a, p)| *a += p);
                    acc
                },
            )
    }

    fn infer_gamma(&self, bow: &[(usize, u32)], eb: &[f64]) -> Vec<f64> {
        self.estep_document(bow, eb, None)
    }

    /// Per-document variational E-step. Returns gamma and, when given,
    /// adds this document's contribution to `sstats`.
    fn estep_document(
        &self,
        bow: &[(usize, u32)],
        eb: &[f64],
        sstats: Option<&mut Vec<f64>>,
    ) -> Vec<f64> {
        let k = self.num_topics;
        let v = self.num_terms;
        let bow: Vec<(usize, f64)> = bow
            .iter()
            .filter(|&&(id, _)| id < v)
            .map(|&(id, c)| (id, f64::from(c)))
            .collect();
        let length: f64 = bow.iter().map(|&(_, c)| c).sum();

        let mut gamma = vec![self.alpha + length / k as f64; k];
        if bow.is_empty() {
            return gamma;
        }

        let mut exp_elog_theta = exp_dirichlet_expectation(&gamma);
        let mut phinorm = vec![0.0; bow.len()];
        let update_phinorm = |theta: &[f64], phinorm: &mut [f64]| {
            for (slot, &(id, _)) in phinorm.iter_mut().zip(&bow) {
                *slot = (0..k).map(|t| theta[t] * eb[t * v + id]).sum::<f64>() + 1e-100;
            }
        };
        update_phinorm(&exp_elog_theta, &mut phinorm);

        for _ in 0..MAX_ESTEP_ITERATIONS {
            let previous = gamma.clone();
            for t in 0..k {
                let s: f64 = bow
                    .iter()
                    .zip(&phinorm)
                    .map(|(&(id, c), pn)| c / pn * eb[t * v + id])
                    .sum();
                gamma[t] = self.alpha + exp_elog_theta[t] * s;
            }
            exp_elog_theta = exp_dirichlet_expectation(&gamma);
            update_phinorm(&exp_elog_theta, &mut phinorm);

            let change: f64 =
                gamma.iter().zip(&previous).map(|(a, b)| (a - b).abs()).sum::<f64>() / k as f64;
            if change < GAMMA_THRESHOLD {
                break;
            }
        }

        if let Some(sstats) = sstats {
            for (&(id, c), pn) in bow.iter().zip(&phinorm) {
                for t in 0..k {
                    sstats[t * v + id] += exp_elog_theta[t] * c / pn;
                }
            }
        }
        gamma
    }
}

fn exp_dirichlet_expectation(alpha: &[f64]) -> Vec<f64> {
    let psi_total = digamma(alpha.iter().sum());
    alpha.iter().map(|&a| (digamma(a) - psi_total).exp()).collect()
}

/// A fitted model together with the dictionary it was fit against.
#[derive(Debug)]
pub struct TopicModel {
    pub model: LdaModel,
    pub dictionary: Dictionary,
}

impl TopicModel {
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        let model = LdaModel::load(&store.path_of(ArtifactKind::Topics))?;
        let dictionary: Dictionary = read_json(&store.topic_dictionary_path())?;
        if dictionary.len() != model.num_terms() {
            anyhow::bail!(
                "topic dictionary has {} terms but the model expects {}",
                dictionary.len(),
                model.num_terms()
            );
        }
        if dictionary.fingerprint() != model.dictionary_fingerprint {
            anyhow::bail!(
                "topic dictionary at {} does not match the model it is stored with",
                store.topic_dictionary_path().display()
            );
        }
        Ok(Self { model, dictionary })
    }

    pub fn bow(&self, tokens: &[String]) -> Bow {
        self.dictionary.doc2bow(tokens)
    }

    pub fn top_terms(&self, topic: usize, n: usize) -> Vec<(String, f64)> {
        self.model.top_terms(&self.dictionary, topic, n)
    }

    pub fn format_topic(&self, topic: usize, n: usize) -> String {
        self.model.format_topic(&self.dictionary, topic, n)
    }
}

pub fn train_topics(
    corpus: &Corpus,
    num_topics: usize,
    passes: usize,
    store: &ArtifactStore,
) -> Result<(TopicModel, TrainingReport)> {
    let texts: Vec<Vec<String>> = corpus.documents.par_iter().map(|d| normalize(d)).collect();

    info!("Creating dictionary and corpus for LDA...");
    let dictionary = Dictionary::from_documents(&texts);
    let bows: Vec<Bow> = texts.iter().map(|t| dictionary.doc2bow(t)).collect();

    info!(topics = num_topics, terms = dictionary.len(), "Training LDA model...");
    let mut model = LdaModel::train(&bows, dictionary.len(), num_topics, passes)?;
    model.dictionary_fingerprint = dictionary.fingerprint();
    let ll = model.per_word_log_likelihood(&bows);
    info!("LDA per-word log-likelihood: {ll:.4}");

    info!("Saving LDA model and dictionary...");
    write_json_pair(
        (&store.topic_dictionary_path(), &dictionary),
        (&store.path_of(ArtifactKind::Topics), &model),
    )?;

    let report = TrainingReport::new(
        ArtifactKind::Topics,
        texts.len(),
        Some(Metric {
            name: "per_word_log_likelihood",
            value: ll,
        }),
    );
    Ok((TopicModel { model, dictionary }, report))
}

pub struct TopicTrainer {
    pub corpus_dir: PathBuf,
    pub num_topics: usize,
    pub passes: usize,
}

impl Trainer for TopicTrainer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Topics
    }

    fn train(&self, store: &ArtifactStore) -> Result<TrainingReport> {
        let corpus = load_newsgroups(&self.corpus_dir)?;
        let (_, report) = train_topics(&corpus, self.num_topics, self.passes, store)?;
        Ok(report)
    }
}

// Group a batch of sentences under human-readable topic labels.
//
// Every sentence is embedded with the paragraph-vector model and the batch is
// clustered with DBSCAN; the clusters are reported alongside the groups but do
// not decide them. Grouping is by dominant LDA topic: the label is the first
// non-stopword among the topic's top terms, capitalized.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::dbscan::{dbscan, ClusterLabel};
use crate::models::doc2vec::Doc2Vec;
use crate::models::lda::TopicModel;
use crate::text::{is_stopword, normalize};

pub const DEFAULT_EPS: f32 = 0.5;
pub const DEFAULT_MIN_SAMPLES: usize = 20;
/// How many top terms are considered when picking a label.
pub const LABEL_TERMS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct GroupingResult {
    /// Label → sentences, in first-seen label order
    pub groups: IndexMap<String, Vec<String>>,
    /// DBSCAN label per input sentence, same order as the input
    pub clusters: Vec<ClusterLabel>,
}

pub struct TopicGrouper {
    embeddings: Doc2Vec,
    topics: TopicModel,
    eps: f32,
    min_samples: usize,
}

impl TopicGrouper {
    pub fn new(embeddings: Doc2Vec, topics: TopicModel) -> Self {
        Self {
            embeddings,
            topics,
            eps: DEFAULT_EPS,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }

    pub fn with_clustering(mut self, eps: f32, min_samples: usize) -> Self {
        self.eps = eps;
        self.min_samples = min_samples;
        self
    }

    /// CPU-bound; call from spawn_blocking in async contexts.
    pub fn group(&self, sentences: &[String]) -> GroupingResult {
        let tokenized: Vec<Vec<String>> = sentences.par_iter().map(|s| normalize(s)).collect();

        let vectors: Vec<Vec<f32>> = tokenized
            .par_iter()
            .map(|tokens| self.embeddings.infer(tokens))
            .collect();
        let clusters = dbscan(&vectors, self.eps, self.min_samples);
        debug!(
            sentences = sentences.len(),
            clusters = clusters
                .iter()
                .filter_map(|c| match c {
                    ClusterLabel::Cluster(id) => Some(*id),
                    ClusterLabel::Noise => None,
                })
                .max()
                .map_or(0, |m| m + 1),
            noise = clusters.iter().filter(|c| c.is_noise()).count(),
            "Clustered sentence embeddings"
        );

        let labels: Vec<String> = tokenized
            .par_iter()
            .map(|tokens| {
                let bow = self.topics.bow(tokens);
                let topic = self.topics.model.dominant_topic(&bow);
                self.label_for_topic(topic)
            })
            .collect();

        let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
        for (sentence, label) in sentences.iter().zip(labels) {
            groups.entry(label).or_default().push(sentence.clone());
        }

        GroupingResult { groups, clusters }
    }

    pub fn label_for_topic(&self, topic: usize) -> String {
        let terms: Vec<String> = self
            .topics
            .top_terms(topic, LABEL_TERMS)
            .into_iter()
            .map(|(term, _)| term)
            .collect();
        label_from_terms(topic, &terms)
    }
}

/// First non-stopword term, else the first term, capitalized.
pub fn label_from_terms(topic: usize, terms: &[String]) -> String {
    terms
        .iter()
        .find(|t| !is_stopword(t))
        .or_else(|| terms.first())
        .map(|t| capitalize(t))
        .unwrap_or_else(|| format!("Topic {topic}"))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_label_skips_stopwords() {
        assert_eq!(label_from_terms(3, &terms(&["the", "of", "rocket"])), "Rocket");
    }

    #[test]
    fn test_label_falls_back_to_first_term() {
        assert_eq!(label_from_terms(3, &terms(&["the", "of"])), "The");
    }

    #[test]
    fn test_label_for_topic_without_terms() {
        assert_eq!(label_from_terms(7, &[]), "Topic 7");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("nASA"), "Nasa");
        assert_eq!(capitalize(""), "");
    }
}

// Text normalizer.
//
// lowercase → split into words → keep alphabetic tokens → drop stopwords →
// lemmatize. The output order follows the input so paragraph-vector training
// still sees word context.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};

use super::lemma::lemmatize;

static STOPWORDS: LazyLock<HashSet<String>> =
    LazyLock::new(|| get(LANGUAGE::English).into_iter().collect());

/// Which cleaning flavour to apply.
///
/// `Nltk` is the one every model trains on. `Spacy` is offered by the
/// `/preprocess` endpoint and additionally keeps tokens containing digits
/// ("covid19", "2024").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    #[default]
    Nltk,
    Spacy,
}

impl NormalizeMethod {
    /// Parse the `method` query parameter. Anything unrecognised falls back
    /// to `Nltk`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("spacy") => NormalizeMethod::Spacy,
            _ => NormalizeMethod::Nltk,
        }
    }
}

/// True if `word` (already lowercased) is in the English stopword list.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Clean `text` into an ordered sequence of lemmatized, stopword-free,
/// purely alphabetic lowercase tokens. Empty input gives an empty vector.
pub fn normalize(text: &str) -> Vec<String> {
    normalize_with(text, NormalizeMethod::Nltk)
}

/// Clean `text` with the given method.
pub fn normalize_with(text: &str, method: NormalizeMethod) -> Vec<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .filter(|tok| match method {
            NormalizeMethod::Nltk => tok.chars().all(char::is_alphabetic),
            NormalizeMethod::Spacy => true,
        })
        .filter(|tok| !is_stopword(tok))
        .map(lemmatize)
        // a lemma can land on a stopword ("ours" style plurals)
        .filter(|lemma| !is_stopword(lemma))
        .collect()
}

// Normalized string similarity.
//
// A closed set of metrics, each returning a value in [0, 1] where 1 means
// identical. Requests name the metric by string; parsing into
// `SimilarityMethod` is where an unknown name is rejected.
//
// All metrics work on Unicode scalar values, not bytes. Two empty strings are
// always fully similar.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("Invalid method: '{0}'")]
    UnknownMethod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMethod {
    Hamming,
    Levenshtein,
    DamerauLevenshtein,
    Jaro,
    JaroWinkler,
    Jaccard,
    SorensenDice,
    Overlap,
    Cosine,
    LcsSeq,
    LcsStr,
    RatcliffObershelp,
    Prefix,
    Postfix,
}

impl SimilarityMethod {
    pub const ALL: [SimilarityMethod; 14] = [
        SimilarityMethod::Hamming,
        SimilarityMethod::Levenshtein,
        SimilarityMethod::DamerauLevenshtein,
        SimilarityMethod::Jaro,
        SimilarityMethod::JaroWinkler,
        SimilarityMethod::Jaccard,
        SimilarityMethod::SorensenDice,
        SimilarityMethod::Overlap,
        SimilarityMethod::Cosine,
        SimilarityMethod::LcsSeq,
        SimilarityMethod::LcsStr,
        SimilarityMethod::RatcliffObershelp,
        SimilarityMethod::Prefix,
        SimilarityMethod::Postfix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SimilarityMethod::Hamming => "hamming",
            SimilarityMethod::Levenshtein => "levenshtein",
            SimilarityMethod::DamerauLevenshtein => "damerau_levenshtein",
            SimilarityMethod::Jaro => "jaro",
            SimilarityMethod::JaroWinkler => "jaro_winkler",
            SimilarityMethod::Jaccard => "jaccard",
            SimilarityMethod::SorensenDice => "sorensen_dice",
            SimilarityMethod::Overlap => "overlap",
            SimilarityMethod::Cosine => "cosine",
            SimilarityMethod::LcsSeq => "lcsseq",
            SimilarityMethod::LcsStr => "lcsstr",
            SimilarityMethod::RatcliffObershelp => "ratcliff_obershelp",
            SimilarityMethod::Prefix => "prefix",
            SimilarityMethod::Postfix => "postfix",
        }
    }

    /// Similarity of `a` and `b` in [0, 1].
    pub fn normalized_similarity(self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }

        let sim = match self {
            SimilarityMethod::Hamming => 1.0 - ratio(hamming(&a, &b), max_len(&a, &b)),
            SimilarityMethod::Levenshtein => 1.0 - ratio(levenshtein(&a, &b), max_len(&a, &b)),
            SimilarityMethod::DamerauLevenshtein => {
                1.0 - ratio(damerau_levenshtein(&a, &b), max_len(&a, &b))
            }
            SimilarityMethod::Jaro => jaro(&a, &b),
            SimilarityMethod::JaroWinkler => jaro_winkler(&a, &b),
            SimilarityMethod::Jaccard => {
                let (inter, union) = multiset_overlap(&a, &b);
                ratio(inter, union)
            }
            SimilarityMethod::SorensenDice => ratio(2 * multiset_overlap(&a, &b).0, a.len() + b.len()),
            SimilarityMethod::Overlap => ratio(multiset_overlap(&a, &b).0, a.len().min(b.len())),
            SimilarityMethod::Cosine => {
                let denom = ((a.len() * b.len()) as f64).sqrt();
                if denom == 0.0 {
                    0.0
                } else {
                    multiset_overlap(&a, &b).0 as f64 / denom
                }
            }
            SimilarityMethod::LcsSeq => ratio(lcs_seq_len(&a, &b), max_len(&a, &b)),
            SimilarityMethod::LcsStr => ratio(longest_common_substring(&a, &b).2, max_len(&a, &b)),
            SimilarityMethod::RatcliffObershelp => {
                ratio(2 * ratcliff_obershelp_matches(&a, &b), a.len() + b.len())
            }
            SimilarityMethod::Prefix => {
                let common = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
                ratio(common, max_len(&a, &b))
            }
            SimilarityMethod::Postfix => {
                let common = a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count();
                ratio(common, max_len(&a, &b))
            }
        };
        sim.clamp(0.0, 1.0)
    }
}

impl FromStr for SimilarityMethod {
    type Err = SimilarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "sorensen" {
            return Ok(SimilarityMethod::SorensenDice);
        }
        SimilarityMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| SimilarityError::UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse `method` and score the two lines.
pub fn calculate_similarity(method: &str, line1: &str, line2: &str) -> Result<f64, SimilarityError> {
    let method: SimilarityMethod = method.parse()?;
    Ok(method.normalized_similarity(line1, line2))
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn max_len(a: &[char], b: &[char]) -> usize {
    a.len().max(b.len())
}

fn hamming(a: &[char], b: &[char]) -> usize {
    let mismatches = a.iter().zip(b).filter(|(x, y)| x != y).count();
    mismatches + a.len().abs_diff(b.len())
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Restricted Damerau-Levenshtein (optimal string alignment).
fn damerau_levenshtein(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut d = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[n][m]
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let a_seq = a.iter().zip(&a_matched).filter(|(_, &m)| m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, &m)| m).map(|(c, _)| c);
    let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count() / 2;

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0
}

fn jaro_winkler(a: &[char], b: &[char]) -> f64 {
    let sim = jaro(a, b);
    if sim <= 0.7 {
        return sim;
    }
    let prefix = a.iter().zip(b).take(4).take_while(|(x, y)| x == y).count();
    sim + prefix as f64 * 0.1 * (1.0 - sim)
}

/// Returns (intersection, union) sizes of the two character multisets.
fn multiset_overlap(a: &[char], b: &[char]) -> (usize, usize) {
    let count = |s: &[char]| {
        let mut counts: HashMap<char, usize> = HashMap::new();
        for &c in s {
            *counts.entry(c).or_insert(0) += 1;
        }
        counts
    };
    let ca = count(a);
    let cb = count(b);

    let inter = ca
        .iter()
        .map(|(c, n)| (*n).min(cb.get(c).copied().unwrap_or(0)))
        .sum();
    let union = a.len() + b.len() - inter;
    (inter, union)
}

fn lcs_seq_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Longest common substring as (start in a, start in b, length).
/// The earliest occurrence in `a` wins ties.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            if curr[j + 1] > best.2 {
                best = (i + 1 - curr[j + 1], j + 1 - curr[j + 1], curr[j + 1]);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.iter_mut().for_each(|v| *v = 0);
    }
    best
}

fn ratcliff_obershelp_matches(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + ratcliff_obershelp_matches(&a[..i], &b[..j])
        + ratcliff_obershelp_matches(&a[i + len..], &b[j + len..])
}

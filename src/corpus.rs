// Training corpora.
//
// Two sources feed the trainers:
// - a labeled sentiment CSV (IMDB-style `review,sentiment` columns) for the
//   classifier;
// - the 20 Newsgroups collection as a directory tree (one sub-directory per
//   group, one file per post) for the paragraph-vector and topic models.
//
// Newsgroup posts are mostly Latin-1, so files are decoded byte-for-char
// rather than as UTF-8. Files are visited in sorted path order so positional
// document tags are stable between runs.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use walkdir::WalkDir;

/// One labeled training row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabeledExample {
    #[serde(rename = "review")]
    pub text: String,
    #[serde(rename = "sentiment")]
    pub label: String,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Read a labeled CSV with `review` and `sentiment` header columns.
pub fn load_labeled(path: &Path) -> Result<Vec<LabeledExample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open labeled corpus {}", path.display()))?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<LabeledExample>, _>>()
        .with_context(|| format!("Failed to parse labeled corpus {}", path.display()))?;

    info!(rows = rows.len(), path = %path.display(), "Loaded labeled corpus");
    Ok(rows)
}

/// An unlabeled document collection.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<String>,
    /// Number of distinct groups (parent directories) the documents came from.
    pub group_count: usize,
}

impl Corpus {
    pub fn from_documents(documents: Vec<String>) -> Self {
        Self {
            documents,
            group_count: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Read every file under `dir` as one document.
pub fn load_newsgroups(dir: &Path) -> Result<Corpus> {
    if !dir.is_dir() {
        anyhow::bail!(
            "Newsgroups corpus not found at {}\n\
             Unpack the 20 Newsgroups archive there or set QUILL_NEWSGROUPS_DIR.",
            dir.display()
        );
    }

    info!(path = %dir.display(), "Fetching 20 newsgroups data...");

    let mut documents = Vec::new();
    let mut groups = BTreeSet::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        documents.push(decode_latin1(&bytes));
        if let Some(parent) = entry.path().parent() {
            groups.insert(parent.to_path_buf());
        }
    }

    if documents.is_empty() {
        anyhow::bail!("Newsgroups corpus at {} contains no files", dir.display());
    }

    info!(
        documents = documents.len(),
        groups = groups.len(),
        "Number of unique groups in 20 Newsgroups dataset: {}",
        groups.len()
    );

    Ok(Corpus {
        documents,
        group_count: groups.len(),
    })
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_labeled_handles_quotes_and_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(
            &path,
            "review,sentiment\n\"Great, truly \"\"great\"\" film\",positive\nDull plot,negative\n",
        )
        .unwrap();

        let rows = load_labeled(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                LabeledExample::new("Great, truly \"great\" film", "positive"),
                LabeledExample::new("Dull plot", "negative"),
            ]
        );
    }

    #[test]
    fn test_load_labeled_missing_file_errors() {
        assert!(load_labeled(Path::new("/nonexistent/reviews.csv")).is_err());
    }

    #[test]
    fn test_load_newsgroups_sorted_and_counts_groups() {
        let dir = tempfile::tempdir().unwrap();
        for (group, file, body) in [
            ("sci.space", "2", "orbit"),
            ("sci.space", "1", "rocket"),
            ("rec.autos", "9", "engine"),
        ] {
            let group_dir = dir.path().join(group);
            std::fs::create_dir_all(&group_dir).unwrap();
            std::fs::write(group_dir.join(file), body).unwrap();
        }

        let corpus = load_newsgroups(dir.path()).unwrap();
        assert_eq!(corpus.documents, vec!["engine", "rocket", "orbit"]);
        assert_eq!(corpus.group_count, 2);
    }

    #[test]
    fn test_latin1_decoding() {
        assert_eq!(decode_latin1(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_missing_newsgroups_dir_errors() {
        assert!(load_newsgroups(Path::new("/nonexistent/20news")).is_err());
    }
}

// Artifact store: where each trained model lives on disk.
//
// Existence is a plain file check every time it is asked; nothing is cached.
// Writes go to a uniquely named sibling temp file first and are renamed into
// place, so a failed or interrupted fit never leaves a half-written artifact
// behind and a retrain replaces the old file wholesale.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

const CLASSIFIER_FILE: &str = "sentiment_classifier.json";
const EMBEDDINGS_FILE: &str = "doc2vec.json";
const TOPIC_MODEL_FILE: &str = "lda_model.json";
const TOPIC_DICTIONARY_FILE: &str = "lda_dictionary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// TF-IDF + Naive Bayes sentiment pipeline
    Classifier,
    /// Paragraph-vector embedding model
    Embeddings,
    /// LDA topic model together with its dictionary
    Topics,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Classifier,
        ArtifactKind::Embeddings,
        ArtifactKind::Topics,
    ];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Embeddings => "embeddings",
            ArtifactKind::Topics => "topics",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Primary file for an artifact kind.
    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        let file = match kind {
            ArtifactKind::Classifier => CLASSIFIER_FILE,
            ArtifactKind::Embeddings => EMBEDDINGS_FILE,
            ArtifactKind::Topics => TOPIC_MODEL_FILE,
        };
        self.base_dir.join(file)
    }

    /// The topic model cannot be used without the dictionary it was fit
    /// against, so it is persisted next to it.
    pub fn topic_dictionary_path(&self) -> PathBuf {
        self.base_dir.join(TOPIC_DICTIONARY_FILE)
    }

    /// Every file that must be present for `kind` to count as stored.
    pub fn files_of(&self, kind: ArtifactKind) -> Vec<PathBuf> {
        match kind {
            ArtifactKind::Topics => vec![self.path_of(kind), self.topic_dictionary_path()],
            _ => vec![self.path_of(kind)],
        }
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.files_of(kind).iter().all(|path| path.is_file())
    }
}

/// Serialize `value` as JSON to `path` via a temp file + rename.
///
/// Every call gets its own temp file, so concurrent writers to the same path
/// each rename a complete document and the last one wins.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    stage_json(path, value)?.persist_into_place()
}

/// Write two artifacts that are only valid together.
///
/// Both documents are fully written to temp files before either is renamed,
/// so a serialization or disk failure leaves the previous pair untouched.
/// `second` is renamed last; callers put the file that gates loading there.
pub fn write_json_pair<A: Serialize, B: Serialize>(
    first: (&Path, &A),
    second: (&Path, &B),
) -> Result<()> {
    let staged_first = stage_json(first.0, first.1)?;
    let staged_second = stage_json(second.0, second.1)?;
    staged_first.persist_into_place()?;
    staged_second.persist_into_place()
}

/// A fully written temp file waiting to be renamed over its target.
/// Dropping it without persisting removes the temp file.
struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    fn persist_into_place(self) -> Result<()> {
        let path = self.path;
        self.tmp
            .persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }
}

fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<StagedFile> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create artifact directory {}", parent.display()))?;

    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;
        writer.flush()?;
    }

    Ok(StagedFile {
        tmp,
        path: path.to_path_buf(),
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to load artifact {}", path.display()))
}

//! Keyword restoration from persisted work artifacts
//!
//! Rebuilds a readable digest of a work from `{storage_dir}/{work_base}.json`
//! alone. Only segment order and key terms are used; the source text is never
//! stored, so the result is a lossy summary and not the original wording.

use serde::Deserialize;
use serde_json::error::Category;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while restoring
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("No artifact for work '{work_base}' at {}", path.display())]
    NotFound { work_base: String, path: PathBuf },

    /// The artifact did not decode as JSON, most likely because a writer is
    /// still flushing it. Worth retrying.
    #[error("Artifact {} is incomplete: {source}", path.display())]
    Transient {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artifact {} has the wrong shape: {reason}", path.display())]
    Structural { path: PathBuf, reason: String },

    #[error("Invalid work base '{0}'")]
    InvalidWorkBase(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;

/// The part of the per-work artifact restoration reads
#[derive(Debug, Clone, Deserialize)]
pub struct WorkArtifact {
    pub segments: Vec<ArtifactSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSegment {
    pub order: i64,
    pub key_terms: Vec<String>,
}

impl WorkArtifact {
    /// Segments in ascending `order`; ties keep their array position.
    /// Empty segments are skipped entirely.
    pub fn digest(&self) -> String {
        let mut segments: Vec<&ArtifactSegment> = self.segments.iter().collect();
        segments.sort_by_key(|s| s.order);
        segments
            .into_iter()
            .filter(|s| !s.key_terms.is_empty())
            .map(|s| s.key_terms.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Seam between the orchestrator and a restorer.
pub trait Restore {
    fn restore(&self, work_base: &str) -> RestoreResult<String>;
}

/// Reads artifacts from a storage directory.
#[derive(Debug, Clone)]
pub struct Restorer {
    storage_dir: PathBuf,
}

impl Restorer {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// `{storage_dir}/{work_base}.json`
    pub fn artifact_path(&self, work_base: &str) -> PathBuf {
        artifact_path(&self.storage_dir, work_base)
    }

    /// Load and decode the artifact for `work_base`.
    pub fn load(&self, work_base: &str) -> RestoreResult<WorkArtifact> {
        if !is_plain_key(work_base) {
            return Err(RestoreError::InvalidWorkBase(work_base.to_string()));
        }
        let path = self.artifact_path(work_base);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RestoreError::NotFound {
                    work_base: work_base.to_string(),
                    path,
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|source| match source.classify() {
            Category::Syntax | Category::Eof => RestoreError::Transient { path, source },
            Category::Data => RestoreError::Structural {
                path,
                reason: source.to_string(),
            },
            Category::Io => RestoreError::Io(source.into()),
        })
    }
}

impl Restore for Restorer {
    fn restore(&self, work_base: &str) -> RestoreResult<String> {
        let artifact = self.load(work_base)?;
        let text = artifact.digest();
        tracing::debug!(work_base, segments = artifact.segments.len(), "restored digest");
        Ok(text)
    }
}

/// Convenience form of [`Restorer::restore`].
pub fn restore(work_base: &str, storage_dir: impl Into<PathBuf>) -> RestoreResult<String> {
    Restorer::new(storage_dir).restore(work_base)
}

/// Artifact location convention shared with the ingestor.
pub fn artifact_path(storage_dir: &Path, work_base: &str) -> PathBuf {
    storage_dir.join(format!("{}.json", work_base))
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

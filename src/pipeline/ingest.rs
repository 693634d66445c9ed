//! Ingestion step of the pipeline
//!
//! The analyzer itself lives outside this crate. `RecordIngestor` picks up
//! where it leaves off: it takes an analyzed record from disk, writes the
//! upsert script, and publishes the per-work artifact the restorer reads.

use crate::persist;
use crate::record::{AnalyzedRecord, RecordError};
use crate::restore::artifact_path;
use crate::script::{GraphSerializer, ScriptError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from an ingestion collaborator
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Ingestion failed: {0}")]
    Failed(String),
}

/// What an ingestion run hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// Work-level identifier of the ingested document
    pub work_id: String,
    /// Where the upsert script was written
    pub script_path: PathBuf,
}

/// One ingestion of a source document.
pub trait Ingestor {
    fn ingest(&self, source: &Path) -> Result<Ingested, IngestError>;
}

/// Restorable projection of a record.
#[derive(Debug, Serialize)]
struct ArtifactOut<'a> {
    #[serde(rename = "workId")]
    work_id: &'a str,
    title: &'a str,
    segments: Vec<ArtifactSegmentOut<'a>>,
}

#[derive(Debug, Serialize)]
struct ArtifactSegmentOut<'a> {
    #[serde(rename = "segmentId")]
    segment_id: &'a str,
    order: i64,
    key_terms: &'a [String],
}

/// Ingests analyzed-record JSON files.
#[derive(Debug, Clone)]
pub struct RecordIngestor {
    serializer: GraphSerializer,
    output_dir: PathBuf,
    data_dir: PathBuf,
}

impl RecordIngestor {
    pub fn new(
        serializer: GraphSerializer,
        output_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            serializer,
            output_dir: output_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Script location for a work base.
    pub fn script_path(&self, work_base: &str) -> PathBuf {
        self.output_dir.join(format!("{}.cypher", work_base))
    }

    /// Write script and artifact for an already decoded record.
    pub fn ingest_record(&self, record: &AnalyzedRecord) -> Result<Ingested, IngestError> {
        let work_base = record.work_base();
        let script_path = self.script_path(work_base);
        self.serializer.write_script(record, &script_path)?;

        let artifact = ArtifactOut {
            work_id: &record.work.base_id,
            title: &record.work.title,
            segments: record
                .segments
                .iter()
                .map(|s| ArtifactSegmentOut {
                    segment_id: &s.segment_id,
                    order: s.order,
                    key_terms: &s.key_terms,
                })
                .collect(),
        };
        let path = artifact_path(&self.data_dir, work_base);
        persist::write_atomic(&path, &serde_json::to_vec_pretty(&artifact)?)?;
        tracing::info!(work = %record.work.base_id, artifact = %path.display(), "published work artifact");

        Ok(Ingested {
            work_id: record.work.base_id.clone(),
            script_path,
        })
    }
}

impl Ingestor for RecordIngestor {
    fn ingest(&self, source: &Path) -> Result<Ingested, IngestError> {
        let record = AnalyzedRecord::load(source)?;
        self.ingest_record(&record)
    }
}

//! Graphscribe: graph-ready keys and scripts for analyzed documents
//!
//! Takes the output of a document analyzer and gets it into a property graph,
//! then back out again as a keyword digest.
//!
//! # Core Concepts
//!
//! - **Identifiers**: `{BASE}_{YYYYMMDD}_{millis}[_{token}]*` keys whose
//!   structure encodes lineage and hierarchy depth
//! - **Upsert scripts**: parameterized, idempotent MERGE scripts for a whole
//!   analyzed record, with edition-filtered schema constraints
//! - **Restoration**: a per-work digest rebuilt from segment key terms only
//! - **Pipeline**: ingest, then restore with a bounded retry for artifacts
//!   that are still being written
//!
//! # Example
//!
//! ```
//! use graphscribe::id::{BaseMode, IdGenerator, IdLevel};
//!
//! let mut ids = IdGenerator::new(BaseMode::Semantic);
//! let work = ids.new_work_id("Kokoro", "corpus/kokoro.txt").unwrap();
//! let entity = ids.new_child_id(&work, IdLevel::Entity, None).unwrap();
//! assert!(graphscribe::id::same_lineage(work.as_str(), entity.as_str()));
//! ```

pub mod config;
pub mod id;
mod persist;
pub mod pipeline;
pub mod record;
pub mod restore;
pub mod script;

pub use config::{ConfigError, PipelineConfig};
pub use id::{BaseMode, IdError, IdGenerator, IdLevel, IdResult, Identifier};
pub use pipeline::{
    Ingested, IngestError, Ingestor, Outcome, Pipeline, PipelineError, RecordIngestor, RetryPolicy,
};
pub use record::{AnalyzedRecord, RecordError, StructuralError};
pub use restore::{Restore, RestoreError, RestoreResult, Restorer};
pub use script::{GraphSerializer, ScriptError, ScriptResult, StoreEdition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Upsert script generation
//!
//! Turns an `AnalyzedRecord` into a parameterized script for a property-graph
//! store. The script is idempotent: every node and relationship is written
//! with MERGE on its key followed by SET of its mutable fields, so applying it
//! twice leaves the same graph as applying it once.
//!
//! Layout (fixed order):
//! 1. `:begin`, one `:param` line per top-level field, `:commit`
//! 2. constraints (unsupported ones replaced by a one-line comment)
//! 3. Work, classification edges, Segments, Sentences,
//!    Segment→Sentence edges, Entities, Mentions

mod constraint;
mod literal;

pub use constraint::{
    default_constraints, Constraint, ConstraintError, ConstraintKind, StoreEdition,
    DEFAULT_CONSTRAINTS,
};
pub use literal::Literal;

use crate::persist;
use crate::record::{AnalyzedRecord, StructuralError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while producing a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for script operations
pub type ScriptResult<T> = Result<T, ScriptError>;

pub const BEGIN_MARKER: &str = ":begin";
pub const COMMIT_MARKER: &str = ":commit";

const WORK_UPSERT: &str = "\
MERGE (w:Work {baseId: $work.baseId})
SET w.title = $work.title, w.sourceType = $work.sourceType, w.ingestedAt = $work.ingestedAt,
    w.fingerprint = $work.fingerprint, w.language = $work.language, w.lengthHint = $work.lengthHint;";

const SEGMENT_UPSERT: &str = "\
MATCH (w:Work {baseId: $work.baseId})
UNWIND $segments AS seg
MERGE (s:Segment {segmentId: seg.segmentId})
SET s.order = seg.order, s.timecodeMs = seg.timecode_ms, s.keyTerms = seg.key_terms,
    s.lengthHint = seg.length_hint
MERGE (w)-[r:HAS_SEGMENT]->(s)
SET r.order = seg.order;";

const SENTENCE_UPSERT: &str = "\
UNWIND $sentences AS sen
MERGE (n:Sentence {sentenceId: sen.sentenceId})
SET n.order = sen.order, n.aesthetic = sen.aesthetic, n.vectorDim = sen.vectorDim,
    n.embeddingRef = sen.embeddingRef
SET n += sen.onto;";

const SEGMENT_SENTENCE_EDGES: &str = "\
UNWIND $segments AS seg
MATCH (s:Segment {segmentId: seg.segmentId})
UNWIND range(0, size(seg.sentenceIds) - 1) AS i
MATCH (n:Sentence {sentenceId: seg.sentenceIds[i]})
MERGE (s)-[r:HAS_SENTENCE]->(n)
SET r.index = i;";

const ENTITY_UPSERT: &str = "\
UNWIND $entities AS ent
MERGE (e:Entity {entityId: ent.entityId})
SET e.label = ent.label, e.type = ent.type, e.labelEmbeddingRef = ent.labelEmbeddingRef,
    e.contextEmbeddingRef = ent.contextEmbeddingRef
SET e += ent.onto;";

const MENTION_UPSERT: &str = "\
UNWIND $mentions AS m
MATCH (n:Sentence {sentenceId: m.sentenceId})
MATCH (e:Entity {entityId: m.entityId})
MERGE (n)-[r:MENTIONS {tag: m.tag, ontoKey: coalesce(m.ontoKey, '')}]->(e)
SET r.weight = m.weight;";

fn classification_upsert(scheme: &str) -> String {
    let scheme_literal = Literal::from(scheme).encode();
    format!(
        "MATCH (w:Work {{baseId: $work.baseId}})
UNWIND $work.{scheme} AS tag
MERGE (t:TagCatalog {{scheme: {lit}, code: tag.code}})
SET t.label = coalesce(tag.label, t.label)
MERGE (w)-[r:CLASSIFIED_AS]->(t)
SET r.scheme = {lit}, r.score = tag.score;",
        scheme = scheme,
        lit = scheme_literal
    )
}

/// Renders analyzed records as upsert scripts.
#[derive(Debug, Clone)]
pub struct GraphSerializer {
    edition: StoreEdition,
    constraints: Vec<Constraint>,
}

impl Default for GraphSerializer {
    fn default() -> Self {
        Self::new(StoreEdition::default())
    }
}

impl GraphSerializer {
    /// Serializer carrying the built-in constraint set.
    pub fn new(edition: StoreEdition) -> Self {
        Self {
            edition,
            constraints: default_constraints(),
        }
    }

    /// Append extra constraint declarations; each must parse.
    pub fn with_constraints<S: AsRef<str>>(mut self, declarations: &[S]) -> ScriptResult<Self> {
        for decl in declarations {
            self.constraints.push(Constraint::parse(decl.as_ref())?);
        }
        Ok(self)
    }

    pub fn edition(&self) -> StoreEdition {
        self.edition
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Top-level parameters in declaration order.
    pub fn parameters(&self, record: &AnalyzedRecord) -> ScriptResult<Vec<(&'static str, Literal)>> {
        Ok(vec![
            ("work", Literal::from_serialize(&record.work)?),
            ("segments", Literal::from_serialize(&record.segments)?),
            ("sentences", Literal::from_serialize(&record.sentences)?),
            ("entities", Literal::from_serialize(&record.entities)?),
            ("mentions", Literal::from_serialize(&record.mentions)?),
        ])
    }

    /// Constraint lines after edition filtering, one line per declaration.
    pub fn constraint_lines(&self) -> Vec<String> {
        self.constraints
            .iter()
            .map(|c| {
                if self.edition.supports(c.kind) {
                    c.render()
                } else {
                    c.skipped_marker(self.edition)
                }
            })
            .collect()
    }

    /// Render the full script. Validation runs before any text is produced.
    pub fn serialize(&self, record: &AnalyzedRecord) -> ScriptResult<String> {
        record.validate()?;
        let params = self.parameters(record)?;

        let mut out = String::new();
        out.push_str(BEGIN_MARKER);
        out.push('\n');
        for (name, value) in &params {
            out.push_str(&format!(":param {} => {};\n", name, value.encode()));
        }
        out.push_str(COMMIT_MARKER);
        out.push('\n');

        out.push('\n');
        for line in self.constraint_lines() {
            out.push_str(&line);
            out.push('\n');
        }

        let mut statements = vec![WORK_UPSERT.to_string()];
        for (scheme, _) in record.work.classifications() {
            statements.push(classification_upsert(scheme));
        }
        statements.push(SEGMENT_UPSERT.to_string());
        statements.push(SENTENCE_UPSERT.to_string());
        statements.push(SEGMENT_SENTENCE_EDGES.to_string());
        statements.push(ENTITY_UPSERT.to_string());
        statements.push(MENTION_UPSERT.to_string());

        for statement in statements {
            out.push('\n');
            out.push_str(&statement);
            out.push('\n');
        }

        tracing::debug!(
            work = %record.work.base_id,
            segments = record.segments.len(),
            sentences = record.sentences.len(),
            entities = record.entities.len(),
            mentions = record.mentions.len(),
            "serialized upsert script"
        );
        Ok(out)
    }

    /// Decode a raw JSON record and render it.
    pub fn serialize_value(&self, value: Value) -> ScriptResult<String> {
        let record = AnalyzedRecord::from_value(value)?;
        self.serialize(&record)
    }

    /// Render, then write the script atomically. Nothing is written on failure.
    pub fn write_script(&self, record: &AnalyzedRecord, path: impl AsRef<Path>) -> ScriptResult<PathBuf> {
        let script = self.serialize(record)?;
        let path = path.as_ref();
        persist::write_atomic(path, script.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote upsert script");
        Ok(path.to_path_buf())
    }
}

//! Analyzed-document record
//!
//! The analyzer hands over one Work with its Segments, Sentences, Entities
//! and Mentions. Score payloads (`onto`, `aesthetic`, embeddings) pass through
//! untouched; only keys and references are checked here.

use crate::id::{self, IdError, IdLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Top-level fields every record must carry.
pub const REQUIRED_FIELDS: [&str; 5] = ["work", "segments", "sentences", "entities", "mentions"];

/// Sentence node properties that `onto` entries may not overwrite.
pub const SENTENCE_PROPERTIES: [&str; 5] = ["sentenceId", "order", "aesthetic", "vectorDim", "embeddingRef"];

/// Entity node properties that `onto` entries may not overwrite.
pub const ENTITY_PROPERTIES: [&str; 5] = [
    "entityId",
    "label",
    "type",
    "labelEmbeddingRef",
    "contextEmbeddingRef",
];

/// A record whose shape or keys are unusable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid record: {0}")]
    InvalidField(String),

    #[error("Bad identifier in {field}: {source}")]
    Identifier {
        field: String,
        #[source]
        source: IdError,
    },

    #[error("{id} does not belong to work {work}")]
    ForeignLineage { id: String, work: String },

    #[error("{from} references unknown {to}")]
    DanglingReference { from: String, to: String },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("{id}: onto key '{key}' collides with a node property")]
    ReservedProperty { id: String, key: String },
}

/// Errors loading a record from disk
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// One classification tag (`ndc`, `kindle`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub code: String,
    /// Kept as decoded so the script reproduces the analyzer's digits
    #[serde(default = "zero")]
    pub score: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Root unit: one ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub base_id: String,
    pub title: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub ingested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub length_hint: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ndc: Vec<Classification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kindle: Vec<Classification>,
}

impl WorkRecord {
    /// Classification lists present on the work, by scheme name.
    pub fn classifications(&self) -> Vec<(&'static str, &[Classification])> {
        [("ndc", self.ndc.as_slice()), ("kindle", self.kindle.as_slice())]
            .into_iter()
            .filter(|(_, tags)| !tags.is_empty())
            .collect()
    }
}

/// Ordered subdivision of a work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub segment_id: String,
    pub order: i64,
    #[serde(rename = "timecode_ms", default)]
    pub timecode_ms: Option<i64>,
    #[serde(rename = "key_terms", default)]
    pub key_terms: Vec<String>,
    #[serde(rename = "length_hint", default)]
    pub length_hint: Option<u64>,
    #[serde(default)]
    pub sentence_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    pub sentence_id: String,
    pub order: i64,
    #[serde(default)]
    pub aesthetic: Option<Number>,
    #[serde(default)]
    pub vector_dim: Option<u32>,
    #[serde(default)]
    pub embedding_ref: Option<String>,
    /// Named ontology scores (temporal, spatial, emotion, ...)
    #[serde(default)]
    pub onto: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub entity_id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub label_embedding_ref: Option<String>,
    #[serde(default)]
    pub context_embedding_ref: Option<String>,
    #[serde(default)]
    pub onto: BTreeMap<String, Value>,
}

/// Sentence → Entity link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionRecord {
    pub sentence_id: String,
    pub entity_id: String,
    pub tag: String,
    #[serde(default)]
    pub onto_key: Option<String>,
    #[serde(default = "zero")]
    pub weight: Number,
}

fn zero() -> Number {
    Number::from(0u8)
}

/// Everything the serializer needs for one work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedRecord {
    pub work: WorkRecord,
    pub segments: Vec<SegmentRecord>,
    pub sentences: Vec<SentenceRecord>,
    pub entities: Vec<EntityRecord>,
    pub mentions: Vec<MentionRecord>,
}

impl AnalyzedRecord {
    /// Decode from JSON, reporting absent top-level fields by name.
    pub fn from_value(value: Value) -> Result<Self, StructuralError> {
        let object = value
            .as_object()
            .ok_or_else(|| StructuralError::InvalidField("record must be a JSON object".into()))?;
        for field in REQUIRED_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => {
                    return Err(StructuralError::MissingField(field.to_string()))
                }
                Some(_) => {}
            }
        }
        let record: AnalyzedRecord = serde_json::from_value(value)
            .map_err(|e| StructuralError::InvalidField(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(value)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// The work's lineage base token.
    pub fn work_base(&self) -> &str {
        id::work_base(&self.work.base_id)
    }

    /// Check keys, lineage membership and references.
    pub fn validate(&self) -> Result<(), StructuralError> {
        let work = &self.work.base_id;
        check_key("work.baseId", work, IdLevel::Work)?;

        self.unique_keys(
            self.segments.iter().map(|s| s.segment_id.as_str()),
            "segments.segmentId",
            IdLevel::Segment,
        )?;
        let sentence_ids = self.unique_keys(
            self.sentences.iter().map(|s| s.sentence_id.as_str()),
            "sentences.sentenceId",
            IdLevel::Sentence,
        )?;
        let entity_ids = self.unique_keys(
            self.entities.iter().map(|e| e.entity_id.as_str()),
            "entities.entityId",
            IdLevel::Entity,
        )?;

        for segment in &self.segments {
            for sentence in &segment.sentence_ids {
                if !sentence_ids.contains(sentence.as_str()) {
                    return Err(StructuralError::DanglingReference {
                        from: segment.segment_id.clone(),
                        to: sentence.clone(),
                    });
                }
            }
        }
        for sentence in &self.sentences {
            check_onto(&sentence.sentence_id, &sentence.onto, &SENTENCE_PROPERTIES)?;
        }
        for entity in &self.entities {
            check_onto(&entity.entity_id, &entity.onto, &ENTITY_PROPERTIES)?;
        }

        let mut mention_keys = HashSet::new();
        for mention in &self.mentions {
            if !sentence_ids.contains(mention.sentence_id.as_str()) {
                return Err(StructuralError::DanglingReference {
                    from: format!("mention '{}'", mention.tag),
                    to: mention.sentence_id.clone(),
                });
            }
            if !entity_ids.contains(mention.entity_id.as_str()) {
                return Err(StructuralError::DanglingReference {
                    from: format!("mention '{}'", mention.tag),
                    to: mention.entity_id.clone(),
                });
            }
            let key = (
                mention.sentence_id.as_str(),
                mention.entity_id.as_str(),
                mention.tag.as_str(),
                mention.onto_key.as_deref().unwrap_or_default(),
            );
            if !mention_keys.insert(key) {
                return Err(StructuralError::DuplicateKey(format!(
                    "mention '{}' {} -> {} ({})",
                    key.2, key.0, key.1, key.3
                )));
            }
        }
        Ok(())
    }

    fn unique_keys<'a>(
        &self,
        keys: impl Iterator<Item = &'a str>,
        field: &str,
        level: IdLevel,
    ) -> Result<HashSet<&'a str>, StructuralError> {
        let mut seen = HashSet::new();
        for key in keys {
            check_key(field, key, level)?;
            if !id::same_lineage(key, &self.work.base_id) {
                return Err(StructuralError::ForeignLineage {
                    id: key.to_string(),
                    work: self.work.base_id.clone(),
                });
            }
            if !seen.insert(key) {
                return Err(StructuralError::DuplicateKey(key.to_string()));
            }
        }
        Ok(seen)
    }
}

fn check_onto(id: &str, onto: &BTreeMap<String, Value>, reserved: &[&str]) -> Result<(), StructuralError> {
    match onto.keys().find(|k| reserved.contains(&k.as_str())) {
        Some(key) => Err(StructuralError::ReservedProperty {
            id: id.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn check_key(field: &str, key: &str, level: IdLevel) -> Result<(), StructuralError> {
    id::expect_level(key, level)
        .map(|_| ())
        .map_err(|source| StructuralError::Identifier {
            field: field.to_string(),
            source,
        })
}

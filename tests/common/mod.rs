//! Shared helpers for graphscribe integration tests
//!
//! Records here are minted with a real `IdGenerator`, so every key they carry
//! went through the same code path an analyzer would use.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use graphscribe::id::{BaseMode, FixedClock, IdGenerator, IdLevel, Identifier};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Identifier shape: base, date, millis, then level tokens.
pub const ID_PATTERN: &str = r"^[A-Z0-9]{8}_[0-9]{8}_[0-9]+(_(S[0-9]{4}|N[0-9]{4}|E[0-9]{5}|T[0-9]{3}))*$";

/// Generator pinned to 2026-01-05 so dates never straddle midnight.
pub fn generator() -> IdGenerator {
    let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
    IdGenerator::seeded(BaseMode::Semantic, 11).with_clock(FixedClock(at))
}

/// Minted keys for a record with `segments` segments of `sentences` each.
pub struct MintedWork {
    pub work: Identifier,
    pub segments: Vec<(Identifier, Vec<Identifier>)>,
    pub entity: Identifier,
}

pub fn mint_work(ids: &mut IdGenerator, title: &str, segments: usize, sentences: usize) -> MintedWork {
    let work = ids.new_work_id(title, &format!("corpus/{}.txt", title)).unwrap();
    let segments = (0..segments)
        .map(|_| {
            let seg = ids.new_child_id(&work, IdLevel::Segment, None).unwrap();
            let sens = (0..sentences)
                .map(|_| ids.new_child_id(&seg, IdLevel::Sentence, None).unwrap())
                .collect();
            (seg, sens)
        })
        .collect();
    let entity = ids.new_child_id(&work, IdLevel::Entity, None).unwrap();
    MintedWork {
        work,
        segments,
        entity,
    }
}

/// Analyzed-record JSON for `minted`. Segment `i` gets key terms
/// `terms[i]` and is stored in reverse order to exercise sorting.
pub fn record_json(minted: &MintedWork, title: &str, terms: &[&[&str]]) -> Value {
    let mut segments = Vec::new();
    let mut sentences = Vec::new();
    for (i, (seg, sens)) in minted.segments.iter().enumerate() {
        let key_terms: Vec<&str> = terms.get(i).copied().unwrap_or_default().to_vec();
        segments.push(json!({
            "segmentId": seg.as_str(),
            "order": i as i64 + 1,
            "key_terms": key_terms,
            "sentenceIds": sens.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        }));
        for (j, sen) in sens.iter().enumerate() {
            sentences.push(json!({
                "sentenceId": sen.as_str(),
                "order": j as i64 + 1,
                "aesthetic": 0.5,
                "onto": {"temporal": 0.1 * (j as f64 + 1.0)},
            }));
        }
    }
    segments.reverse();

    let first_sentence = minted
        .segments
        .first()
        .and_then(|(_, sens)| sens.first())
        .map(|s| s.as_str().to_string());
    let mentions = match first_sentence {
        Some(sen) => json!([{
            "sentenceId": sen,
            "entityId": minted.entity.as_str(),
            "tag": "PER",
            "weight": 1.0,
        }]),
        None => json!([]),
    };

    json!({
        "work": {
            "baseId": minted.work.as_str(),
            "title": title,
            "sourceType": "novel",
            "ndc": [{"code": "913.6", "score": 0.8}],
        },
        "segments": segments,
        "sentences": sentences,
        "entities": [{
            "entityId": minted.entity.as_str(),
            "label": "Sensei",
            "type": "person",
        }],
        "mentions": mentions,
    })
}

pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

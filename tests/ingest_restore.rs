//! Ingest → restore against real files

mod common;

use common::{generator, mint_work, record_json, write_json};
use graphscribe::pipeline::RetryPolicy;
use graphscribe::restore::{self, RestoreResult};
use graphscribe::{PipelineConfig, PipelineError, Restore, RestoreError, Restorer};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: root.join("data"),
        output_dir: root.join("scripts"),
        retry: graphscribe::config::RetrySettings {
            max_attempts: 3,
            delay_ms: 0,
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn record_round_trips_to_keyword_digest() {
    let dir = tempfile::tempdir().unwrap();
    let mut ids = generator();
    let minted = mint_work(&mut ids, "Kokoro", 3, 2);
    let value = record_json(
        &minted,
        "Kokoro",
        &[&["sensei", "kamakura"], &[], &["letter", "parents"]],
    );
    let source = write_json(dir.path(), "kokoro.json", &value);
    let destination = dir.path().join("restored").join("kokoro.txt");

    let outcome = config(dir.path())
        .pipeline()
        .unwrap()
        .run(&source, &destination)
        .unwrap();

    assert_eq!(outcome.work_id, minted.work.as_str());
    assert_eq!(outcome.work_base, minted.work.work_base());
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.script_path.starts_with(dir.path().join("scripts")));
    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        "sensei kamakura\nletter parents"
    );
    assert_eq!(
        restore::restore(&outcome.work_base, dir.path().join("data")).unwrap(),
        outcome.text
    );
}

#[test]
fn reingesting_rewrites_same_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut ids = generator();
    let minted = mint_work(&mut ids, "Kokoro", 1, 1);
    let source = write_json(
        dir.path(),
        "kokoro.json",
        &record_json(&minted, "Kokoro", &[&["sensei"]]),
    );
    let pipeline = config(dir.path()).pipeline().unwrap();

    let first = pipeline.run(&source, &dir.path().join("a.txt")).unwrap();
    let script = std::fs::read_to_string(&first.script_path).unwrap();
    let second = pipeline.run(&source, &dir.path().join("b.txt")).unwrap();

    assert_eq!(first.script_path, second.script_path);
    assert_eq!(std::fs::read_to_string(&second.script_path).unwrap(), script);
    assert_eq!(first.text, second.text);
}

#[test]
fn unknown_work_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = Restorer::new(dir.path()).restore("NOSUCHWK").unwrap_err();
    assert!(matches!(err, RestoreError::NotFound { .. }));
}

/// Sees a half-written artifact on the first read; the writer finishes
/// right after.
struct RacingWriter {
    inner: Restorer,
    artifact: PathBuf,
    complete: String,
    reads: Cell<u32>,
}

impl Restore for RacingWriter {
    fn restore(&self, work_base: &str) -> RestoreResult<String> {
        self.reads.set(self.reads.get() + 1);
        let result = self.inner.restore(work_base);
        if self.reads.get() == 1 {
            std::fs::write(&self.artifact, &self.complete).unwrap();
        }
        result
    }
}

#[test]
fn half_written_artifact_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let complete = r#"{"segments": [{"order": 2, "key_terms": ["b", "c"]}, {"order": 1, "key_terms": ["a"]}]}"#;
    let artifact = restore::artifact_path(dir.path(), "RACEWORK");
    std::fs::write(&artifact, &complete[..complete.len() / 2]).unwrap();

    let racing = RacingWriter {
        inner: Restorer::new(dir.path()),
        artifact,
        complete: complete.to_string(),
        reads: Cell::new(0),
    };
    let pipeline = graphscribe::Pipeline::new(NoopIngestor, racing)
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

    let (text, attempts) = pipeline.restore_with_retry("RACEWORK").unwrap();
    assert_eq!(text, "a\nb c");
    assert_eq!(attempts, 2);
}

#[test]
fn artifact_never_completing_exhausts_budget() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(restore::artifact_path(dir.path(), "STUCKWRK"), "{\"segments\": [").unwrap();

    let pipeline = graphscribe::Pipeline::new(NoopIngestor, Restorer::new(dir.path()))
        .with_retry(RetryPolicy::new(3, Duration::ZERO));
    match pipeline.restore_with_retry("STUCKWRK") {
        Err(PipelineError::Restore { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(source.is_transient());
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

struct NoopIngestor;

impl graphscribe::Ingestor for NoopIngestor {
    fn ingest(&self, _source: &Path) -> Result<graphscribe::Ingested, graphscribe::IngestError> {
        Err(graphscribe::IngestError::Failed("not used".into()))
    }
}

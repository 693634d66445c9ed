//! Ingest → restore orchestration
//!
//! Runs one ingestion, derives the work base from the returned work ID, then
//! restores the work's digest and writes it out:
//!
//! ```text
//! Ingesting ──► Restoring ──► Done
//!                 ▲     │
//!                 └─────┘ transient decode failure (bounded, fixed delay)
//! ```
//!
//! The artifact the restorer reads may still be mid-write by another process.
//! That shows up as a transient decode failure and is retried; every other
//! failure stops the run immediately.

mod ingest;

pub use ingest::{IngestError, Ingested, Ingestor, RecordIngestor};

use crate::id;
use crate::persist;
use crate::restore::{Restore, RestoreError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default number of restore attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between restore attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Ingestion returned an empty work identifier")]
    EmptyWorkId,

    /// Carries the last restore error as-is, transient or not.
    #[error("Restoration failed after {attempts} attempt(s): {source}")]
    Restore {
        attempts: u32,
        #[source]
        source: RestoreError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// The underlying restore error, if restoration is what failed.
    pub fn restore_error(&self) -> Option<&RestoreError> {
        match self {
            Self::Restore { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingesting,
    Restoring,
    Done,
}

/// Fixed-delay retry budget for the restoring stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub work_id: String,
    pub work_base: String,
    pub script_path: PathBuf,
    pub destination: PathBuf,
    /// Restore attempts used, including the successful one
    pub attempts: u32,
    pub text: String,
}

/// Chains an ingestor and a restorer.
pub struct Pipeline<I, R> {
    ingestor: I,
    restorer: R,
    retry: RetryPolicy,
}

impl<I: Ingestor, R: Restore> Pipeline<I, R> {
    pub fn new(ingestor: I, restorer: R) -> Self {
        Self {
            ingestor,
            restorer,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Ingest `source`, restore its digest, and write it to `destination`.
    pub fn run(&self, source: &Path, destination: &Path) -> Result<Outcome, PipelineError> {
        let mut stage = Stage::Ingesting;
        tracing::info!(?stage, source = %source.display(), "pipeline started");
        let ingested = self.ingestor.ingest(source)?;

        let work_base = id::work_base(&ingested.work_id).to_string();
        if work_base.is_empty() {
            return Err(PipelineError::EmptyWorkId);
        }

        stage = Stage::Restoring;
        tracing::info!(?stage, work_id = %ingested.work_id, %work_base, "ingested");
        let (text, attempts) = self.restore_with_retry(&work_base)?;

        persist::write_atomic(destination, text.as_bytes())?;
        stage = Stage::Done;
        tracing::info!(?stage, attempts, destination = %destination.display(), "restored text written");

        Ok(Outcome {
            work_id: ingested.work_id,
            work_base,
            script_path: ingested.script_path,
            destination: destination.to_path_buf(),
            attempts,
            text,
        })
    }

    /// Restore with the retry budget. Returns the text and the attempts used.
    ///
    /// Only transient errors are retried. When the budget runs out the last
    /// transient error is returned unchanged inside `PipelineError::Restore`.
    pub fn restore_with_retry(&self, work_base: &str) -> Result<(String, u32), PipelineError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.restorer.restore(work_base) {
                Ok(text) => return Ok((text, attempt)),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        work_base,
                        attempt,
                        max_attempts,
                        error = %e,
                        "artifact not ready, retrying"
                    );
                    if !self.retry.delay.is_zero() {
                        std::thread::sleep(self.retry.delay);
                    }
                }
                Err(source) => {
                    return Err(PipelineError::Restore {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restore::RestoreResult;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct FixedIngestor {
        work_id: String,
    }

    impl Ingestor for FixedIngestor {
        fn ingest(&self, _source: &Path) -> Result<Ingested, IngestError> {
            Ok(Ingested {
                work_id: self.work_id.clone(),
                script_path: PathBuf::from("out/script.cypher"),
            })
        }
    }

    struct FailingIngestor;

    impl Ingestor for FailingIngestor {
        fn ingest(&self, _source: &Path) -> Result<Ingested, IngestError> {
            Err(IngestError::Failed("analyzer offline".into()))
        }
    }

    type Step = fn() -> RestoreResult<String>;

    /// Replays queued results; the last one repeats once the queue drains.
    struct ScriptedRestorer {
        results: RefCell<VecDeque<Step>>,
        calls: Cell<u32>,
        seen: RefCell<Vec<String>>,
    }

    impl ScriptedRestorer {
        fn new(results: &[Step]) -> Self {
            Self {
                results: RefCell::new(results.iter().copied().collect()),
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Restore for ScriptedRestorer {
        fn restore(&self, work_base: &str) -> RestoreResult<String> {
            self.calls.set(self.calls.get() + 1);
            self.seen.borrow_mut().push(work_base.to_string());
            let mut results = self.results.borrow_mut();
            let next = if results.len() > 1 {
                results.pop_front()
            } else {
                results.front().copied()
            };
            next.expect("scripted restorer needs at least one result")()
        }
    }

    fn transient() -> RestoreResult<String> {
        Err(RestoreError::Transient {
            path: PathBuf::from("data/W.json"),
            source: serde_json::from_str::<serde_json::Value>("{\"segments\": [").unwrap_err(),
        })
    }

    fn not_found() -> RestoreResult<String> {
        Err(RestoreError::NotFound {
            work_base: "W".into(),
            path: PathBuf::from("data/W.json"),
        })
    }

    fn digest() -> RestoreResult<String> {
        Ok("a\nb c".to_string())
    }

    fn pipeline(restorer: ScriptedRestorer) -> Pipeline<FixedIngestor, ScriptedRestorer> {
        Pipeline::new(
            FixedIngestor {
                work_id: "K7Q2M9XA_20260105_1767571200000".into(),
            },
            restorer,
        )
        .with_retry(RetryPolicy::new(3, Duration::ZERO))
    }

    #[test]
    fn succeeds_on_third_attempt() {
        let p = pipeline(ScriptedRestorer::new(&[transient, transient, digest]));
        let (text, attempts) = p.restore_with_retry("K7Q2M9XA").unwrap();
        assert_eq!(text, "a\nb c");
        assert_eq!(attempts, 3);
        assert_eq!(p.restorer.calls.get(), 3);
    }

    #[test]
    fn exhaustion_surfaces_last_transient_error() {
        let p = pipeline(ScriptedRestorer::new(&[transient]));
        let err = p.restore_with_retry("K7Q2M9XA").unwrap_err();
        assert_eq!(p.restorer.calls.get(), 3);
        match err {
            PipelineError::Restore { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.is_transient());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_transient_error_is_not_retried() {
        let p = pipeline(ScriptedRestorer::new(&[not_found, digest]));
        let err = p.restore_with_retry("K7Q2M9XA").unwrap_err();
        assert_eq!(p.restorer.calls.get(), 1);
        assert!(matches!(
            err.restore_error(),
            Some(RestoreError::NotFound { .. })
        ));
    }

    #[test]
    fn run_derives_work_base_and_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("restored").join("kokoro.txt");
        let p = pipeline(ScriptedRestorer::new(&[transient, digest]));

        let outcome = p.run(Path::new("ignored.json"), &destination).unwrap();
        assert_eq!(outcome.work_base, "K7Q2M9XA");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(p.restorer.seen.borrow().as_slice(), ["K7Q2M9XA", "K7Q2M9XA"]);
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "a\nb c");
    }

    #[test]
    fn ingestion_failure_skips_restoration() {
        let restorer = ScriptedRestorer::new(&[digest]);
        let p = Pipeline::new(FailingIngestor, restorer);
        let dir = tempfile::tempdir().unwrap();
        let err = p.run(Path::new("x"), &dir.path().join("out.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::Failed(_))));
        assert_eq!(p.restorer.calls.get(), 0);
    }

    #[test]
    fn empty_work_id_rejected() {
        let p = Pipeline::new(
            FixedIngestor {
                work_id: String::new(),
            },
            ScriptedRestorer::new(&[digest]),
        );
        let dir = tempfile::tempdir().unwrap();
        let err = p.run(Path::new("x"), &dir.path().join("out.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyWorkId));
    }

    #[test]
    fn default_policy_is_three_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}

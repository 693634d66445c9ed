//! Pipeline configuration
//!
//! Loaded from a YAML file. Every field is optional; anything left out falls
//! back to the defaults below, rooted at `{data_dir}/graphscribe`.
//!
//! ```yaml
//! data_dir: /var/lib/graphscribe/data
//! output_dir: /var/lib/graphscribe/scripts
//! edition: enterprise
//! extra_constraints:
//!   - "CREATE CONSTRAINT FOR (s:Segment) REQUIRE s.segmentId IS UNIQUE"
//! retry:
//!   max_attempts: 5
//!   delay_ms: 100
//! ids:
//!   mode: random
//!   seed: 42
//! ```

use crate::id::{BaseMode, IdGenerator};
use crate::pipeline::{Pipeline, RecordIngestor, RetryPolicy};
use crate::restore::Restorer;
use crate::script::{GraphSerializer, ScriptResult, StoreEdition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors reading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    pub mode: BaseMode,
    /// Fixes the random source for reproducible base tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl IdSettings {
    pub fn generator(&self) -> IdGenerator {
        match self.seed {
            Some(seed) => IdGenerator::seeded(self.mode, seed),
            None => IdGenerator::new(self.mode),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where per-work artifacts are published and restored from
    pub data_dir: PathBuf,
    /// Where upsert scripts are written
    pub output_dir: PathBuf,
    pub edition: StoreEdition,
    /// Constraint declarations appended after the built-in set
    pub extra_constraints: Vec<String>,
    pub retry: RetrySettings,
    pub ids: IdSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let root = default_root();
        Self {
            data_dir: root.join("data"),
            output_dir: root.join("scripts"),
            edition: StoreEdition::default(),
            extra_constraints: Vec::new(),
            retry: RetrySettings::default(),
            ids: IdSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(raw: &str) -> ConfigResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Serializer for the configured edition and constraint set.
    pub fn serializer(&self) -> ScriptResult<GraphSerializer> {
        GraphSerializer::new(self.edition).with_constraints(&self.extra_constraints)
    }

    pub fn restorer(&self) -> Restorer {
        Restorer::new(&self.data_dir)
    }

    pub fn ingestor(&self) -> ScriptResult<RecordIngestor> {
        Ok(RecordIngestor::new(
            self.serializer()?,
            &self.output_dir,
            &self.data_dir,
        ))
    }

    /// Record ingestor and directory restorer wired with the retry budget.
    pub fn pipeline(&self) -> ScriptResult<Pipeline<RecordIngestor, Restorer>> {
        Ok(Pipeline::new(self.ingestor()?, self.restorer()).with_retry(self.retry.policy()))
    }
}

/// `~/.local/share/graphscribe` on Linux.
pub fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("graphscribe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 250);
        assert_eq!(config.edition, StoreEdition::Community);
        assert_eq!(config.ids.mode, BaseMode::Semantic);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PipelineConfig::from_yaml_str(
            "edition: enterprise\nretry:\n  max_attempts: 5\nids:\n  mode: random\n  seed: 9\n",
        )
        .unwrap();
        assert_eq!(config.edition, StoreEdition::Enterprise);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 250);
        assert_eq!(config.ids.mode, BaseMode::Random);
        assert_eq!(config.ids.seed, Some(9));
        assert_eq!(config.data_dir, default_root().join("data"));
    }

    #[test]
    fn retry_settings_become_policy() {
        let settings = RetrySettings {
            max_attempts: 4,
            delay_ms: 10,
        };
        assert_eq!(settings.policy(), RetryPolicy::new(4, Duration::from_millis(10)));
    }

    #[test]
    fn unknown_edition_is_parse_error() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("edition: platinum\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bad_extra_constraint_fails_serializer() {
        let config = PipelineConfig {
            extra_constraints: vec!["CREATE INDEX FOR (n:Work) ON (n.title)".into()],
            ..PipelineConfig::default()
        };
        assert!(config.serializer().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphscribe.yaml");
        std::fs::write(&path, format!("data_dir: {}\n", dir.path().display())).unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.restorer().storage_dir(), dir.path());

        assert!(matches!(
            PipelineConfig::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn seeded_generators_agree() {
        let settings = IdSettings {
            mode: BaseMode::Random,
            seed: Some(3),
        };
        let a = settings.generator().new_work_id("t", "p").unwrap();
        let b = settings.generator().new_work_id("t", "p").unwrap();
        assert_eq!(a.work_base(), b.work_base());
    }
}

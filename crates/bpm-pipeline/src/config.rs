//! Run configuration
//!
//! Read from a TOML file; every field has a default so an absent file is a
//! valid configuration. Command-line flags override individual fields after
//! loading.
//!
//! ```toml
//! store = "project/store"
//! report_dir = "reports"
//!
//! [log]
//! format = "json"
//! filter = "bpm=debug"
//!
//! [extract]
//! skip_transient = true
//!
//! [engine]
//! gc_after_save = true
//! ```

use crate::error::ConfigError;
use crate::report::Phase;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File picked up from the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "bpm.toml";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directives, used when the environment sets none
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_owned(),
        }
    }
}

/// Extractor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Leave transient and derived properties out of the cache
    pub skip_transient: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { skip_transient: true }
    }
}

/// Migration engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Request a garbage collection after every saved entry
    pub gc_after_save: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { gc_after_save: true }
    }
}

/// Complete configuration of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Asset-store directory
    pub store: Option<PathBuf>,
    /// Directory reports are written to
    pub report_dir: Option<PathBuf>,
    /// Logging
    pub log: LogConfig,
    /// Extractor
    pub extract: ExtractConfig,
    /// Migration engine
    pub engine: EngineConfig,
}

impl MigrationConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on syntax errors or unknown keys.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file
    ///
    /// # Errors
    /// I/O and parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, path)?;
        debug!(config = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path`, or `bpm.toml` in the working directory if present, or defaults
    ///
    /// # Errors
    /// As [`Self::load`]; a missing default file is not an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Override the asset store
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: PathBuf) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log.format = format;
        self
    }

    /// Where the report of `phase` goes when no explicit path is given
    #[must_use]
    pub fn report_path(&self, phase: Phase) -> PathBuf {
        let name = format!("{phase}-report.json");
        match &self.report_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = MigrationConfig::parse("", Path::new("bpm.toml")).unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert!(config.extract.skip_transient);
        assert!(config.engine.gc_after_save);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn sections_override_fields() {
        let text = r#"
            store = "store"
            report_dir = "out"
            [log]
            format = "json"
            [engine]
            gc_after_save = false
        "#;
        let config = MigrationConfig::parse(text, Path::new("bpm.toml")).unwrap();
        assert_eq!(config.store, Some(PathBuf::from("store")));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "info");
        assert!(!config.engine.gc_after_save);
        assert_eq!(config.report_path(Phase::Migrate), Path::new("out/migrate-report.json"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = MigrationConfig::parse("[engine]\nretries = 3\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MigrationConfig::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

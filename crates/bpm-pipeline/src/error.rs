//! Pipeline errors
//!
//! Only setup and I/O failures are errors. Everything that goes wrong with a
//! single asset is recorded in the [`crate::Report`] instead.

use std::path::PathBuf;

/// Failure reading or writing the extracted-value cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Cache file could not be read or written
    #[error("cache {path}: {source}")]
    Io {
        /// Cache file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The document is not a JSON object of records
    #[error("cache is not a JSON object of records: {0}")]
    Syntax(String),

    /// One record does not have the expected shape
    #[error("cache record {key}: {message}")]
    Record {
        /// Record key
        key: String,
        /// What is wrong
        message: String,
    },
}

/// Failure loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys
    #[error("invalid config {path}: {message}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

/// Any error a pipeline phase can stop on
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Plan rejected
    #[error(transparent)]
    Plan(#[from] bpm_plan::PlanError),

    /// Cache unreadable or unwritable
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Adapter could not be set up
    #[error("host unavailable: {0}")]
    Host(#[from] bpm_host::HostError),

    /// Report or other output could not be written
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry state machine was driven out of order
    #[error("illegal entry transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// State the entry was in
        from: crate::state::EntryState,
        /// State it was asked to enter
        to: crate::state::EntryState,
    },
}

impl PipelineError {
    /// Whether the error is a plan validation failure
    #[must_use]
    pub fn is_plan_error(&self) -> bool {
        matches!(self, Self::Plan(_))
    }
}

/// Result alias for pipeline setup operations
pub type Result<T> = std::result::Result<T, PipelineError>;

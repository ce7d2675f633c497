//! Plan-level errors
//!
//! Any of these aborts a run before a single asset is touched.

use std::path::PathBuf;

/// Why a plan was rejected
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Schema or content error, citing the offending row when there is one
    #[error("malformed plan{}: {reason}", row_suffix(.row))]
    MalformedPlan {
        /// 1-based row number, `None` for document-level errors
        row: Option<usize>,
        /// Human-readable reason
        reason: String,
    },

    /// The same asset appears twice
    #[error("duplicate asset {path} at row {row} (first listed at row {first_row})")]
    DuplicateAsset {
        /// Repeated asset path
        path: String,
        /// Row of the first occurrence
        first_row: usize,
        /// Row of the repetition
        row: usize,
    },

    /// Entries depend on each other's generated classes in a loop
    #[error("cyclic parent dependency: {}", cycle.join(" -> "))]
    CyclicParentDependency {
        /// Asset paths on the cycle, in row order
        cycle: Vec<String>,
    },

    /// Plan file extension is not one of the supported formats
    #[error("unsupported plan format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Plan file could not be read
    #[error("cannot read plan {path}: {source}")]
    Io {
        /// Plan file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl PlanError {
    /// Document-level schema error
    pub(crate) fn document(reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            row: None,
            reason: reason.into(),
        }
    }

    /// Row-level schema error
    pub(crate) fn row(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            row: Some(row),
            reason: reason.into(),
        }
    }

    /// Short machine-readable code, as it appears in reports
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPlan { .. } | Self::UnsupportedFormat(_) | Self::Io { .. } => "MalformedPlan",
            Self::DuplicateAsset { .. } => "DuplicateAsset",
            Self::CyclicParentDependency { .. } => "CyclicParentDependency",
        }
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" (row {r})")).unwrap_or_default()
}

/// Result alias for plan operations
pub type Result<T> = std::result::Result<T, PlanError>;

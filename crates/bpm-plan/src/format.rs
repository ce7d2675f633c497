//! Plan file formats
//!
//! Every format is decoded into a `serde_json::Value` first so that row
//! validation is the same code path whatever the author wrote.

use crate::error::{PlanError, Result};
use std::path::Path;

/// Supported plan file syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl PlanFormat {
    /// Pick the format from a file extension
    ///
    /// # Errors
    /// [`PlanError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(PlanError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub(crate) fn decode(self, text: &str) -> Result<serde_json::Value> {
        let decoded = match self {
            Self::Yaml => serde_yaml::from_str::<serde_json::Value>(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str::<serde_json::Value>(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<serde_json::Value>(text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| PlanError::document(format!("invalid {self:?}: {reason}")))
    }
}

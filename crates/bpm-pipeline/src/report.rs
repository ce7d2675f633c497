//! Run reports
//!
//! Every phase produces one [`Report`]. Entry failures and warnings are
//! collected here as values and echoed to the log at the moment they are
//! recorded, so nothing goes wrong silently.

use crate::persist::atomic_write;
use crate::state::{Reason, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{error, warn};
use uuid::Uuid;

/// Pipeline phase a report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Reading defaults into the cache
    Extract,
    /// Clear, reparent, rename, compile, save
    Migrate,
    /// Restoring cached defaults
    Apply,
    /// Post-migration checks
    Verify,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extract => "extract",
            Self::Migrate => "migrate",
            Self::Apply => "apply",
            Self::Verify => "verify",
        })
    }
}

/// One failure or warning attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryIssue {
    /// Asset path of the entry
    pub path: String,
    /// Stage the issue arose in
    pub state: Stage,
    /// Machine-readable reason
    pub reason: Reason,
    /// Human-readable detail
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl Display for EntryIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.path, self.state, self.reason)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Final status of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Completed without issues
    Ok,
    /// Completed with at least one warning
    Warned,
    /// Did not complete
    Failed,
}

/// Status line of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    /// Asset path
    pub path: String,
    /// Final status
    pub outcome: Outcome,
    /// The asset already had its target parent
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_migrated: bool,
}

/// Result of one pipeline phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Phase that produced the report
    pub phase: Phase,
    /// Unique id of the run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Entries processed
    pub total: usize,
    /// Entries that did not fail
    pub succeeded: usize,
    /// Entries with at least one warning
    pub warned: usize,
    /// Entries that already had their target parent
    pub already_migrated: usize,
    /// Entry failures, one per failed entry
    pub failed: Vec<EntryIssue>,
    /// Warnings, any number per entry
    pub warnings: Vec<EntryIssue>,
    /// Assets left in a state that needs a human
    pub manual_review: Vec<String>,
    /// Status of every entry, in processing order
    pub entries: Vec<EntryStatus>,
    /// Seconds spent per entry
    pub durations: BTreeMap<String, f64>,
    /// Seconds spent in the whole run
    pub duration_seconds: f64,
    /// Why the run stopped early or could not produce its output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// Digest of the cache file the run consumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_sha256: Option<String>,
}

impl Report {
    /// Empty report for `phase`, starting now
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            total: 0,
            succeeded: 0,
            warned: 0,
            already_migrated: 0,
            failed: Vec::new(),
            warnings: Vec::new(),
            manual_review: Vec::new(),
            entries: Vec::new(),
            durations: BTreeMap::new(),
            duration_seconds: 0.0,
            aborted: None,
            cache_sha256: None,
        }
    }

    /// Report of a run that stopped before touching any entry
    #[must_use]
    pub fn aborted(phase: Phase, reason: impl Into<String>) -> Self {
        let mut report = Self::new(phase);
        report.abort(reason);
        report
    }

    /// Mark a finished run as aborted, keeping the entries it processed
    pub fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(phase = %self.phase, %reason, "run aborted");
        self.aborted = Some(reason);
    }

    /// Whether every entry completed and the run was not aborted
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }

    /// Process exit code: 0 on success, 1 otherwise
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Status of one entry
    #[must_use]
    pub fn status(&self, path: &str) -> Option<&EntryStatus> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Warnings of one entry
    pub fn warnings_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a EntryIssue> + 'a {
        self.warnings.iter().filter(move |w| w.path == path)
    }

    /// Pretty JSON, newline terminated
    ///
    /// # Errors
    /// Serialization errors.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Write the report atomically
    ///
    /// # Errors
    /// I/O errors.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        let text = self.to_json().map_err(io::Error::other)?;
        atomic_write(path, text.as_bytes())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} total, {} succeeded, {} warned, {} failed",
            self.phase,
            self.total,
            self.succeeded,
            self.warned,
            self.failed.len()
        )?;
        if self.already_migrated > 0 {
            write!(f, ", {} already migrated", self.already_migrated)?;
        }
        if let Some(reason) = &self.aborted {
            write!(f, " (aborted: {reason})")?;
        }
        Ok(())
    }
}

/// Accumulates a [`Report`] while a phase runs
pub(crate) struct Recorder {
    report: Report,
    clock: Instant,
}

impl Recorder {
    pub(crate) fn new(phase: Phase) -> Self {
        Self {
            report: Report::new(phase),
            clock: Instant::now(),
        }
    }

    pub(crate) fn with_cache_sha256(mut self, digest: Option<String>) -> Self {
        self.report.cache_sha256 = digest;
        self
    }

    /// Start recording one entry
    pub(crate) fn entry(&self, path: &str) -> EntryLog {
        EntryLog {
            path: path.to_owned(),
            clock: Instant::now(),
            warnings: Vec::new(),
            failure: None,
            manual_review: false,
            already_migrated: false,
        }
    }

    /// Fold a finished entry into the report
    pub(crate) fn record(&mut self, log: EntryLog) {
        let report = &mut self.report;
        report.total += 1;
        let outcome = if log.failure.is_some() {
            Outcome::Failed
        } else if log.warnings.is_empty() {
            Outcome::Ok
        } else {
            Outcome::Warned
        };
        if outcome != Outcome::Failed {
            report.succeeded += 1;
        }
        if !log.warnings.is_empty() {
            report.warned += 1;
        }
        if log.already_migrated {
            report.already_migrated += 1;
        }
        if log.manual_review {
            report.manual_review.push(log.path.clone());
        }
        report.durations.insert(log.path.clone(), log.clock.elapsed().as_secs_f64());
        report.entries.push(EntryStatus {
            path: log.path,
            outcome,
            already_migrated: log.already_migrated,
        });
        report.warnings.extend(log.warnings);
        report.failed.extend(log.failure);
    }

    pub(crate) fn finish(mut self) -> Report {
        self.report.duration_seconds = self.clock.elapsed().as_secs_f64();
        self.report
    }
}

/// Issues of the entry currently being processed
pub(crate) struct EntryLog {
    path: String,
    clock: Instant,
    warnings: Vec<EntryIssue>,
    failure: Option<EntryIssue>,
    manual_review: bool,
    already_migrated: bool,
}

impl EntryLog {
    pub(crate) fn warn(&mut self, state: Stage, reason: Reason, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(path = %self.path, %state, %reason, %detail, "entry warning");
        self.warnings.push(EntryIssue {
            path: self.path.clone(),
            state,
            reason,
            detail,
        });
    }

    /// Record the entry's failure; only the first one is kept
    pub(crate) fn fail(&mut self, state: Stage, reason: Reason, detail: impl Into<String>) {
        let detail = detail.into();
        error!(path = %self.path, %state, %reason, %detail, "entry failed");
        if self.failure.is_none() {
            self.failure = Some(EntryIssue {
                path: self.path.clone(),
                state,
                reason,
                detail,
            });
        }
    }

    pub(crate) fn flag_for_review(&mut self) {
        self.manual_review = true;
    }

    pub(crate) fn mark_already_migrated(&mut self) {
        self.already_migrated = true;
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failure.is_some()
    }
}

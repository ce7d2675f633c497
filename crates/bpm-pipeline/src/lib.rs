//! Blueprint migration pipeline
//!
//! Three passes over a [`bpm_plan::MigrationPlan`], each producing a
//! [`Report`]:
//!
//! 1. [`Extractor`] reads pre-migration defaults into a [`CacheDocument`]
//! 2. [`MigrationEngine`] clears, reparents, renames, compiles and saves
//! 3. [`Applier`] restores the cached defaults onto the migrated assets
//!
//! A [`Verifier`] pass checks the result. The cache file is the only state
//! carried from one pass to the next.

pub mod applier;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod persist;
pub mod report;
pub mod state;
pub mod verifier;

pub use applier::Applier;
pub use cache::{diff, CacheDifference, CacheDocument, CacheRecord, ComponentRecord, Difference, ExtractedRecord};
pub use config::{EngineConfig, ExtractConfig, LogConfig, LogFormat, MigrationConfig};
pub use engine::MigrationEngine;
pub use error::{CacheError, ConfigError, PipelineError, Result};
pub use extractor::{write_cache, Extractor};
pub use report::{EntryIssue, EntryStatus, Outcome, Phase, Report};
pub use state::{allowed_transitions, validate_transition, EntryState, Reason, Stage};
pub use verifier::Verifier;

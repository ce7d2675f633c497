//! Per-entry state machine and report vocabulary
//!
//! Every entry walks `Pending -> Loaded -> Snapshotted -> Cleared ->
//! Reparented -> Renamed -> Compiled -> Saved`. An entry already parented to
//! its target skips clearing and renaming.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Progress of one plan entry through the migration engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryState {
    /// Not started
    Pending,
    /// Asset loaded
    Loaded,
    /// Parent class and component list captured
    Snapshotted,
    /// Clear policy applied
    Cleared,
    /// New parent set and recognised
    Reparented,
    /// Renames applied to remaining references
    Renamed,
    /// Compiled, possibly with warnings
    Compiled,
    /// Saved (terminal success)
    Saved,
}

impl EntryState {
    /// Stage whose success enters this state
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            Self::Pending | Self::Loaded => Stage::Load,
            Self::Snapshotted => Stage::Snapshot,
            Self::Cleared => Stage::Clear,
            Self::Reparented => Stage::Reparent,
            Self::Renamed => Stage::Rename,
            Self::Compiled => Stage::Compile,
            Self::Saved => Stage::Save,
        }
    }

    /// Reason recorded when entering this state fails
    #[must_use]
    pub fn failure_reason(self) -> Reason {
        match self {
            Self::Pending | Self::Loaded => Reason::LoadFailed,
            Self::Snapshotted => Reason::SnapshotFailed,
            Self::Cleared => Reason::ClearFailed,
            Self::Reparented => Reason::ReparentFailed,
            Self::Renamed => Reason::RenameFailed,
            Self::Compiled => Reason::CompileFailed,
            Self::Saved => Reason::SaveFailed,
        }
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: EntryState) -> &'static [EntryState] {
    use EntryState::{Cleared, Compiled, Loaded, Pending, Renamed, Reparented, Saved, Snapshotted};
    match from {
        Pending => &[Loaded],
        Loaded => &[Snapshotted],
        Snapshotted => &[Cleared, Reparented],
        Cleared => &[Reparented],
        Reparented => &[Renamed, Compiled],
        Renamed => &[Compiled],
        Compiled => &[Saved],
        Saved => &[],
    }
}

/// Check a transition
///
/// # Errors
/// [`PipelineError::IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(from: EntryState, to: EntryState) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

/// Step of a phase at which an issue was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Loading the asset
    Load,
    /// Capturing pre-migration shape
    Snapshot,
    /// Applying the clear policy
    Clear,
    /// Setting the new parent
    Reparent,
    /// Renaming variable references
    Rename,
    /// Compiling
    Compile,
    /// Saving
    Save,
    /// Reading default values into the cache
    Extract,
    /// Writing cached values back
    Restore,
    /// Checking the migrated asset
    Verify,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Machine-readable reason of a report issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// Asset could not be loaded
    LoadFailed,
    /// Pre-migration shape could not be captured
    SnapshotFailed,
    /// A clear step failed
    ClearFailed,
    /// Reparenting failed or was not recognised
    ReparentFailed,
    /// A rename or declaration delete failed
    RenameFailed,
    /// Compile failed, also after node reconstruction
    CompileFailed,
    /// Compile succeeded with warnings
    CompileWarnings,
    /// Save failed
    SaveFailed,
    /// Asset does not exist
    AssetMissing,
    /// Cache has no usable record for the entry
    NoCachedRecord,
    /// A renamed property has no target on the new class
    TargetPropertyMissing,
    /// A cached property the plan neither renames nor deletes has no target
    UnmappedProperty,
    /// Cached value does not fit the target property
    TypeMismatch,
    /// Cached value has no restorable representation
    UnknownTypedValue,
    /// Cached component has no live counterpart and is not recreated
    ComponentMissing,
    /// Cached component cannot be constructed by the host
    ComponentUnconstructible,
    /// Host refused to write a value
    WriteRejected,
    /// A property could not be read from the source asset
    ReadFailed,
    /// The target parent is not in the migrated class's parent chain
    ParentMismatch,
    /// A property the plan expects is not on the migrated default object
    ExpectedPropertyMissing,
    /// A renamed-away variable is still declared
    StaleVariable,
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

//! Migration plan catalog
//!
//! The plan is the declarative description of a run: which assets move to
//! which native parent, what gets cleared on the way and how variables are
//! renamed. It has no behavior beyond validation and ordering.
//!
//! ```no_run
//! use bpm_plan::MigrationPlan;
//!
//! let plan = MigrationPlan::load("plans/doors.yaml")?;
//! for entry in plan.ordered_entries() {
//!     println!("{} -> {}", entry.path, entry.target_parent);
//! }
//! # Ok::<(), bpm_plan::PlanError>(())
//! ```

pub mod entry;
pub mod error;
pub mod format;
mod order;
pub mod plan;

pub use entry::{ClearPolicy, PlanEntry};
pub use error::{PlanError, Result};
pub use format::PlanFormat;
pub use order::OrderedEntries;
pub use plan::MigrationPlan;

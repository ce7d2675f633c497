//! Host editor adapter seam
//!
//! [`HostAdapter`] is the one interface between the migration pipeline and
//! the host editor. Everything above it is adapter-agnostic; every failure
//! crosses it as a [`HostError`] value.
//!
//! Implementations provided here:
//! - [`InMemoryHost`]: a simulated editor over a [`HostModel`], optionally
//!   backed by an on-disk [`AssetStore`] (see [`InMemoryHost::open`])
//! - [`ReadOnlyHost`]: forwards reads, refuses every mutation

pub mod adapter;
pub mod error;
pub mod memory;
pub mod model;
pub mod readonly;
pub mod store;

pub use adapter::{
    is_ancestor, parent_chain, AssetInfo, CompileOutcome, ComponentInfo, GraphInfo, GraphKind, HostAdapter, ObjectRef,
    VariableInfo,
};
pub use error::{HostError, HostResult};
pub use memory::{InMemoryHost, JournalEntry};
pub use model::{
    Blueprint, ClassCatalog, ComponentClass, ComponentOverride, ComponentTemplate, Graph, GraphNode, HostModel,
    NativeClass, Variable, MAIN_EVENT_GRAPH,
};
pub use readonly::ReadOnlyHost;
pub use store::AssetStore;

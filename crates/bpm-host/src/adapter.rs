//! The host editor adapter seam
//!
//! The only place that talks to the host editor. Operations are awaited one
//! at a time; handles are plain values (paths and names) so nothing obtained
//! before a reparent can outlive it. The adapter re-resolves on every call.

use crate::error::{HostError, HostResult};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, PropertyKind, Transform};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Handle to an object whose properties can be read and written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    /// Default object of a class
    DefaultObject(ClassPath),
    /// Component template owned by an asset's default object
    Component {
        /// Owning asset
        asset: AssetPath,
        /// Component name
        name: String,
    },
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultObject(class) => write!(f, "Default__{}", class.short_name()),
            Self::Component { asset, name } => write!(f, "{}:{name}", asset.leaf()),
        }
    }
}

/// What loading an asset reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Asset path
    pub path: AssetPath,
    /// Class the asset generates
    pub generated_class: ClassPath,
    /// Current parent of the generated class
    pub parent_class: ClassPath,
}

/// One node of an asset's component hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component name
    pub name: String,
    /// Component class name
    pub class: String,
    /// Attach parent, `None` for a root
    pub attach_parent: Option<String>,
    /// Relative transform
    pub transform: Transform,
    /// Declared by a parent class rather than the asset itself
    pub inherited: bool,
}

/// A user-declared variable of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Declared type
    pub kind: PropertyKind,
}

/// Kind of graph stored in an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// Event graph (the main one is called `EventGraph`)
    Event,
    /// Function graph
    Function,
    /// Macro graph
    Macro,
    /// Delegate signature graph
    Delegate,
}

/// Summary of one graph of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    /// Graph name
    pub name: String,
    /// Graph kind
    pub kind: GraphKind,
    /// Number of nodes
    pub node_count: usize,
}

/// Result of a successful compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutcome {
    /// Warnings the compiler emitted
    pub warnings: Vec<String>,
}

impl CompileOutcome {
    /// Whether the compile was clean
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The capability set of the host editor
///
/// Every operation either succeeds or fails with a [`HostError`].
#[async_trait::async_trait]
pub trait HostAdapter: Send + Sync {
    /// Load an asset into the editor
    async fn load_asset(&self, asset: &AssetPath) -> HostResult<AssetInfo>;

    /// Persist an asset
    async fn save_asset(&self, asset: &AssetPath) -> HostResult<()>;

    /// Class the asset generates
    async fn get_generated_class(&self, asset: &AssetPath) -> HostResult<ClassPath>;

    /// Default object of a class
    async fn get_default_object(&self, class: &ClassPath) -> HostResult<ObjectRef>;

    /// Properties of an object, as the host's reflection reports them
    async fn enumerate_properties(&self, object: &ObjectRef) -> HostResult<Vec<PropertyDescriptor>>;

    /// Read one property value
    async fn read_property(&self, object: &ObjectRef, property: &str) -> HostResult<HostValue>;

    /// Write one property value
    async fn write_property(&self, object: &ObjectRef, property: &str, value: HostValue) -> HostResult<()>;

    /// Component hierarchy of the asset's default object, parents before children
    async fn get_component_hierarchy(&self, asset: &AssetPath) -> HostResult<Vec<ComponentInfo>>;

    /// Add a component to the asset's construction script
    async fn add_component(
        &self,
        asset: &AssetPath,
        name: &str,
        class: &str,
        attach_parent: Option<&str>,
    ) -> HostResult<()>;

    /// Remove a component the asset declares
    async fn remove_component(&self, asset: &AssetPath, name: &str) -> HostResult<()>;

    /// Set a component's relative transform
    async fn set_component_transform(&self, asset: &AssetPath, name: &str, transform: Transform) -> HostResult<()>;

    /// Parent of a class, `None` at the root
    async fn get_parent_class(&self, class: &ClassPath) -> HostResult<Option<ClassPath>>;

    /// Reparent the asset's generated class
    async fn set_parent_class(&self, asset: &AssetPath, parent: &ClassPath) -> HostResult<()>;

    /// Compile the asset
    async fn compile_blueprint(&self, asset: &AssetPath) -> HostResult<CompileOutcome>;

    /// Refresh every node, regenerating stale call signatures
    async fn reconstruct_all_nodes(&self, asset: &AssetPath) -> HostResult<()>;

    /// Remove a variable declaration
    async fn remove_variable(&self, asset: &AssetPath, name: &str) -> HostResult<()>;

    /// Remove a function graph
    async fn remove_function(&self, asset: &AssetPath, name: &str) -> HostResult<()>;

    /// Point every node referencing `old` at `new`; returns the number of nodes changed
    async fn substitute_variable_references(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<usize>;

    /// Remove every node of one graph; returns the number removed
    async fn clear_graph_nodes(&self, asset: &AssetPath, graph: &str) -> HostResult<usize>;

    /// Remove every event graph's nodes; returns the number removed
    async fn clear_event_graphs(&self, asset: &AssetPath) -> HostResult<usize>;

    /// Remove every function, macro and delegate graph; returns the number removed
    async fn clear_function_graphs(&self, asset: &AssetPath) -> HostResult<usize>;

    /// Remove every component the asset declares; returns the number removed
    async fn clear_simple_construction_script(&self, asset: &AssetPath) -> HostResult<usize>;

    /// Ask the host to collect garbage
    async fn gc_collect(&self) -> HostResult<()>;

    /// User-declared variables of the asset
    async fn list_variables(&self, asset: &AssetPath) -> HostResult<Vec<VariableInfo>>;

    /// Graphs of the asset
    async fn list_graphs(&self, asset: &AssetPath) -> HostResult<Vec<GraphInfo>>;

    /// Rename a variable declaration along with its references
    async fn rename_variable(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<()>;

    /// Remove every interface the asset implements; returns the number removed
    async fn remove_implemented_interfaces(&self, asset: &AssetPath) -> HostResult<usize>;
}

/// Upper bound on inheritance depth, guards against a corrupted catalog
pub const MAX_CLASS_DEPTH: usize = 64;

/// Parent chain of `class`, nearest parent first
///
/// # Errors
/// Propagates adapter errors; a chain deeper than [`MAX_CLASS_DEPTH`] is a
/// [`HostError::Host`].
pub async fn parent_chain<H: HostAdapter + ?Sized>(host: &H, class: &ClassPath) -> HostResult<Vec<ClassPath>> {
    let mut chain = Vec::new();
    let mut current = class.clone();
    while let Some(parent) = host.get_parent_class(&current).await? {
        if chain.len() >= MAX_CLASS_DEPTH || parent == *class {
            return Err(HostError::Host(format!("class hierarchy of {class} does not terminate")));
        }
        chain.push(parent.clone());
        current = parent;
    }
    Ok(chain)
}

/// Whether `ancestor` is in the parent chain of `class`
///
/// # Errors
/// Propagates adapter errors.
pub async fn is_ancestor<H: HostAdapter + ?Sized>(host: &H, class: &ClassPath, ancestor: &ClassPath) -> HostResult<bool> {
    Ok(parent_chain(host, class).await?.contains(ancestor))
}

//! Read-only adapter guard
//!
//! Wraps any adapter, forwards reads, and refuses every mutation with
//! [`HostError::ReadOnly`]. The extractor always runs behind it.

use crate::adapter::{AssetInfo, CompileOutcome, ComponentInfo, GraphInfo, HostAdapter, ObjectRef, VariableInfo};
use crate::error::{HostError, HostResult};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, Transform};
use std::sync::Arc;
use tracing::warn;

/// Adapter that cannot mutate the asset store
pub struct ReadOnlyHost {
    inner: Arc<dyn HostAdapter>,
}

impl ReadOnlyHost {
    /// Guard `inner`
    #[inline]
    #[must_use]
    pub fn new(inner: Arc<dyn HostAdapter>) -> Self {
        Self { inner }
    }
}

fn refuse<T>(op: &'static str) -> HostResult<T> {
    warn!(op, "mutation refused by read-only adapter");
    Err(HostError::ReadOnly(op))
}

#[async_trait::async_trait]
impl HostAdapter for ReadOnlyHost {
    async fn load_asset(&self, asset: &AssetPath) -> HostResult<AssetInfo> {
        self.inner.load_asset(asset).await
    }

    async fn save_asset(&self, _asset: &AssetPath) -> HostResult<()> {
        refuse("save_asset")
    }

    async fn get_generated_class(&self, asset: &AssetPath) -> HostResult<ClassPath> {
        self.inner.get_generated_class(asset).await
    }

    async fn get_default_object(&self, class: &ClassPath) -> HostResult<ObjectRef> {
        self.inner.get_default_object(class).await
    }

    async fn enumerate_properties(&self, object: &ObjectRef) -> HostResult<Vec<PropertyDescriptor>> {
        self.inner.enumerate_properties(object).await
    }

    async fn read_property(&self, object: &ObjectRef, property: &str) -> HostResult<HostValue> {
        self.inner.read_property(object, property).await
    }

    async fn write_property(&self, _object: &ObjectRef, _property: &str, _value: HostValue) -> HostResult<()> {
        refuse("write_property")
    }

    async fn get_component_hierarchy(&self, asset: &AssetPath) -> HostResult<Vec<ComponentInfo>> {
        self.inner.get_component_hierarchy(asset).await
    }

    async fn add_component(
        &self,
        _asset: &AssetPath,
        _name: &str,
        _class: &str,
        _attach_parent: Option<&str>,
    ) -> HostResult<()> {
        refuse("add_component")
    }

    async fn remove_component(&self, _asset: &AssetPath, _name: &str) -> HostResult<()> {
        refuse("remove_component")
    }

    async fn set_component_transform(&self, _asset: &AssetPath, _name: &str, _transform: Transform) -> HostResult<()> {
        refuse("set_component_transform")
    }

    async fn get_parent_class(&self, class: &ClassPath) -> HostResult<Option<ClassPath>> {
        self.inner.get_parent_class(class).await
    }

    async fn set_parent_class(&self, _asset: &AssetPath, _parent: &ClassPath) -> HostResult<()> {
        refuse("set_parent_class")
    }

    async fn compile_blueprint(&self, _asset: &AssetPath) -> HostResult<CompileOutcome> {
        refuse("compile_blueprint")
    }

    async fn reconstruct_all_nodes(&self, _asset: &AssetPath) -> HostResult<()> {
        refuse("reconstruct_all_nodes")
    }

    async fn remove_variable(&self, _asset: &AssetPath, _name: &str) -> HostResult<()> {
        refuse("remove_variable")
    }

    async fn remove_function(&self, _asset: &AssetPath, _name: &str) -> HostResult<()> {
        refuse("remove_function")
    }

    async fn substitute_variable_references(&self, _asset: &AssetPath, _old: &str, _new: &str) -> HostResult<usize> {
        refuse("substitute_variable_references")
    }

    async fn clear_graph_nodes(&self, _asset: &AssetPath, _graph: &str) -> HostResult<usize> {
        refuse("clear_graph_nodes")
    }

    async fn clear_event_graphs(&self, _asset: &AssetPath) -> HostResult<usize> {
        refuse("clear_event_graphs")
    }

    async fn clear_function_graphs(&self, _asset: &AssetPath) -> HostResult<usize> {
        refuse("clear_function_graphs")
    }

    async fn clear_simple_construction_script(&self, _asset: &AssetPath) -> HostResult<usize> {
        refuse("clear_simple_construction_script")
    }

    // Collecting garbage mutates no asset
    async fn gc_collect(&self) -> HostResult<()> {
        self.inner.gc_collect().await
    }

    async fn list_variables(&self, asset: &AssetPath) -> HostResult<Vec<VariableInfo>> {
        self.inner.list_variables(asset).await
    }

    async fn list_graphs(&self, asset: &AssetPath) -> HostResult<Vec<GraphInfo>> {
        self.inner.list_graphs(asset).await
    }

    async fn rename_variable(&self, _asset: &AssetPath, _old: &str, _new: &str) -> HostResult<()> {
        refuse("rename_variable")
    }

    async fn remove_implemented_interfaces(&self, _asset: &AssetPath) -> HostResult<usize> {
        refuse("remove_implemented_interfaces")
    }
}

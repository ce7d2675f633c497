//! Fault-injecting adapter wrapper

use bpm_host::{
    AssetInfo, CompileOutcome, ComponentInfo, GraphInfo, HostAdapter, HostError, HostResult, ObjectRef, VariableInfo,
};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, Transform};
use parking_lot::Mutex;
use std::sync::Arc;

/// One injected failure
#[derive(Debug, Clone)]
pub struct Fault {
    op: &'static str,
    asset: Option<AssetPath>,
    remaining: Option<usize>,
    error: fn(&'static str) -> HostError,
}

fn injected(op: &'static str) -> HostError {
    HostError::Host(format!("injected failure in {op}"))
}

impl Fault {
    /// Fail every call of `op`
    pub fn on(op: &'static str) -> Self {
        Self {
            op,
            asset: None,
            remaining: None,
            error: injected,
        }
    }

    /// Only calls targeting `asset`
    #[must_use]
    pub fn for_asset(mut self, asset: &AssetPath) -> Self {
        self.asset = Some(asset.clone());
        self
    }

    /// Only the first `n` matching calls
    #[must_use]
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    /// Fail with a specific error
    #[must_use]
    pub fn with(mut self, error: fn(&'static str) -> HostError) -> Self {
        self.error = error;
        self
    }

    fn matches(&self, op: &str, asset: Option<&AssetPath>) -> bool {
        self.op == op && self.remaining != Some(0) && self.asset.as_ref().map_or(true, |a| Some(a) == asset)
    }
}

/// Adapter that fails selected calls and forwards the rest
pub struct FaultyHost {
    inner: Arc<dyn HostAdapter>,
    faults: Mutex<Vec<Fault>>,
    injected: Mutex<Vec<(&'static str, Option<AssetPath>)>>,
}

impl FaultyHost {
    pub fn new(inner: Arc<dyn HostAdapter>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            injected: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_fault(self, fault: Fault) -> Self {
        self.faults.lock().push(fault);
        self
    }

    /// Calls that were failed, in order
    pub fn injected(&self) -> Vec<(&'static str, Option<AssetPath>)> {
        self.injected.lock().clone()
    }

    fn check(&self, op: &'static str, asset: Option<&AssetPath>) -> HostResult<()> {
        let mut faults = self.faults.lock();
        let Some(fault) = faults.iter_mut().find(|f| f.matches(op, asset)) else {
            return Ok(());
        };
        if let Some(n) = fault.remaining.as_mut() {
            *n -= 1;
        }
        self.injected.lock().push((op, asset.cloned()));
        Err((fault.error)(op))
    }
}

fn object_asset(object: &ObjectRef) -> Option<AssetPath> {
    match object {
        ObjectRef::DefaultObject(class) => class.owning_asset(),
        ObjectRef::Component { asset, .. } => Some(asset.clone()),
    }
}

#[async_trait::async_trait]
impl HostAdapter for FaultyHost {
    async fn load_asset(&self, asset: &AssetPath) -> HostResult<AssetInfo> {
        self.check("load_asset", Some(asset))?;
        self.inner.load_asset(asset).await
    }

    async fn save_asset(&self, asset: &AssetPath) -> HostResult<()> {
        self.check("save_asset", Some(asset))?;
        self.inner.save_asset(asset).await
    }

    async fn get_generated_class(&self, asset: &AssetPath) -> HostResult<ClassPath> {
        self.check("get_generated_class", Some(asset))?;
        self.inner.get_generated_class(asset).await
    }

    async fn get_default_object(&self, class: &ClassPath) -> HostResult<ObjectRef> {
        self.check("get_default_object", class.owning_asset().as_ref())?;
        self.inner.get_default_object(class).await
    }

    async fn enumerate_properties(&self, object: &ObjectRef) -> HostResult<Vec<PropertyDescriptor>> {
        self.check("enumerate_properties", object_asset(object).as_ref())?;
        self.inner.enumerate_properties(object).await
    }

    async fn read_property(&self, object: &ObjectRef, property: &str) -> HostResult<HostValue> {
        self.check("read_property", object_asset(object).as_ref())?;
        self.inner.read_property(object, property).await
    }

    async fn write_property(&self, object: &ObjectRef, property: &str, value: HostValue) -> HostResult<()> {
        self.check("write_property", object_asset(object).as_ref())?;
        self.inner.write_property(object, property, value).await
    }

    async fn get_component_hierarchy(&self, asset: &AssetPath) -> HostResult<Vec<ComponentInfo>> {
        self.check("get_component_hierarchy", Some(asset))?;
        self.inner.get_component_hierarchy(asset).await
    }

    async fn add_component(
        &self,
        asset: &AssetPath,
        name: &str,
        class: &str,
        attach_parent: Option<&str>,
    ) -> HostResult<()> {
        self.check("add_component", Some(asset))?;
        self.inner.add_component(asset, name, class, attach_parent).await
    }

    async fn remove_component(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.check("remove_component", Some(asset))?;
        self.inner.remove_component(asset, name).await
    }

    async fn set_component_transform(&self, asset: &AssetPath, name: &str, transform: Transform) -> HostResult<()> {
        self.check("set_component_transform", Some(asset))?;
        self.inner.set_component_transform(asset, name, transform).await
    }

    async fn get_parent_class(&self, class: &ClassPath) -> HostResult<Option<ClassPath>> {
        self.check("get_parent_class", class.owning_asset().as_ref())?;
        self.inner.get_parent_class(class).await
    }

    async fn set_parent_class(&self, asset: &AssetPath, parent: &ClassPath) -> HostResult<()> {
        self.check("set_parent_class", Some(asset))?;
        self.inner.set_parent_class(asset, parent).await
    }

    async fn compile_blueprint(&self, asset: &AssetPath) -> HostResult<CompileOutcome> {
        self.check("compile_blueprint", Some(asset))?;
        self.inner.compile_blueprint(asset).await
    }

    async fn reconstruct_all_nodes(&self, asset: &AssetPath) -> HostResult<()> {
        self.check("reconstruct_all_nodes", Some(asset))?;
        self.inner.reconstruct_all_nodes(asset).await
    }

    async fn remove_variable(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.check("remove_variable", Some(asset))?;
        self.inner.remove_variable(asset, name).await
    }

    async fn remove_function(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.check("remove_function", Some(asset))?;
        self.inner.remove_function(asset, name).await
    }

    async fn substitute_variable_references(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<usize> {
        self.check("substitute_variable_references", Some(asset))?;
        self.inner.substitute_variable_references(asset, old, new).await
    }

    async fn clear_graph_nodes(&self, asset: &AssetPath, graph: &str) -> HostResult<usize> {
        self.check("clear_graph_nodes", Some(asset))?;
        self.inner.clear_graph_nodes(asset, graph).await
    }

    async fn clear_event_graphs(&self, asset: &AssetPath) -> HostResult<usize> {
        self.check("clear_event_graphs", Some(asset))?;
        self.inner.clear_event_graphs(asset).await
    }

    async fn clear_function_graphs(&self, asset: &AssetPath) -> HostResult<usize> {
        self.check("clear_function_graphs", Some(asset))?;
        self.inner.clear_function_graphs(asset).await
    }

    async fn clear_simple_construction_script(&self, asset: &AssetPath) -> HostResult<usize> {
        self.check("clear_simple_construction_script", Some(asset))?;
        self.inner.clear_simple_construction_script(asset).await
    }

    async fn gc_collect(&self) -> HostResult<()> {
        self.check("gc_collect", None)?;
        self.inner.gc_collect().await
    }

    async fn list_variables(&self, asset: &AssetPath) -> HostResult<Vec<VariableInfo>> {
        self.check("list_variables", Some(asset))?;
        self.inner.list_variables(asset).await
    }

    async fn list_graphs(&self, asset: &AssetPath) -> HostResult<Vec<GraphInfo>> {
        self.check("list_graphs", Some(asset))?;
        self.inner.list_graphs(asset).await
    }

    async fn rename_variable(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<()> {
        self.check("rename_variable", Some(asset))?;
        self.inner.rename_variable(asset, old, new).await
    }

    async fn remove_implemented_interfaces(&self, asset: &AssetPath) -> HostResult<usize> {
        self.check("remove_implemented_interfaces", Some(asset))?;
        self.inner.remove_implemented_interfaces(asset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{asset, host, DOOR, SWITCH};

    #[tokio::test]
    async fn fault_fires_only_for_its_asset_and_count() {
        let faulty = FaultyHost::new(host()).with_fault(Fault::on("load_asset").for_asset(&asset(DOOR)).times(1));
        assert!(faulty.load_asset(&asset(SWITCH)).await.is_ok());
        assert!(matches!(faulty.load_asset(&asset(DOOR)).await, Err(HostError::Host(_))));
        assert!(faulty.load_asset(&asset(DOOR)).await.is_ok());
        assert_eq!(faulty.injected(), vec![("load_asset", Some(asset(DOOR)))]);
    }

    #[tokio::test]
    async fn custom_error_is_returned() {
        let faulty = FaultyHost::new(host()).with_fault(Fault::on("save_asset").with(HostError::ReadOnly));
        assert!(matches!(
            faulty.save_asset(&asset(DOOR)).await,
            Err(HostError::ReadOnly("save_asset"))
        ));
    }
}

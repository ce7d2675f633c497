//! Simulated host editor
//!
//! [`InMemoryHost`] implements the whole adapter over a [`HostModel`]. It
//! behaves like the editor where it matters to a migration: reparenting drops
//! default values the new class cannot hold and leaves call signatures stale
//! until nodes are reconstructed, compiling checks every graph reference, and
//! nothing reaches disk until `save_asset`.

use crate::adapter::{
    AssetInfo, CompileOutcome, ComponentInfo, GraphInfo, GraphKind, HostAdapter, ObjectRef, VariableInfo,
};
use crate::error::{HostError, HostResult};
use crate::model::{ClassNode, ComponentTemplate, GraphNode, HostModel, Variable, MAIN_EVENT_GRAPH};
use crate::store::AssetStore;
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, Transform};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// One mutating call, in the order the host received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Operation name
    pub op: &'static str,
    /// Asset (or object) the call targeted
    pub target: String,
}

#[derive(Debug, Default)]
struct HostState {
    model: HostModel,
    dirty: BTreeSet<AssetPath>,
    journal: Vec<JournalEntry>,
    gc_runs: usize,
}

impl HostState {
    fn record(&mut self, op: &'static str, target: impl ToString) {
        self.journal.push(JournalEntry {
            op,
            target: target.to_string(),
        });
    }

    fn touch(&mut self, op: &'static str, asset: &AssetPath) {
        self.dirty.insert(asset.clone());
        self.record(op, asset);
    }
}

/// An editor session held in memory
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
    store: Option<AssetStore>,
}

impl InMemoryHost {
    /// Session over a model; saves go nowhere
    #[must_use]
    pub fn new(model: HostModel) -> Self {
        Self {
            state: Mutex::new(HostState {
                model,
                ..HostState::default()
            }),
            store: None,
        }
    }

    /// Session over an asset store directory; saves write the asset back
    ///
    /// # Errors
    /// I/O or document errors while reading the store.
    pub fn open(dir: impl AsRef<Path>) -> HostResult<Self> {
        let store = AssetStore::new(dir.as_ref());
        let model = store.load()?;
        Ok(Self {
            state: Mutex::new(HostState {
                model,
                ..HostState::default()
            }),
            store: Some(store),
        })
    }

    /// Copy of the current model
    #[must_use]
    pub fn model(&self) -> HostModel {
        self.state.lock().model.clone()
    }

    /// Mutating calls received so far
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    /// Number of completed `gc_collect` calls
    #[must_use]
    pub fn gc_runs(&self) -> usize {
        self.state.lock().gc_runs
    }

    /// Assets modified since their last save
    #[must_use]
    pub fn dirty_assets(&self) -> Vec<AssetPath> {
        self.state.lock().dirty.iter().cloned().collect()
    }

    fn with_blueprint<T>(
        &self,
        op: &'static str,
        asset: &AssetPath,
        f: impl FnOnce(&mut crate::model::Blueprint) -> HostResult<T>,
    ) -> HostResult<T> {
        let mut state = self.state.lock();
        let out = f(state.model.blueprint_mut(asset)?)?;
        state.touch(op, asset);
        Ok(out)
    }
}

fn substitute(nodes: &mut [GraphNode], old: &str, new: &str) -> usize {
    let mut changed = 0;
    for node in nodes {
        if let GraphNode::GetVariable { variable } | GraphNode::SetVariable { variable } = node {
            if variable == old {
                *variable = new.to_string();
                changed += 1;
            }
        }
    }
    changed
}

#[async_trait::async_trait]
impl HostAdapter for InMemoryHost {
    async fn load_asset(&self, asset: &AssetPath) -> HostResult<AssetInfo> {
        let state = self.state.lock();
        let bp = state.model.blueprint(asset)?;
        debug!(asset = %asset, "load_asset");
        Ok(AssetInfo {
            path: asset.clone(),
            generated_class: bp.generated_class(),
            parent_class: bp.parent.clone(),
        })
    }

    async fn save_asset(&self, asset: &AssetPath) -> HostResult<()> {
        let mut state = self.state.lock();
        let bp = state.model.blueprint(asset)?;
        if let Some(store) = &self.store {
            store.write_blueprint(bp)?;
        }
        state.dirty.remove(asset);
        state.record("save_asset", asset);
        Ok(())
    }

    async fn get_generated_class(&self, asset: &AssetPath) -> HostResult<ClassPath> {
        Ok(self.state.lock().model.blueprint(asset)?.generated_class())
    }

    async fn get_default_object(&self, class: &ClassPath) -> HostResult<ObjectRef> {
        if self.state.lock().model.class_exists(class) {
            Ok(ObjectRef::DefaultObject(class.clone()))
        } else {
            Err(HostError::ClassNotFound(class.clone()))
        }
    }

    async fn enumerate_properties(&self, object: &ObjectRef) -> HostResult<Vec<PropertyDescriptor>> {
        let state = self.state.lock();
        match object {
            ObjectRef::DefaultObject(class) => state.model.class_properties(class),
            ObjectRef::Component { asset, name } => {
                let (template, _) = state.model.component(asset, name)?;
                Ok(state.model.component_properties(&template.class))
            }
        }
    }

    async fn read_property(&self, object: &ObjectRef, property: &str) -> HostResult<HostValue> {
        let state = self.state.lock();
        match object {
            ObjectRef::DefaultObject(class) => state.model.default_value(class, property),
            ObjectRef::Component { asset, name } => state.model.component_value(asset, name, property),
        }
    }

    async fn write_property(&self, object: &ObjectRef, property: &str, value: HostValue) -> HostResult<()> {
        let mut state = self.state.lock();
        match object {
            ObjectRef::DefaultObject(class) => {
                let asset = class
                    .owning_asset()
                    .ok_or_else(|| HostError::rejected("write_property", format!("{class} is a native class")))?;
                let descriptor = state.model.class_property(class, property)?;
                if !descriptor.kind.accepts(&value) {
                    return Err(HostError::rejected(
                        "write_property",
                        format!("{property} is {} but got {}", descriptor.kind, value.kind_name()),
                    ));
                }
                state
                    .model
                    .blueprint_mut(&asset)?
                    .defaults
                    .insert(property.to_string(), value);
                state.touch("write_property", &asset);
            }
            ObjectRef::Component { asset, name } => {
                let (template, inherited) = state.model.component(asset, name)?;
                let descriptor = state
                    .model
                    .component_properties(&template.class)
                    .into_iter()
                    .find(|p| p.name == property)
                    .ok_or_else(|| HostError::PropertyNotFound {
                        object: object.to_string(),
                        property: property.to_string(),
                    })?;
                if !descriptor.kind.accepts(&value) {
                    return Err(HostError::rejected(
                        "write_property",
                        format!("{property} is {} but got {}", descriptor.kind, value.kind_name()),
                    ));
                }
                let bp = state.model.blueprint_mut(asset)?;
                if inherited {
                    bp.component_overrides
                        .entry(name.clone())
                        .or_default()
                        .properties
                        .insert(property.to_string(), value);
                } else if let Some(own) = bp.components.iter_mut().find(|c| c.name == *name) {
                    own.properties.insert(property.to_string(), value);
                }
                state.touch("write_property", asset);
            }
        }
        Ok(())
    }

    async fn get_component_hierarchy(&self, asset: &AssetPath) -> HostResult<Vec<ComponentInfo>> {
        self.state.lock().model.component_hierarchy(asset)
    }

    async fn add_component(
        &self,
        asset: &AssetPath,
        name: &str,
        class: &str,
        attach_parent: Option<&str>,
    ) -> HostResult<()> {
        let mut state = self.state.lock();
        match state.model.component_class(class) {
            Some(c) if c.constructible => {}
            Some(_) => return Err(HostError::Unsupported(format!("{class} cannot be added to a construction script"))),
            None => return Err(HostError::Unsupported(format!("unknown component class {class}"))),
        }
        let hierarchy = state.model.component_hierarchy(asset)?;
        if hierarchy.iter().any(|c| c.name == name) {
            return Err(HostError::rejected("add_component", format!("{name} already exists")));
        }
        if let Some(parent) = attach_parent {
            if !hierarchy.iter().any(|c| c.name == parent) {
                return Err(HostError::ComponentNotFound {
                    asset: asset.clone(),
                    component: parent.to_string(),
                });
            }
        }
        let mut template = ComponentTemplate::new(name, class);
        template.attach_parent = attach_parent.map(str::to_string);
        state.model.blueprint_mut(asset)?.components.push(template);
        state.touch("add_component", asset);
        Ok(())
    }

    async fn remove_component(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.with_blueprint("remove_component", asset, |bp| {
            let before = bp.components.len();
            bp.components.retain(|c| c.name != name);
            if bp.components.len() == before {
                return Err(HostError::ComponentNotFound {
                    asset: bp.path.clone(),
                    component: name.to_string(),
                });
            }
            for child in &mut bp.components {
                if child.attach_parent.as_deref() == Some(name) {
                    child.attach_parent = None;
                }
            }
            Ok(())
        })
    }

    async fn set_component_transform(&self, asset: &AssetPath, name: &str, transform: Transform) -> HostResult<()> {
        let mut state = self.state.lock();
        let (_, inherited) = state.model.component(asset, name)?;
        let bp = state.model.blueprint_mut(asset)?;
        if inherited {
            bp.component_overrides.entry(name.to_string()).or_default().transform = Some(transform);
        } else if let Some(own) = bp.components.iter_mut().find(|c| c.name == name) {
            own.transform = transform;
        }
        state.touch("set_component_transform", asset);
        Ok(())
    }

    async fn get_parent_class(&self, class: &ClassPath) -> HostResult<Option<ClassPath>> {
        self.state.lock().model.parent_of(class)
    }

    async fn set_parent_class(&self, asset: &AssetPath, parent: &ClassPath) -> HostResult<()> {
        let mut state = self.state.lock();
        if !state.model.class_exists(parent) {
            return Err(HostError::ClassNotFound(parent.clone()));
        }
        let class = asset.generated_class();
        if *parent == class || state.model.lineage(parent)?.iter().any(|node| match node {
            ClassNode::Blueprint(bp) => bp.path == *asset,
            ClassNode::Native(_) => false,
        }) {
            return Err(HostError::rejected(
                "set_parent_class",
                format!("{parent} derives from {class}"),
            ));
        }

        let bp = state.model.blueprint_mut(asset)?;
        bp.parent = parent.clone();
        bp.stale_nodes = bp
            .graphs
            .iter()
            .flat_map(|g| &g.nodes)
            .any(|n| matches!(n, GraphNode::CallFunction { .. }));
        let dropped = state.model.prune_defaults(asset)?;
        if !dropped.is_empty() {
            debug!(asset = %asset, dropped = ?dropped, "reparent dropped default values");
        }
        state.touch("set_parent_class", asset);
        Ok(())
    }

    async fn compile_blueprint(&self, asset: &AssetPath) -> HostResult<CompileOutcome> {
        let mut state = self.state.lock();
        let outcome = state.model.compile(asset)?;
        state.record("compile_blueprint", asset);
        outcome.map_err(|log| HostError::rejected("compile_blueprint", log))
    }

    async fn reconstruct_all_nodes(&self, asset: &AssetPath) -> HostResult<()> {
        self.with_blueprint("reconstruct_all_nodes", asset, |bp| {
            bp.stale_nodes = false;
            Ok(())
        })
    }

    async fn remove_variable(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.with_blueprint("remove_variable", asset, |bp| {
            if bp.variable(name).is_none() {
                return Err(HostError::PropertyNotFound {
                    object: bp.path.to_string(),
                    property: name.to_string(),
                });
            }
            bp.variables.retain(|v| v.name != name);
            bp.defaults.remove(name);
            Ok(())
        })
    }

    async fn remove_function(&self, asset: &AssetPath, name: &str) -> HostResult<()> {
        self.with_blueprint("remove_function", asset, |bp| {
            let before = bp.graphs.len();
            bp.graphs.retain(|g| !(g.kind == GraphKind::Function && g.name == name));
            if bp.graphs.len() == before {
                return Err(HostError::rejected("remove_function", format!("no function graph named {name}")));
            }
            Ok(())
        })
    }

    async fn substitute_variable_references(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<usize> {
        self.with_blueprint("substitute_variable_references", asset, |bp| {
            Ok(bp.graphs.iter_mut().map(|g| substitute(&mut g.nodes, old, new)).sum())
        })
    }

    async fn clear_graph_nodes(&self, asset: &AssetPath, graph: &str) -> HostResult<usize> {
        self.with_blueprint("clear_graph_nodes", asset, |bp| {
            let target = bp
                .graphs
                .iter_mut()
                .find(|g| g.name == graph)
                .ok_or_else(|| HostError::rejected("clear_graph_nodes", format!("no graph named {graph}")))?;
            Ok(std::mem::take(&mut target.nodes).len())
        })
    }

    async fn clear_event_graphs(&self, asset: &AssetPath) -> HostResult<usize> {
        self.with_blueprint("clear_event_graphs", asset, |bp| {
            Ok(bp
                .graphs
                .iter_mut()
                .filter(|g| g.kind == GraphKind::Event)
                .map(|g| std::mem::take(&mut g.nodes).len())
                .sum())
        })
    }

    async fn clear_function_graphs(&self, asset: &AssetPath) -> HostResult<usize> {
        self.with_blueprint("clear_function_graphs", asset, |bp| {
            let before = bp.graphs.len();
            bp.graphs.retain(|g| g.kind == GraphKind::Event);
            Ok(before - bp.graphs.len())
        })
    }

    async fn clear_simple_construction_script(&self, asset: &AssetPath) -> HostResult<usize> {
        self.with_blueprint("clear_simple_construction_script", asset, |bp| {
            Ok(std::mem::take(&mut bp.components).len())
        })
    }

    async fn gc_collect(&self) -> HostResult<()> {
        let mut state = self.state.lock();
        state.gc_runs += 1;
        state.record("gc_collect", "*");
        Ok(())
    }

    async fn list_variables(&self, asset: &AssetPath) -> HostResult<Vec<VariableInfo>> {
        Ok(self.state.lock().model.blueprint(asset)?.variable_infos())
    }

    async fn list_graphs(&self, asset: &AssetPath) -> HostResult<Vec<GraphInfo>> {
        Ok(self.state.lock().model.blueprint(asset)?.graph_infos())
    }

    async fn rename_variable(&self, asset: &AssetPath, old: &str, new: &str) -> HostResult<()> {
        let mut state = self.state.lock();
        let taken = state
            .model
            .class_properties(&asset.generated_class())?
            .iter()
            .any(|p| p.name == new);
        if taken {
            return Err(HostError::rejected("rename_variable", format!("{new} is already declared")));
        }
        let bp = state.model.blueprint_mut(asset)?;
        let variable: &mut Variable = bp
            .variables
            .iter_mut()
            .find(|v| v.name == old)
            .ok_or_else(|| HostError::PropertyNotFound {
                object: asset.to_string(),
                property: old.to_string(),
            })?;
        variable.name = new.to_string();
        if let Some(value) = bp.defaults.remove(old) {
            bp.defaults.insert(new.to_string(), value);
        }
        for graph in &mut bp.graphs {
            substitute(&mut graph.nodes, old, new);
        }
        state.touch("rename_variable", asset);
        Ok(())
    }

    async fn remove_implemented_interfaces(&self, asset: &AssetPath) -> HostResult<usize> {
        self.with_blueprint("remove_implemented_interfaces", asset, |bp| {
            let removed = bp.interfaces.len();
            bp.interfaces.clear();
            // Interface event stubs live in the main event graph
            if removed > 0 {
                if let Some(main) = bp.graphs.iter_mut().find(|g| g.name == MAIN_EVENT_GRAPH) {
                    main.nodes.retain(|n| !matches!(n, GraphNode::Event { name } if name.contains("Interface")));
                }
            }
            Ok(removed)
        })
    }
}

//! Data model of the simulated editor
//!
//! A [`HostModel`] holds a native class catalog, the component classes the
//! editor can construct, and the Blueprint assets themselves. Everything is
//! serde-friendly so an asset store on disk is just these documents.

use crate::adapter::{CompileOutcome, ComponentInfo, GraphInfo, GraphKind, VariableInfo, MAX_CLASS_DEPTH};
use crate::error::{HostError, HostResult};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, PropertyFlags, PropertyKind, Transform};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the main event graph
pub const MAIN_EVENT_GRAPH: &str = "EventGraph";

/// Native classes and component classes known to the editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassCatalog {
    /// Compiled native classes
    #[serde(default)]
    pub native_classes: Vec<NativeClass>,
    /// Component classes
    #[serde(default)]
    pub component_classes: Vec<ComponentClass>,
}

/// A compiled native class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeClass {
    /// Fully qualified name
    pub path: ClassPath,
    /// Parent class, `None` for the root object class
    #[serde(default)]
    pub parent: Option<ClassPath>,
    /// Properties the class declares
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    /// Default-object values differing from the zero value
    #[serde(default)]
    pub defaults: BTreeMap<String, HostValue>,
    /// Callable functions
    #[serde(default)]
    pub functions: Vec<String>,
    /// Default subobject components
    #[serde(default)]
    pub components: Vec<ComponentTemplate>,
}

impl NativeClass {
    /// Bare native class
    #[must_use]
    pub fn new(path: ClassPath, parent: Option<ClassPath>) -> Self {
        Self {
            path,
            parent,
            properties: Vec::new(),
            defaults: BTreeMap::new(),
            functions: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Declare a property
    #[must_use]
    pub fn with_property(mut self, name: &str, kind: PropertyKind) -> Self {
        self.properties.push(PropertyDescriptor::new(name, kind));
        self
    }

    /// Declare a callable function
    #[must_use]
    pub fn with_function(mut self, name: &str) -> Self {
        self.functions.push(name.to_string());
        self
    }

    /// Add a default subobject component
    #[must_use]
    pub fn with_component(mut self, component: ComponentTemplate) -> Self {
        self.components.push(component);
        self
    }
}

/// A component class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentClass {
    /// Class name (`StaticMeshComponent`)
    pub name: String,
    /// Properties of the class
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    /// Whether the editor can add components of this class to a construction script
    #[serde(default = "yes")]
    pub constructible: bool,
}

fn yes() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// A component in a construction script or native class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentTemplate {
    /// Component name
    pub name: String,
    /// Component class name
    pub class: String,
    /// Attach parent
    #[serde(default)]
    pub attach_parent: Option<String>,
    /// Relative transform
    #[serde(default)]
    pub transform: Transform,
    /// Property values differing from the class zero value
    #[serde(default)]
    pub properties: BTreeMap<String, HostValue>,
}

impl ComponentTemplate {
    /// Root component at the identity transform
    #[must_use]
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            attach_parent: None,
            transform: Transform::IDENTITY,
            properties: BTreeMap::new(),
        }
    }
}

/// Per-asset overrides of an inherited component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentOverride {
    /// Overridden transform
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Overridden property values
    #[serde(default)]
    pub properties: BTreeMap<String, HostValue>,
}

/// A user-declared Blueprint variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Declared type
    pub kind: PropertyKind,
    /// Not saved with the default object
    #[serde(default, skip_serializing_if = "is_false")]
    pub transient: bool,
}

/// A node in a graph, reduced to what the migration cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum GraphNode {
    /// Event entry point
    Event {
        /// Event name
        name: String,
    },
    /// Variable read
    GetVariable {
        /// Variable name
        variable: String,
    },
    /// Variable write
    SetVariable {
        /// Variable name
        variable: String,
    },
    /// Function call
    CallFunction {
        /// Function name
        function: String,
    },
    /// Comment box
    Comment {
        /// Text
        text: String,
    },
}

impl GraphNode {
    /// Variable the node reads or writes
    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::GetVariable { variable } | Self::SetVariable { variable } => Some(variable),
            _ => None,
        }
    }
}

/// A graph of a Blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Graph kind
    pub kind: GraphKind,
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
}

impl Graph {
    /// Empty graph
    #[must_use]
    pub fn new(name: &str, kind: GraphKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nodes: Vec::new(),
        }
    }

    /// Append a node
    #[must_use]
    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.nodes.push(node);
        self
    }
}

/// A Blueprint asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Blueprint {
    /// Asset path
    pub path: AssetPath,
    /// Parent of the generated class
    pub parent: ClassPath,
    /// User-declared variables
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Default-object values (own and inherited properties)
    #[serde(default)]
    pub defaults: BTreeMap<String, HostValue>,
    /// Graphs
    #[serde(default)]
    pub graphs: Vec<Graph>,
    /// Construction-script components
    #[serde(default)]
    pub components: Vec<ComponentTemplate>,
    /// Overrides of components inherited from parent classes
    #[serde(default)]
    pub component_overrides: BTreeMap<String, ComponentOverride>,
    /// Implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Call nodes still carry signatures from the previous parent
    #[serde(default, skip_serializing_if = "is_false")]
    pub stale_nodes: bool,
}

impl Blueprint {
    /// Empty Blueprint with an empty main event graph
    #[must_use]
    pub fn new(path: AssetPath, parent: ClassPath) -> Self {
        Self {
            path,
            parent,
            variables: Vec::new(),
            defaults: BTreeMap::new(),
            graphs: vec![Graph::new(MAIN_EVENT_GRAPH, GraphKind::Event)],
            components: Vec::new(),
            component_overrides: BTreeMap::new(),
            interfaces: Vec::new(),
            stale_nodes: false,
        }
    }

    /// Declare a variable with a default value
    #[must_use]
    pub fn with_variable(mut self, name: &str, kind: PropertyKind, default: HostValue) -> Self {
        self.variables.push(Variable {
            name: name.to_string(),
            kind,
            transient: false,
        });
        self.defaults.insert(name.to_string(), default);
        self
    }

    /// Override an inherited default value
    #[must_use]
    pub fn with_default(mut self, name: &str, value: HostValue) -> Self {
        self.defaults.insert(name.to_string(), value);
        self
    }

    /// Add or replace a graph
    #[must_use]
    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graphs.retain(|g| g.name != graph.name);
        self.graphs.push(graph);
        self
    }

    /// Add a construction-script component
    #[must_use]
    pub fn with_component(mut self, component: ComponentTemplate) -> Self {
        self.components.push(component);
        self
    }

    /// Implement an interface
    #[must_use]
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Generated class
    #[inline]
    #[must_use]
    pub fn generated_class(&self) -> ClassPath {
        self.path.generated_class()
    }

    /// Declared variable by name
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Graph summaries
    #[must_use]
    pub fn graph_infos(&self) -> Vec<GraphInfo> {
        self.graphs
            .iter()
            .map(|g| GraphInfo {
                name: g.name.clone(),
                kind: g.kind,
                node_count: g.nodes.len(),
            })
            .collect()
    }

    /// Variable summaries
    #[must_use]
    pub fn variable_infos(&self) -> Vec<VariableInfo> {
        self.variables
            .iter()
            .map(|v| VariableInfo {
                name: v.name.clone(),
                kind: v.kind.clone(),
            })
            .collect()
    }

    fn descriptor(variable: &Variable) -> PropertyDescriptor {
        PropertyDescriptor {
            name: variable.name.clone(),
            kind: variable.kind.clone(),
            flags: PropertyFlags {
                transient: variable.transient,
                derived: false,
                user_declared: true,
            },
        }
    }
}

/// A class as found while walking a hierarchy
#[derive(Debug, Clone, Copy)]
pub enum ClassNode<'a> {
    /// Native class
    Native(&'a NativeClass),
    /// Blueprint generated class
    Blueprint(&'a Blueprint),
}

impl<'a> ClassNode<'a> {
    fn parent(self) -> Option<ClassPath> {
        match self {
            Self::Native(native) => native.parent.clone(),
            Self::Blueprint(bp) => Some(bp.parent.clone()),
        }
    }

    fn own_properties(self) -> Vec<PropertyDescriptor> {
        match self {
            Self::Native(native) => native.properties.clone(),
            Self::Blueprint(bp) => bp.variables.iter().map(Blueprint::descriptor).collect(),
        }
    }

    fn own_default(self, property: &str) -> Option<&'a HostValue> {
        match self {
            Self::Native(native) => native.defaults.get(property),
            Self::Blueprint(bp) => bp.defaults.get(property),
        }
    }

    fn own_functions(self) -> Vec<&'a str> {
        match self {
            Self::Native(native) => native.functions.iter().map(String::as_str).collect(),
            Self::Blueprint(bp) => bp
                .graphs
                .iter()
                .filter(|g| g.kind == GraphKind::Function)
                .map(|g| g.name.as_str())
                .collect(),
        }
    }

    fn own_components(self) -> &'a [ComponentTemplate] {
        match self {
            Self::Native(native) => &native.components,
            Self::Blueprint(bp) => &bp.components,
        }
    }
}

/// Full state of the simulated editor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostModel {
    natives: BTreeMap<ClassPath, NativeClass>,
    component_classes: BTreeMap<String, ComponentClass>,
    blueprints: BTreeMap<AssetPath, Blueprint>,
}

impl HostModel {
    /// Model over a class catalog, without assets
    #[must_use]
    pub fn new(catalog: ClassCatalog) -> Self {
        Self {
            natives: catalog
                .native_classes
                .into_iter()
                .map(|c| (c.path.clone(), c))
                .collect(),
            component_classes: catalog
                .component_classes
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            blueprints: BTreeMap::new(),
        }
    }

    /// Add a native class
    #[must_use]
    pub fn with_native(mut self, class: NativeClass) -> Self {
        self.natives.insert(class.path.clone(), class);
        self
    }

    /// Add a component class
    #[must_use]
    pub fn with_component_class(mut self, class: ComponentClass) -> Self {
        self.component_classes.insert(class.name.clone(), class);
        self
    }

    /// Add a Blueprint asset
    #[must_use]
    pub fn with_blueprint(mut self, blueprint: Blueprint) -> Self {
        self.insert_blueprint(blueprint);
        self
    }

    /// Add or replace a Blueprint asset
    pub fn insert_blueprint(&mut self, blueprint: Blueprint) {
        self.blueprints.insert(blueprint.path.clone(), blueprint);
    }

    /// Every Blueprint, by path
    #[must_use]
    pub fn blueprints(&self) -> &BTreeMap<AssetPath, Blueprint> {
        &self.blueprints
    }

    /// Blueprint at `path`
    ///
    /// # Errors
    /// [`HostError::AssetNotFound`].
    pub fn blueprint(&self, path: &AssetPath) -> HostResult<&Blueprint> {
        self.blueprints
            .get(path)
            .ok_or_else(|| HostError::AssetNotFound(path.clone()))
    }

    /// Mutable Blueprint at `path`
    ///
    /// # Errors
    /// [`HostError::AssetNotFound`].
    pub fn blueprint_mut(&mut self, path: &AssetPath) -> HostResult<&mut Blueprint> {
        self.blueprints
            .get_mut(path)
            .ok_or_else(|| HostError::AssetNotFound(path.clone()))
    }

    /// Component class by name
    #[must_use]
    pub fn component_class(&self, name: &str) -> Option<&ComponentClass> {
        self.component_classes.get(name)
    }

    fn class_node(&self, class: &ClassPath) -> Option<ClassNode<'_>> {
        if let Some(native) = self.natives.get(class) {
            return Some(ClassNode::Native(native));
        }
        let asset = class.owning_asset()?;
        self.blueprints.get(&asset).map(ClassNode::Blueprint)
    }

    /// Whether the class exists
    #[must_use]
    pub fn class_exists(&self, class: &ClassPath) -> bool {
        self.class_node(class).is_some()
    }

    /// Parent of a class
    ///
    /// # Errors
    /// [`HostError::ClassNotFound`].
    pub fn parent_of(&self, class: &ClassPath) -> HostResult<Option<ClassPath>> {
        self.class_node(class)
            .map(|node| node.parent())
            .ok_or_else(|| HostError::ClassNotFound(class.clone()))
    }

    /// `class` and its ancestors, nearest first
    ///
    /// # Errors
    /// [`HostError::ClassNotFound`] for a missing link, [`HostError::Host`]
    /// for a hierarchy that loops.
    pub fn lineage(&self, class: &ClassPath) -> HostResult<Vec<ClassNode<'_>>> {
        let mut out = Vec::new();
        let mut current = Some(class.clone());
        while let Some(c) = current {
            if out.len() > MAX_CLASS_DEPTH {
                return Err(HostError::Host(format!("class hierarchy of {class} does not terminate")));
            }
            let node = self.class_node(&c).ok_or(HostError::ClassNotFound(c))?;
            current = node.parent();
            out.push(node);
        }
        Ok(out)
    }

    /// Properties of a class, root-most declarations first
    ///
    /// # Errors
    /// See [`HostModel::lineage`].
    pub fn class_properties(&self, class: &ClassPath) -> HostResult<Vec<PropertyDescriptor>> {
        let mut props: Vec<PropertyDescriptor> = Vec::new();
        for node in self.lineage(class)?.iter().rev() {
            for descriptor in node.own_properties() {
                match props.iter_mut().find(|p| p.name == descriptor.name) {
                    Some(existing) => *existing = descriptor,
                    None => props.push(descriptor),
                }
            }
        }
        Ok(props)
    }

    /// Descriptor of one property of a class
    ///
    /// # Errors
    /// [`HostError::PropertyNotFound`] or a lineage error.
    pub fn class_property(&self, class: &ClassPath, property: &str) -> HostResult<PropertyDescriptor> {
        self.class_properties(class)?
            .into_iter()
            .find(|p| p.name == property)
            .ok_or_else(|| HostError::PropertyNotFound {
                object: format!("Default__{}", class.short_name()),
                property: property.to_string(),
            })
    }

    /// Functions callable on a class
    ///
    /// # Errors
    /// See [`HostModel::lineage`].
    pub fn class_functions(&self, class: &ClassPath) -> HostResult<BTreeSet<String>> {
        Ok(self
            .lineage(class)?
            .into_iter()
            .flat_map(ClassNode::own_functions)
            .map(str::to_string)
            .collect())
    }

    /// Default-object value of a property
    ///
    /// # Errors
    /// [`HostError::PropertyNotFound`] or a lineage error.
    pub fn default_value(&self, class: &ClassPath, property: &str) -> HostResult<HostValue> {
        let descriptor = self.class_property(class, property)?;
        let inherited = self
            .lineage(class)?
            .into_iter()
            .find_map(|node| node.own_default(property).cloned());
        Ok(inherited
            .filter(|v| descriptor.kind.accepts(v))
            .unwrap_or_else(|| descriptor.kind.zero_value()))
    }

    /// Component hierarchy of an asset, inherited components first
    ///
    /// # Errors
    /// [`HostError::AssetNotFound`] or a lineage error.
    pub fn component_hierarchy(&self, asset: &AssetPath) -> HostResult<Vec<ComponentInfo>> {
        let bp = self.blueprint(asset)?;
        let mut out = Vec::new();
        for node in self.lineage(&bp.parent)?.iter().rev() {
            for template in node.own_components() {
                let transform = bp
                    .component_overrides
                    .get(&template.name)
                    .and_then(|o| o.transform)
                    .unwrap_or(template.transform);
                out.push(ComponentInfo {
                    name: template.name.clone(),
                    class: template.class.clone(),
                    attach_parent: template.attach_parent.clone(),
                    transform,
                    inherited: true,
                });
            }
        }
        out.extend(bp.components.iter().map(|c| ComponentInfo {
            name: c.name.clone(),
            class: c.class.clone(),
            attach_parent: c.attach_parent.clone(),
            transform: c.transform,
            inherited: false,
        }));
        Ok(out)
    }

    /// Template of a component visible on an asset and whether it is inherited
    ///
    /// # Errors
    /// [`HostError::ComponentNotFound`] or a lineage error.
    pub fn component(&self, asset: &AssetPath, name: &str) -> HostResult<(ComponentTemplate, bool)> {
        let bp = self.blueprint(asset)?;
        if let Some(own) = bp.components.iter().find(|c| c.name == name) {
            return Ok((own.clone(), false));
        }
        self.lineage(&bp.parent)?
            .into_iter()
            .find_map(|node| node.own_components().iter().find(|c| c.name == name))
            .map(|template| (template.clone(), true))
            .ok_or_else(|| HostError::ComponentNotFound {
                asset: asset.clone(),
                component: name.to_string(),
            })
    }

    /// Properties of a component class; unknown classes have none
    #[must_use]
    pub fn component_properties(&self, class: &str) -> Vec<PropertyDescriptor> {
        self.component_classes
            .get(class)
            .map(|c| c.properties.clone())
            .unwrap_or_default()
    }

    /// Current value of a component property
    ///
    /// # Errors
    /// [`HostError::ComponentNotFound`] or [`HostError::PropertyNotFound`].
    pub fn component_value(&self, asset: &AssetPath, name: &str, property: &str) -> HostResult<HostValue> {
        let (template, inherited) = self.component(asset, name)?;
        let descriptor = self
            .component_properties(&template.class)
            .into_iter()
            .find(|p| p.name == property)
            .ok_or_else(|| HostError::PropertyNotFound {
                object: format!("{}:{name}", asset.leaf()),
                property: property.to_string(),
            })?;
        let overridden = if inherited {
            self.blueprint(asset)?
                .component_overrides
                .get(name)
                .and_then(|o| o.properties.get(property))
                .cloned()
        } else {
            None
        };
        Ok(overridden
            .or_else(|| template.properties.get(property).cloned())
            .unwrap_or_else(|| descriptor.kind.zero_value()))
    }

    /// Drop default values the asset's class no longer declares (or no
    /// longer accepts) and overrides of components it no longer inherits
    ///
    /// # Errors
    /// A lineage error.
    pub fn prune_defaults(&mut self, asset: &AssetPath) -> HostResult<Vec<String>> {
        let class = asset.generated_class();
        let props = self.class_properties(&class)?;
        let inherited: BTreeSet<String> = self
            .component_hierarchy(asset)?
            .into_iter()
            .filter(|c| c.inherited)
            .map(|c| c.name)
            .collect();

        let bp = self.blueprint_mut(asset)?;
        let mut dropped = Vec::new();
        bp.defaults.retain(|name, value| {
            let keep = props.iter().any(|p| p.name == *name && p.kind.accepts(value));
            if !keep {
                dropped.push(name.clone());
            }
            keep
        });
        bp.component_overrides.retain(|name, _| inherited.contains(name));
        Ok(dropped)
    }

    /// Compile an asset
    ///
    /// Fails on nodes that reference variables the class no longer declares,
    /// on variables that shadow an inherited property, and on call nodes
    /// whose signatures went stale with a reparent. Calls to functions that
    /// no longer exist are warnings.
    ///
    /// The inner result carries the compiler log when there are errors.
    ///
    /// # Errors
    /// Asset or lineage lookup errors.
    pub fn compile(&self, asset: &AssetPath) -> HostResult<Result<CompileOutcome, String>> {
        let bp = self.blueprint(asset)?;
        if !self.class_exists(&bp.parent) {
            return Ok(Err(format!("parent class {} not found", bp.parent)));
        }
        let inherited = self.class_properties(&bp.parent)?;
        let visible = self.class_properties(&bp.generated_class())?;
        let functions = self.class_functions(&bp.generated_class())?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for variable in &bp.variables {
            if inherited.iter().any(|p| p.name == variable.name) {
                errors.push(format!(
                    "variable `{}` shadows a property inherited from {}",
                    variable.name, bp.parent
                ));
            }
        }

        for graph in &bp.graphs {
            for node in &graph.nodes {
                if let Some(variable) = node.variable() {
                    if !visible.iter().any(|p| p.name == variable) {
                        errors.push(format!("`{}` references unknown variable `{variable}`", graph.name));
                    }
                }
                if let GraphNode::CallFunction { function } = node {
                    if bp.stale_nodes {
                        errors.push(format!("`{}` has a stale call signature for `{function}`", graph.name));
                    } else if !functions.contains(function) {
                        warnings.push(format!("`{}` calls missing function `{function}`", graph.name));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Ok(CompileOutcome { warnings }))
        } else {
            Ok(Err(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(path: &str) -> ClassPath {
        ClassPath::parse(path).unwrap()
    }

    fn asset(path: &str) -> AssetPath {
        AssetPath::parse(path).unwrap()
    }

    fn model() -> HostModel {
        HostModel::default()
            .with_native(NativeClass::new(class("/Script/CoreUObject.Object"), None))
            .with_native(
                NativeClass::new(class("/Script/Engine.Actor"), Some(class("/Script/CoreUObject.Object")))
                    .with_property("bHidden", PropertyKind::Bool)
                    .with_function("K2_DestroyActor"),
            )
            .with_native(
                NativeClass::new(class("/Script/Game.DoorBase"), Some(class("/Script/Engine.Actor")))
                    .with_property("OpenAngle", PropertyKind::Float),
            )
            .with_blueprint(
                Blueprint::new(asset("/Game/B_Door"), class("/Script/Engine.Actor"))
                    .with_variable("OpenAngle", PropertyKind::Float, HostValue::Float(90.0))
                    .with_graph(
                        Graph::new(MAIN_EVENT_GRAPH, GraphKind::Event)
                            .with_node(GraphNode::GetVariable {
                                variable: "OpenAngle".into(),
                            })
                            .with_node(GraphNode::CallFunction {
                                function: "K2_DestroyActor".into(),
                            }),
                    ),
            )
    }

    #[test]
    fn properties_include_inherited_declarations() {
        let model = model();
        let props = model.class_properties(&class("/Game/B_Door.B_Door_C")).unwrap();
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bHidden", "OpenAngle"]);
        assert!(props[1].flags.user_declared);
    }

    #[test]
    fn default_value_falls_back_to_zero() {
        let model = model();
        let door = class("/Game/B_Door.B_Door_C");
        assert_eq!(model.default_value(&door, "OpenAngle").unwrap(), HostValue::Float(90.0));
        assert_eq!(model.default_value(&door, "bHidden").unwrap(), HostValue::Bool(false));
        assert!(model.default_value(&door, "Nope").is_err());
    }

    #[test]
    fn shadowing_variable_fails_compile() {
        let mut model = model();
        let door = asset("/Game/B_Door");
        assert!(model.compile(&door).unwrap().is_ok());
        model.blueprint_mut(&door).unwrap().parent = class("/Script/Game.DoorBase");
        let log = model.compile(&door).unwrap().unwrap_err();
        assert!(log.contains("shadows"), "{log}");
    }

    #[test]
    fn dangling_variable_reference_fails_compile() {
        let mut model = model();
        let door = asset("/Game/B_Door");
        model.blueprint_mut(&door).unwrap().variables.clear();
        let log = model.compile(&door).unwrap().unwrap_err();
        assert!(log.contains("unknown variable `OpenAngle`"), "{log}");
    }

    #[test]
    fn stale_calls_fail_and_missing_calls_warn() {
        let mut model = model();
        let door = asset("/Game/B_Door");
        model.blueprint_mut(&door).unwrap().stale_nodes = true;
        assert!(model.compile(&door).unwrap().is_err());

        let bp = model.blueprint_mut(&door).unwrap();
        bp.stale_nodes = false;
        bp.parent = class("/Script/CoreUObject.Object");
        bp.graphs[0].nodes.retain(|n| n.variable().is_none());
        let outcome = model.compile(&door).unwrap().unwrap();
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn prune_drops_values_the_class_lost() {
        let mut model = model();
        let door = asset("/Game/B_Door");
        model
            .blueprint_mut(&door)
            .unwrap()
            .defaults
            .insert("bHidden".into(), HostValue::Bool(true));
        let bp = model.blueprint_mut(&door).unwrap();
        bp.parent = class("/Script/CoreUObject.Object");
        let dropped = model.prune_defaults(&door).unwrap();
        assert_eq!(dropped, vec!["bHidden".to_string()]);
    }
}

//! Testing utilities for the BPM workspace
//!
//! Shared fixtures (a small class catalog and a few Blueprints) and
//! [`FaultyHost`], an adapter wrapper that injects host failures.

#![allow(missing_docs)]

mod faulty;

pub use faulty::{Fault, FaultyHost};

use bpm_host::{
    Blueprint, ClassCatalog, ComponentClass, ComponentTemplate, Graph, GraphKind, GraphNode, HostModel,
    InMemoryHost, NativeClass,
};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, PropertyKind, Transform};
use bpm_plan::{MigrationPlan, PlanEntry};
use std::sync::Arc;

pub const OBJECT: &str = "/Script/CoreUObject.Object";
pub const ACTOR: &str = "/Script/Engine.Actor";
pub const NP_DOOR: &str = "/Script/Game.NP_Door";
pub const NP_SWITCH: &str = "/Script/Game.NP_Switch";
pub const NP_BASE: &str = "/Script/Game.NP_Base";

pub const DOOR: &str = "/Game/Doors/B_Door";
pub const SWITCH: &str = "/Game/Switches/B_Switch";
pub const PARENT: &str = "/Game/Base/B_Parent";
pub const CHILD: &str = "/Game/Base/B_Child";

pub fn asset(path: &str) -> AssetPath {
    AssetPath::parse(path).unwrap()
}

pub fn class(path: &str) -> ClassPath {
    ClassPath::parse(path).unwrap()
}

pub fn scene_component() -> ComponentClass {
    ComponentClass {
        name: "SceneComponent".into(),
        properties: vec![PropertyDescriptor::new("Visible", PropertyKind::Bool)],
        constructible: true,
    }
}

pub fn mesh_component() -> ComponentClass {
    ComponentClass {
        name: "StaticMeshComponent".into(),
        properties: vec![
            PropertyDescriptor::new("StaticMesh", PropertyKind::soft_object()),
            PropertyDescriptor::new("CastShadow", PropertyKind::Bool),
            PropertyDescriptor::new("LightmapRes", PropertyKind::Int),
        ],
        constructible: true,
    }
}

/// A component class only native code can create
pub fn legacy_component() -> ComponentClass {
    ComponentClass {
        name: "LegacyWidgetComponent".into(),
        properties: vec![PropertyDescriptor::new("Widget", PropertyKind::String)],
        constructible: false,
    }
}

/// Object -> Actor -> { NP_Door, NP_Switch, NP_Base }
pub fn catalog() -> ClassCatalog {
    let mut actor = NativeClass::new(class(ACTOR), Some(class(OBJECT)))
        .with_property("bHidden", PropertyKind::Bool)
        .with_function("K2_DestroyActor");
    actor
        .properties
        .push(PropertyDescriptor::new("ActorTick", PropertyKind::Float).transient());
    let door = NativeClass::new(class(NP_DOOR), Some(class(ACTOR)))
        .with_property("Speed", PropertyKind::Float)
        .with_property("Label", PropertyKind::String)
        .with_property("Icon", PropertyKind::object())
        .with_function("Open");
    let switch = NativeClass::new(class(NP_SWITCH), Some(class(ACTOR))).with_function("Toggle");
    let base = NativeClass::new(class(NP_BASE), Some(class(ACTOR)))
        .with_property("Health", PropertyKind::Int)
        .with_component(ComponentTemplate::new("Collision", "SceneComponent"));
    ClassCatalog {
        native_classes: vec![NativeClass::new(class(OBJECT), None), actor, door, switch, base],
        component_classes: vec![scene_component(), mesh_component(), legacy_component()],
    }
}

/// A door Blueprint with variables, graphs and two components
pub fn door_blueprint() -> Blueprint {
    let mut mesh = ComponentTemplate::new("Mesh", "StaticMeshComponent");
    mesh.attach_parent = Some("Root".into());
    mesh.transform = Transform::from_location([0.0, 0.0, 50.0]);
    mesh.properties.insert("CastShadow".into(), HostValue::Bool(true));
    mesh.properties
        .insert("StaticMesh".into(), HostValue::SoftObject(Some("/Game/Meshes/SM_Door.SM_Door".into())));

    Blueprint::new(asset(DOOR), class(ACTOR))
        .with_variable("Speed", PropertyKind::Float, HostValue::Float(2.5))
        .with_variable("Label", PropertyKind::String, HostValue::Str("Front".into()))
        .with_default("bHidden", HostValue::Bool(true))
        .with_graph(
            Graph::new(bpm_host::MAIN_EVENT_GRAPH, GraphKind::Event)
                .with_node(GraphNode::Event { name: "BeginPlay".into() })
                .with_node(GraphNode::GetVariable { variable: "Speed".into() })
                .with_node(GraphNode::CallFunction { function: "K2_DestroyActor".into() }),
        )
        .with_graph(
            Graph::new("OpenDoor", GraphKind::Function)
                .with_node(GraphNode::SetVariable { variable: "Label".into() }),
        )
        .with_component(ComponentTemplate::new("Root", "SceneComponent"))
        .with_component(mesh)
        .with_interface("BPI_Interactable")
}

/// A switch Blueprint whose `OldVar` is used by every graph
pub fn switch_blueprint() -> Blueprint {
    Blueprint::new(asset(SWITCH), class(ACTOR))
        .with_variable("OldVar", PropertyKind::Int, HostValue::Int(7))
        .with_graph(
            Graph::new(bpm_host::MAIN_EVENT_GRAPH, GraphKind::Event)
                .with_node(GraphNode::Event { name: "BeginPlay".into() })
                .with_node(GraphNode::GetVariable { variable: "OldVar".into() }),
        )
        .with_graph(
            Graph::new("Flip", GraphKind::Function)
                .with_node(GraphNode::SetVariable { variable: "OldVar".into() })
                .with_node(GraphNode::CallFunction { function: "K2_DestroyActor".into() }),
        )
}

pub fn parent_blueprint() -> Blueprint {
    Blueprint::new(asset(PARENT), class(ACTOR)).with_variable("Armor", PropertyKind::Int, HostValue::Int(3))
}

pub fn child_blueprint() -> Blueprint {
    Blueprint::new(asset(CHILD), class(ACTOR)).with_variable("Loot", PropertyKind::Name, HostValue::Name("Gold".into()))
}

/// Catalog plus every fixture Blueprint
pub fn model() -> HostModel {
    HostModel::new(catalog())
        .with_blueprint(door_blueprint())
        .with_blueprint(switch_blueprint())
        .with_blueprint(parent_blueprint())
        .with_blueprint(child_blueprint())
}

pub fn host() -> Arc<InMemoryHost> {
    Arc::new(InMemoryHost::new(model()))
}

pub fn plan(entries: Vec<PlanEntry>) -> Arc<MigrationPlan> {
    Arc::new(MigrationPlan::from_entries(entries).unwrap())
}

pub fn entry(path: &str, target: &str) -> PlanEntry {
    PlanEntry::new(asset(path), class(target))
}

//! Adapter behavior of the simulated editor

use bpm_host::{
    parent_chain, Blueprint, ComponentClass, ComponentTemplate, Graph, GraphKind, GraphNode, HostAdapter, HostError,
    HostModel, InMemoryHost, NativeClass, ObjectRef, ReadOnlyHost, MAIN_EVENT_GRAPH,
};
use bpm_model::{AssetPath, ClassPath, HostValue, PropertyDescriptor, PropertyKind, Transform};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn class(path: &str) -> ClassPath {
    ClassPath::parse(path).unwrap()
}

fn asset(path: &str) -> AssetPath {
    AssetPath::parse(path).unwrap()
}

fn host() -> InMemoryHost {
    let model = HostModel::default()
        .with_native(NativeClass::new(class("/Script/Engine.Actor"), None).with_function("K2_DestroyActor"))
        .with_native(
            NativeClass::new(class("/Script/Game.NP_Door"), Some(class("/Script/Engine.Actor")))
                .with_property("OpenAngle", PropertyKind::Float)
                .with_component(ComponentTemplate::new("Frame", "StaticMeshComponent")),
        )
        .with_component_class(ComponentClass {
            name: "StaticMeshComponent".into(),
            properties: vec![PropertyDescriptor::new("StaticMesh", PropertyKind::object())],
            constructible: true,
        })
        .with_component_class(ComponentClass {
            name: "ChildActorComponent".into(),
            properties: Vec::new(),
            constructible: false,
        })
        .with_blueprint(
            Blueprint::new(asset("/Game/B_Door"), class("/Script/Engine.Actor"))
                .with_variable("bOpen", PropertyKind::Bool, HostValue::Bool(true))
                .with_variable("OpenAngle", PropertyKind::Float, HostValue::Float(75.0))
                .with_graph(
                    Graph::new(MAIN_EVENT_GRAPH, GraphKind::Event)
                        .with_node(GraphNode::GetVariable { variable: "bOpen".into() })
                        .with_node(GraphNode::CallFunction {
                            function: "K2_DestroyActor".into(),
                        }),
                )
                .with_graph(Graph::new("Toggle", GraphKind::Function))
                .with_component(ComponentTemplate::new("Mesh", "StaticMeshComponent"))
                .with_interface("BPI_Interactable"),
        );
    InMemoryHost::new(model)
}

#[tokio::test]
async fn reparent_leaves_calls_stale_until_reconstructed() {
    let host = host();
    let door = asset("/Game/B_Door");
    host.remove_variable(&door, "OpenAngle").await.unwrap();
    host.set_parent_class(&door, &class("/Script/Game.NP_Door")).await.unwrap();

    let err = host.compile_blueprint(&door).await.unwrap_err();
    assert!(matches!(err, HostError::Rejected { op: "compile_blueprint", .. }));

    host.reconstruct_all_nodes(&door).await.unwrap();
    let outcome = host.compile_blueprint(&door).await.unwrap();
    assert!(outcome.is_clean());

    let chain = parent_chain(&host, &door.generated_class()).await.unwrap();
    assert_eq!(chain, vec![class("/Script/Game.NP_Door"), class("/Script/Engine.Actor")]);
}

#[tokio::test]
async fn reparent_onto_descendant_is_rejected() {
    let model = host().model().with_blueprint(Blueprint::new(asset("/Game/B_Child"), class("/Game/B_Door")));
    let host = InMemoryHost::new(model);
    let err = host
        .set_parent_class(&asset("/Game/B_Door"), &class("/Game/B_Child"))
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Rejected { .. }));
}

#[tokio::test]
async fn default_values_follow_declared_types() {
    let host = host();
    let cdo = host.get_default_object(&class("/Game/B_Door.B_Door_C")).await.unwrap();
    assert_eq!(host.read_property(&cdo, "bOpen").await.unwrap(), HostValue::Bool(true));

    let err = host
        .write_property(&cdo, "bOpen", HostValue::Int(1))
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Rejected { op: "write_property", .. }));

    host.write_property(&cdo, "bOpen", HostValue::Bool(false)).await.unwrap();
    assert_eq!(host.read_property(&cdo, "bOpen").await.unwrap(), HostValue::Bool(false));
    assert_eq!(host.dirty_assets(), vec![asset("/Game/B_Door")]);
}

#[tokio::test]
async fn rename_moves_declaration_value_and_references() {
    let host = host();
    let door = asset("/Game/B_Door");
    host.rename_variable(&door, "bOpen", "bIsOpen").await.unwrap();
    let names: Vec<_> = host
        .list_variables(&door)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, ["bIsOpen", "OpenAngle"]);
    let cdo = ObjectRef::DefaultObject(door.generated_class());
    assert_eq!(host.read_property(&cdo, "bIsOpen").await.unwrap(), HostValue::Bool(true));
    assert!(host.compile_blueprint(&door).await.is_ok());

    let err = host.rename_variable(&door, "bIsOpen", "OpenAngle").await.unwrap_err();
    assert!(matches!(err, HostError::Rejected { .. }));
}

#[tokio::test]
async fn inherited_components_take_overrides() {
    let host = host();
    let door = asset("/Game/B_Door");
    host.clear_simple_construction_script(&door).await.unwrap();
    host.remove_variable(&door, "OpenAngle").await.unwrap();
    host.set_parent_class(&door, &class("/Script/Game.NP_Door")).await.unwrap();

    let hierarchy = host.get_component_hierarchy(&door).await.unwrap();
    assert_eq!(hierarchy.len(), 1);
    assert!(hierarchy[0].inherited);

    let moved = Transform::from_location([0.0, 0.0, 10.0]);
    host.set_component_transform(&door, "Frame", moved).await.unwrap();
    let frame = ObjectRef::Component {
        asset: door.clone(),
        name: "Frame".into(),
    };
    host.write_property(&frame, "StaticMesh", HostValue::Object(Some("/Game/SM_Frame.SM_Frame".into())))
        .await
        .unwrap();
    let hierarchy = host.get_component_hierarchy(&door).await.unwrap();
    assert_eq!(hierarchy[0].transform, moved);
    assert_eq!(
        host.read_property(&frame, "StaticMesh").await.unwrap(),
        HostValue::Object(Some("/Game/SM_Frame.SM_Frame".into()))
    );
    assert!(matches!(
        host.remove_component(&door, "Frame").await,
        Err(HostError::ComponentNotFound { .. })
    ));
}

#[tokio::test]
async fn unconstructible_component_is_unsupported() {
    let host = host();
    let err = host
        .add_component(&asset("/Game/B_Door"), "Spawner", "ChildActorComponent", None)
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Unsupported(_)));
}

#[tokio::test]
async fn clears_compose() {
    let host = host();
    let door = asset("/Game/B_Door");
    assert_eq!(host.clear_function_graphs(&door).await.unwrap(), 1);
    assert_eq!(host.clear_event_graphs(&door).await.unwrap(), 2);
    assert_eq!(host.remove_implemented_interfaces(&door).await.unwrap(), 1);
    let graphs = host.list_graphs(&door).await.unwrap();
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs[0].node_count, 0);
}

#[tokio::test]
async fn read_only_guard_refuses_mutation() {
    let inner = Arc::new(host());
    let guard = ReadOnlyHost::new(inner.clone());
    let door = asset("/Game/B_Door");
    assert!(guard.load_asset(&door).await.is_ok());
    assert!(matches!(
        guard.save_asset(&door).await,
        Err(HostError::ReadOnly("save_asset"))
    ));
    assert!(matches!(
        guard.set_parent_class(&door, &class("/Script/Game.NP_Door")).await,
        Err(HostError::ReadOnly(_))
    ));
    assert!(inner.journal().is_empty());
}

#[tokio::test]
async fn missing_asset_is_not_found() {
    let host = host();
    let err = host.load_asset(&asset("/Game/Missing")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn store_backed_host_writes_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = bpm_host::AssetStore::new(dir.path());
    store
        .write_catalog(&bpm_host::ClassCatalog {
            native_classes: vec![NativeClass::new(class("/Script/Engine.Actor"), None)],
            component_classes: Vec::new(),
        })
        .unwrap();
    let door = asset("/Game/Doors/B_Door");
    store
        .write_blueprint(
            &Blueprint::new(door.clone(), class("/Script/Engine.Actor")).with_variable(
                "Speed",
                PropertyKind::Float,
                HostValue::Float(1.0),
            ),
        )
        .unwrap();

    let host = InMemoryHost::open(dir.path()).unwrap();
    let cdo = ObjectRef::DefaultObject(door.generated_class());
    host.write_property(&cdo, "Speed", HostValue::Float(4.0)).await.unwrap();

    // Not on disk until saved
    let reopened = InMemoryHost::open(dir.path()).unwrap();
    assert_eq!(reopened.read_property(&cdo, "Speed").await.unwrap(), HostValue::Float(1.0));

    host.save_asset(&door).await.unwrap();
    let reopened = InMemoryHost::open(dir.path()).unwrap();
    assert_eq!(reopened.read_property(&cdo, "Speed").await.unwrap(), HostValue::Float(4.0));
}

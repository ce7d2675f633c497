//! End-to-end runs of extract, migrate and apply over the fixture host

use bpm_host::{is_ancestor, parent_chain, GraphNode, HostAdapter, HostModel, InMemoryHost};
use bpm_model::{HostValue, PropertyKind, Transform};
use bpm_pipeline::{diff, Applier, CacheDocument, Extractor, MigrationEngine, Outcome, Reason, Report, Stage};
use bpm_plan::{ClearPolicy, MigrationPlan, PlanEntry};
use bpm_test_utils::{
    asset, class, door_blueprint, entry, host, model, plan, switch_blueprint, ACTOR, CHILD, DOOR, NP_BASE,
    NP_DOOR, NP_SWITCH, PARENT, SWITCH,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn extract(host: &Arc<InMemoryHost>, plan: &MigrationPlan) -> (CacheDocument, Report) {
    Extractor::new(host.clone()).run(plan).await
}

async fn migrate(host: &Arc<InMemoryHost>, plan: &Arc<MigrationPlan>) -> Report {
    MigrationEngine::new(host.clone(), plan.clone()).run().await
}

async fn apply(host: &Arc<InMemoryHost>, plan: &Arc<MigrationPlan>, cache: CacheDocument) -> Report {
    Applier::new(host.clone(), plan.clone(), cache).run().await
}

fn reasons(issues: &[bpm_pipeline::EntryIssue]) -> Vec<Reason> {
    issues.iter().map(|i| i.reason).collect()
}

#[tokio::test]
async fn door_full_migration_restores_defaults_and_components() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR)]);

    let (cache, extracted) = extract(&host, &plan).await;
    assert!(extracted.is_success(), "{extracted}");
    let record = cache.get(DOOR).and_then(|r| r.extracted()).unwrap();
    assert_eq!(record.parent_class, ACTOR);
    assert_eq!(
        record.properties.keys().map(String::as_str).collect::<Vec<_>>(),
        ["Label", "Speed", "bHidden"]
    );
    assert_eq!(
        record.components.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        ["Root", "Mesh"]
    );

    let migrated = migrate(&host, &plan).await;
    assert_eq!(migrated.succeeded, 1);
    assert!(migrated.failed.is_empty(), "{migrated}");
    assert!(migrated.warnings.is_empty(), "{migrated}");

    let after_migrate = host.model();
    let bp = after_migrate.blueprint(&asset(DOOR)).unwrap();
    assert_eq!(bp.parent, class(NP_DOOR));
    assert!(bp.variables.is_empty());
    assert!(bp.components.is_empty());
    assert!(bp.interfaces.is_empty());
    assert!(bp.graphs.iter().all(|g| g.nodes.is_empty()));

    let applied = apply(&host, &plan, cache).await;
    assert_eq!(applied.succeeded, 1);
    assert_eq!(applied.warned, 0, "{applied}");
    assert_eq!(applied.exit_code(), 0);

    let model = host.model();
    let bp = model.blueprint(&asset(DOOR)).unwrap();
    assert_eq!(bp.defaults.get("Speed"), Some(&HostValue::Float(2.5)));
    assert_eq!(bp.defaults.get("Label"), Some(&HostValue::Str("Front".into())));
    assert_eq!(bp.defaults.get("bHidden"), Some(&HostValue::Bool(true)));

    let mesh = bp.components.iter().find(|c| c.name == "Mesh").unwrap();
    assert_eq!(mesh.class, "StaticMeshComponent");
    assert_eq!(mesh.attach_parent.as_deref(), Some("Root"));
    assert_eq!(mesh.transform, Transform::from_location([0.0, 0.0, 50.0]));
    assert_eq!(mesh.properties.get("CastShadow"), Some(&HostValue::Bool(true)));
    assert_eq!(
        mesh.properties.get("StaticMesh"),
        Some(&HostValue::SoftObject(Some("/Game/Meshes/SM_Door.SM_Door".into())))
    );
    assert!(bp.components.iter().any(|c| c.name == "Root"));
}

#[tokio::test]
async fn parents_migrate_before_children() {
    let host = host();
    let plan = plan(vec![
        entry(CHILD, "/Game/Base/B_Parent.B_Parent_C"),
        entry(PARENT, NP_BASE),
    ]);

    let report = migrate(&host, &plan).await;
    assert!(report.is_success(), "{report}");
    assert_eq!(
        report.entries.iter().map(|e| e.path.as_str()).collect::<Vec<_>>(),
        [PARENT, CHILD]
    );

    let reparents: Vec<String> = host
        .journal()
        .into_iter()
        .filter(|j| j.op == "set_parent_class")
        .map(|j| j.target)
        .collect();
    assert_eq!(reparents, [PARENT, CHILD]);

    let child_class = asset(CHILD).generated_class();
    let chain = parent_chain(host.as_ref(), &child_class).await.unwrap();
    assert_eq!(chain[0], class("/Game/Base/B_Parent.B_Parent_C"));
    assert!(chain.contains(&class(NP_BASE)));
    assert!(is_ancestor(host.as_ref(), &child_class, &class(ACTOR)).await.unwrap());
}

#[tokio::test]
async fn missing_asset_is_reported_by_every_phase() {
    let host = host();
    let missing = "/Game/Gone/B_Gone";
    let plan = plan(vec![entry(missing, NP_DOOR), entry(DOOR, NP_DOOR)]);

    let (cache, extracted) = extract(&host, &plan).await;
    assert_eq!(extracted.exit_code(), 1);
    assert_eq!(extracted.failed.len(), 1);
    assert_eq!(extracted.failed[0].path, missing);
    assert_eq!(extracted.failed[0].state, Stage::Load);
    assert_eq!(extracted.failed[0].reason, Reason::AssetMissing);
    let json: serde_json::Value = serde_json::from_str(&cache.to_json().unwrap()).unwrap();
    assert_eq!(json[missing], serde_json::json!({ "path": missing, "error": "missing" }));

    let migrated = migrate(&host, &plan).await;
    assert_eq!(migrated.failed.len(), 1);
    assert_eq!(migrated.failed[0].path, missing);
    assert_eq!(migrated.failed[0].state, Stage::Load);
    assert_eq!(migrated.failed[0].reason, Reason::LoadFailed);
    assert_eq!(migrated.succeeded, 1);

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.failed.is_empty(), "{applied}");
    assert_eq!(reasons(&applied.warnings), [Reason::AssetMissing]);
    assert_eq!(applied.exit_code(), 0);
}

#[tokio::test]
async fn keep_variables_renames_the_declaration() {
    let host = host();
    let plan = plan(vec![entry(SWITCH, NP_SWITCH)
        .with_policy(ClearPolicy::KeepVariables)
        .with_rename("OldVar", "NewVar")]);

    let (cache, _) = extract(&host, &plan).await;
    let report = migrate(&host, &plan).await;
    assert!(report.is_success(), "{report}");

    let model = host.model();
    let bp = model.blueprint(&asset(SWITCH)).unwrap();
    assert_eq!(bp.parent, class(NP_SWITCH));
    assert_eq!(bp.variable("NewVar").map(|v| &v.kind), Some(&PropertyKind::Int));
    assert!(bp.variable("OldVar").is_none());
    assert!(bp
        .graphs
        .iter()
        .flat_map(|g| &g.nodes)
        .all(|n| n.variable() != Some("OldVar")));

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.warnings.is_empty(), "{applied}");
    assert_eq!(
        host.model().blueprint(&asset(SWITCH)).unwrap().defaults.get("NewVar"),
        Some(&HostValue::Int(7))
    );
}

#[tokio::test]
async fn graphs_only_rename_rewrites_surviving_function_graphs() {
    let host = host();
    let plan = plan(vec![entry(SWITCH, NP_SWITCH)
        .with_policy(ClearPolicy::GraphsOnly)
        .with_rename("OldVar", "NewVar")]);

    let report = migrate(&host, &plan).await;
    assert!(report.is_success(), "{report}");

    let model = host.model();
    let bp = model.blueprint(&asset(SWITCH)).unwrap();
    let flip = bp.graphs.iter().find(|g| g.name == "Flip").unwrap();
    assert!(flip.nodes.contains(&GraphNode::SetVariable {
        variable: "NewVar".into()
    }));
    assert!(!bp.stale_nodes);
}

#[tokio::test]
async fn soft_reference_into_hard_slot_is_a_warning() {
    let gate = "/Game/Doors/B_Gate";
    let blueprint = bpm_host::Blueprint::new(asset(gate), class(ACTOR)).with_variable(
        "Icon",
        PropertyKind::soft_object(),
        HostValue::SoftObject(Some("/Game/UI/T_Gate.T_Gate".into())),
    );
    let host = Arc::new(InMemoryHost::new(model().with_blueprint(blueprint)));
    let plan = plan(vec![entry(gate, NP_DOOR)]);

    let (cache, _) = extract(&host, &plan).await;
    let migrated = migrate(&host, &plan).await;
    assert!(migrated.is_success(), "{migrated}");

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.failed.is_empty(), "{applied}");
    assert!(applied.warned >= 1);
    assert!(reasons(&applied.warnings).contains(&Reason::TypeMismatch));
    assert_eq!(applied.status(gate).map(|s| s.outcome), Some(Outcome::Warned));
    assert!(!host
        .model()
        .blueprint(&asset(gate))
        .unwrap()
        .defaults
        .contains_key("Icon"));
}

#[tokio::test]
async fn second_migration_reports_already_migrated() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR), entry(SWITCH, NP_SWITCH)]);

    let (cache, _) = extract(&host, &plan).await;
    migrate(&host, &plan).await;
    apply(&host, &plan, cache).await;

    let (before, _) = extract(&host, &plan).await;
    let reparents = host.journal().iter().filter(|j| j.op == "set_parent_class").count();

    let again = migrate(&host, &plan).await;
    assert!(again.is_success(), "{again}");
    assert_eq!(again.already_migrated, 2);
    assert!(again.entries.iter().all(|e| e.already_migrated));
    assert_eq!(
        host.journal().iter().filter(|j| j.op == "set_parent_class").count(),
        reparents
    );

    let (after, _) = extract(&host, &plan).await;
    assert_eq!(diff(&before, &after), vec![]);
}

#[tokio::test]
async fn applying_twice_changes_nothing() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR)]);

    let (cache, _) = extract(&host, &plan).await;
    migrate(&host, &plan).await;
    apply(&host, &plan, cache.clone()).await;
    let once: HostModel = host.model();
    let writes = host.journal().len();

    let second = apply(&host, &plan, cache).await;
    assert!(second.is_success(), "{second}");
    assert_eq!(host.model(), once);
    assert!(host.journal()[writes..]
        .iter()
        .all(|j| j.op == "compile_blueprint" || j.op == "save_asset"));
}

#[tokio::test]
async fn extraction_is_deterministic_and_read_only() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR), entry(SWITCH, NP_SWITCH)]);
    let dir = tempfile::tempdir().unwrap();

    let (first, _) = extract(&host, &plan).await;
    let (second, _) = extract(&host, &plan).await;
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let digest_a = bpm_pipeline::write_cache(&first, &a).unwrap();
    let digest_b = bpm_pipeline::write_cache(&second, &b).unwrap();

    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    assert_eq!(digest_a, digest_b);
    assert!(host.journal().is_empty());
    assert_eq!(CacheDocument::read(&a).unwrap(), first);
}

#[tokio::test]
async fn extracted_values_survive_the_serializer() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR)]);
    let (cache, _) = extract(&host, &plan).await;
    let record = cache.get(DOOR).and_then(|r| r.extracted()).unwrap();

    let object = host.get_default_object(&asset(DOOR).generated_class()).await.unwrap();
    for descriptor in host.enumerate_properties(&object).await.unwrap() {
        let Some(value) = record.properties.get(&descriptor.name) else {
            continue;
        };
        let restored = bpm_model::deserialize(value, &descriptor.kind).unwrap();
        assert_eq!(&bpm_model::serialize(&restored, &descriptor), value);
    }
}

#[tokio::test]
async fn component_subset_and_transient_filtering() {
    let host = host();
    let mut door = entry(DOOR, NP_DOOR);
    door.component_properties
        .insert("StaticMeshComponent".into(), vec!["CastShadow".into()]);
    let plan = plan(vec![door]);

    let (cache, _) = extract(&host, &plan).await;
    let record = cache.get(DOOR).and_then(|r| r.extracted()).unwrap();
    let mesh = record.component("Mesh").unwrap();
    assert_eq!(mesh.typed_properties.keys().collect::<Vec<_>>(), ["CastShadow"]);
    assert!(record.component("Root").unwrap().typed_properties.contains_key("Visible"));
    assert!(!record.properties.contains_key("ActorTick"));

    let (everything, _) = Extractor::new(host.clone())
        .with_config(bpm_pipeline::ExtractConfig { skip_transient: false })
        .run(&plan)
        .await;
    let record = everything.get(DOOR).and_then(|r| r.extracted()).unwrap();
    assert!(record.properties.contains_key("ActorTick"));
}

#[tokio::test]
async fn renamed_target_missing_on_new_class() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR)
        .with_policy(ClearPolicy::KeepComponents)
        .with_rename("Speed", "Velocity")]);

    let (cache, _) = extract(&host, &plan).await;
    let migrated = migrate(&host, &plan).await;
    assert!(migrated.is_success(), "{migrated}");

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.failed.is_empty(), "{applied}");
    assert_eq!(reasons(&applied.warnings), [Reason::TargetPropertyMissing]);
    assert!(applied.warnings[0].detail.contains("Velocity"));
    assert_eq!(
        host.model().blueprint(&asset(DOOR)).unwrap().defaults.get("Label"),
        Some(&HostValue::Str("Front".into()))
    );
}

#[tokio::test]
async fn properties_without_counterpart_are_unmapped() {
    let host = host();
    let plan = plan(vec![entry(SWITCH, NP_SWITCH)]);

    let (cache, _) = extract(&host, &plan).await;
    migrate(&host, &plan).await;
    let applied = apply(&host, &plan, cache).await;
    assert_eq!(reasons(&applied.warnings), [Reason::UnmappedProperty]);
    assert!(applied.warnings[0].detail.contains("OldVar"));
}

#[tokio::test]
async fn deleted_variables_are_dropped_silently() {
    let host = host();
    let plan = plan(vec![entry(SWITCH, NP_SWITCH)
        .with_policy(ClearPolicy::KeepVariables)
        .with_deleted_variable("OldVar")]);

    let (cache, _) = extract(&host, &plan).await;
    let migrated = migrate(&host, &plan).await;
    assert!(migrated.is_success(), "{migrated}");
    assert!(host.model().blueprint(&asset(SWITCH)).unwrap().variable("OldVar").is_none());

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.warnings.is_empty(), "{applied}");
}

#[tokio::test]
async fn identity_rename_is_a_no_op() {
    let host = host();
    let plan = plan(vec![entry(SWITCH, NP_SWITCH)
        .with_policy(ClearPolicy::KeepVariables)
        .with_rename("OldVar", "OldVar")]);

    let report = migrate(&host, &plan).await;
    assert!(report.is_success(), "{report}");
    assert!(host
        .journal()
        .iter()
        .all(|j| j.op != "rename_variable" && j.op != "substitute_variable_references"));
    assert!(host.model().blueprint(&asset(SWITCH)).unwrap().variable("OldVar").is_some());
}

#[tokio::test]
async fn kept_components_missing_after_delete_are_warned() {
    let host = host();
    let plan = plan(vec![entry(DOOR, NP_DOOR)
        .with_policy(ClearPolicy::KeepComponents)
        .with_deleted_component("Mesh")]);

    let (cache, _) = extract(&host, &plan).await;
    let migrated = migrate(&host, &plan).await;
    assert!(migrated.is_success(), "{migrated}");

    let applied = apply(&host, &plan, cache).await;
    assert!(applied.failed.is_empty(), "{applied}");
    assert_eq!(reasons(&applied.warnings), [Reason::ComponentMissing]);
    let model = host.model();
    let bp = model.blueprint(&asset(DOOR)).unwrap();
    assert_eq!(bp.components.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["Root"]);
}

#[tokio::test]
async fn unconstructible_component_fails_the_entry() {
    let kiosk = "/Game/Kiosk/B_Kiosk";
    let mut widget = bpm_host::ComponentTemplate::new("Screen", "LegacyWidgetComponent");
    widget
        .properties
        .insert("Widget".into(), HostValue::Str("WBP_Menu".into()));
    let blueprint = bpm_host::Blueprint::new(asset(kiosk), class(ACTOR)).with_component(widget);
    let host = Arc::new(InMemoryHost::new(model().with_blueprint(blueprint)));
    let plan = plan(vec![entry(kiosk, NP_DOOR)]);

    let (cache, _) = extract(&host, &plan).await;
    migrate(&host, &plan).await;
    let applied = apply(&host, &plan, cache).await;

    assert_eq!(applied.failed.len(), 1);
    assert_eq!(applied.failed[0].state, Stage::Restore);
    assert_eq!(applied.failed[0].reason, Reason::ComponentUnconstructible);
    assert_eq!(applied.exit_code(), 1);
}

#[tokio::test]
async fn cache_key_overrides_the_lookup() {
    let host = host();
    let extract_plan = plan(vec![entry(DOOR, NP_DOOR)]);
    let (cache, _) = extract(&host, &extract_plan).await;

    let mut moved = door_blueprint();
    moved.path = asset("/Game/Moved/B_Door");
    let host = Arc::new(InMemoryHost::new(
        HostModel::new(bpm_test_utils::catalog()).with_blueprint(moved),
    ));
    let plan = plan(vec![entry("/Game/Moved/B_Door", NP_DOOR).with_cache_key(DOOR)]);
    migrate(&host, &plan).await;
    let applied = apply(&host, &plan, cache).await;

    assert!(applied.is_success(), "{applied}");
    assert_eq!(
        host.model().blueprint(&asset("/Game/Moved/B_Door")).unwrap().defaults.get("Speed"),
        Some(&HostValue::Float(2.5))
    );
}

#[tokio::test]
async fn empty_plan_produces_empty_reports() {
    let host = host();
    let plan = Arc::new(MigrationPlan::from_entries(Vec::new()).unwrap());

    let (cache, extracted) = extract(&host, &plan).await;
    assert!(cache.is_empty());
    assert_eq!(extracted.total, 0);
    assert_eq!(migrate(&host, &plan).await.total, 0);
    assert_eq!(apply(&host, &plan, cache).await.exit_code(), 0);
    assert!(host.journal().is_empty());
}

#[test]
fn cyclic_plan_is_rejected_before_anything_runs() {
    let a = PlanEntry::new(asset(DOOR), asset(SWITCH).generated_class());
    let b = PlanEntry::new(asset(SWITCH), asset(DOOR).generated_class());
    let err = MigrationPlan::from_entries(vec![a, b]).unwrap_err();
    assert!(matches!(err, bpm_plan::PlanError::CyclicParentDependency { .. }));
    assert!(bpm_pipeline::PipelineError::from(err).is_plan_error());
}

#[tokio::test]
async fn store_backed_run_persists_saved_assets() {
    let dir = tempfile::tempdir().unwrap();
    let store = bpm_host::AssetStore::new(dir.path());
    store.write_catalog(&bpm_test_utils::catalog()).unwrap();
    store.write_blueprint(&door_blueprint()).unwrap();
    store.write_blueprint(&switch_blueprint()).unwrap();

    let host = Arc::new(InMemoryHost::open(dir.path()).unwrap());
    let plan = plan(vec![entry(DOOR, NP_DOOR)]);
    let (cache, _) = extract(&host, &plan).await;
    migrate(&host, &plan).await;
    apply(&host, &plan, cache).await;
    assert!(host.dirty_assets().is_empty());

    let reopened = InMemoryHost::open(dir.path()).unwrap().model();
    let bp = reopened.blueprint(&asset(DOOR)).unwrap();
    assert_eq!(bp.parent, class(NP_DOOR));
    assert_eq!(bp.defaults.get("Speed"), Some(&HostValue::Float(2.5)));
    assert_eq!(
        reopened.blueprint(&asset(SWITCH)).unwrap().parent,
        class(ACTOR)
    );
}

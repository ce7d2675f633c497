//! The destructive pass
//!
//! For every entry, in dependency order:
//!
//! ```text
//! load -> snapshot -> clear -> reparent (+gc, +node refresh) -> rename -> compile -> save
//! ```
//!
//! Entries are processed strictly one after another and every adapter call is
//! awaited before the next is issued. A failing entry is recorded and the run
//! moves on; nothing is rolled back.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::report::{EntryLog, Phase, Recorder, Report};
use crate::state::{validate_transition, EntryState, Reason, Stage};
use bpm_host::{
    is_ancestor, ComponentInfo, GraphInfo, GraphKind, HostAdapter, HostError, HostResult, VariableInfo, MAIN_EVENT_GRAPH,
};
use bpm_model::{AssetPath, ClassPath};
use bpm_plan::{ClearPolicy, MigrationPlan, PlanEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shape of an asset captured before anything is cleared
#[derive(Debug, Clone)]
struct Snapshot {
    generated_class: ClassPath,
    parent_class: ClassPath,
    components: Vec<ComponentInfo>,
    variables: Vec<VariableInfo>,
    graphs: Vec<GraphInfo>,
}

/// Current state of one entry
struct Progress<'a> {
    path: &'a AssetPath,
    state: EntryState,
}

impl<'a> Progress<'a> {
    fn new(path: &'a AssetPath) -> Self {
        Self {
            path,
            state: EntryState::Pending,
        }
    }

    fn enter(&mut self, next: EntryState) -> Result<()> {
        validate_transition(self.state, next)?;
        debug!(path = %self.path, from = ?self.state, to = ?next, "entry advanced");
        self.state = next;
        Ok(())
    }
}

/// Runs the clear, reparent, rename, compile and save sequence over a plan
pub struct MigrationEngine {
    host: Arc<dyn HostAdapter>,
    plan: Arc<MigrationPlan>,
    config: EngineConfig,
}

impl MigrationEngine {
    /// Engine for `plan` over `host`
    #[must_use]
    pub fn new(host: Arc<dyn HostAdapter>, plan: Arc<MigrationPlan>) -> Self {
        Self {
            host,
            plan,
            config: EngineConfig::default(),
        }
    }

    /// Use `config`
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Migrate every entry; the report lists each entry exactly once
    pub async fn run(&self) -> Report {
        info!(entries = self.plan.len(), "migrate started");
        let mut recorder = Recorder::new(Phase::Migrate);

        for entry in self.plan.ordered_entries() {
            let mut log = recorder.entry(entry.path.as_str());
            info!(
                path = %entry.path,
                target = %entry.target_parent,
                policy = %entry.clear_policy,
                "migrating entry"
            );
            let mut progress = Progress::new(&entry.path);
            if let Err(e) = self.migrate_entry(entry, &mut progress, &mut log).await {
                // Only an out-of-order transition ends up here
                log.fail(progress.state.stage(), progress.state.failure_reason(), e.to_string());
            }
            debug!(path = %entry.path, state = ?progress.state, "entry finished");
            recorder.record(log);
        }

        let report = recorder.finish();
        info!(%report, "migrate finished");
        report
    }

    async fn migrate_entry(&self, entry: &PlanEntry, progress: &mut Progress<'_>, log: &mut EntryLog) -> Result<()> {
        let host = self.host.as_ref();
        let path = &entry.path;

        if let Err(e) = host.load_asset(path).await {
            log.fail(Stage::Load, Reason::LoadFailed, e.to_string());
            return Ok(());
        }
        progress.enter(EntryState::Loaded)?;

        let snapshot = match self.snapshot(path).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log.fail(Stage::Snapshot, Reason::SnapshotFailed, e.to_string());
                return Ok(());
            }
        };
        progress.enter(EntryState::Snapshotted)?;

        let already = snapshot.parent_class == entry.target_parent;
        if already {
            info!(path = %path, parent = %snapshot.parent_class, "already parented to target");
            log.mark_already_migrated();
        } else {
            match self.clear(entry, &snapshot).await {
                Ok(()) => progress.enter(EntryState::Cleared)?,
                Err(e) if entry.clear_policy == ClearPolicy::GraphsOnly => {
                    log.warn(Stage::Clear, Reason::ClearFailed, format!("{e}; reparenting anyway"));
                }
                Err(e) => {
                    log.fail(Stage::Clear, Reason::ClearFailed, e.to_string());
                    return Ok(());
                }
            }

            if let Err(e) = self.reparent(path, &entry.target_parent).await {
                log.fail(Stage::Reparent, Reason::ReparentFailed, e.to_string());
                return Ok(());
            }
        }
        progress.enter(EntryState::Reparented)?;

        if !already {
            self.rename(entry, log).await;
            progress.enter(EntryState::Renamed)?;
        }

        match self.compile(path).await {
            Ok(warnings) => {
                for warning in warnings {
                    log.warn(Stage::Compile, Reason::CompileWarnings, warning);
                }
            }
            Err(e) => {
                log.fail(Stage::Compile, Reason::CompileFailed, e.to_string());
                log.flag_for_review();
                return Ok(());
            }
        }
        progress.enter(EntryState::Compiled)?;

        if let Err(e) = host.save_asset(path).await {
            log.fail(Stage::Save, Reason::SaveFailed, e.to_string());
            log.flag_for_review();
            return Ok(());
        }
        progress.enter(EntryState::Saved)?;

        if self.config.gc_after_save {
            if let Err(e) = host.gc_collect().await {
                warn!(path = %path, error = %e, "garbage collection after save failed");
            }
        }
        Ok(())
    }

    async fn snapshot(&self, path: &AssetPath) -> HostResult<Snapshot> {
        let host = self.host.as_ref();
        let generated_class = host.get_generated_class(path).await?;
        let parent_class = host
            .get_parent_class(&generated_class)
            .await?
            .ok_or_else(|| HostError::Host(format!("{generated_class} has no parent class")))?;
        let snapshot = Snapshot {
            components: host.get_component_hierarchy(path).await?,
            variables: host.list_variables(path).await?,
            graphs: host.list_graphs(path).await?,
            generated_class,
            parent_class,
        };
        debug!(
            path = %path,
            class = %snapshot.generated_class,
            parent = %snapshot.parent_class,
            components = snapshot.components.len(),
            variables = snapshot.variables.len(),
            graphs = snapshot.graphs.len(),
            "snapshot taken"
        );
        Ok(snapshot)
    }

    /// Apply the clear policy, then the explicit delete lists
    async fn clear(&self, entry: &PlanEntry, snapshot: &Snapshot) -> HostResult<()> {
        let host = self.host.as_ref();
        let path = &entry.path;
        let policy = entry.clear_policy;
        let mut nodes = 0;
        let mut components = 0;

        if policy == ClearPolicy::GraphsOnly {
            nodes += host.clear_graph_nodes(path, MAIN_EVENT_GRAPH).await?;
        } else {
            nodes += host.clear_event_graphs(path).await?;
            if policy.clears_functions() {
                nodes += host.clear_function_graphs(path).await?;
            }
        }
        if policy.clears_variables() {
            for variable in &snapshot.variables {
                host.remove_variable(path, &variable.name).await?;
            }
        }
        if policy.clears_components() {
            components += host.clear_simple_construction_script(path).await?;
        }

        if !entry.delete_functions.is_empty() {
            let graphs = host.list_graphs(path).await?;
            for function in &entry.delete_functions {
                if graphs.iter().any(|g| g.kind == GraphKind::Function && g.name == *function) {
                    host.remove_function(path, function).await?;
                } else {
                    debug!(path = %path, function = %function, "function already gone");
                }
            }
        }

        if !entry.delete_components.is_empty() {
            let hierarchy = host.get_component_hierarchy(path).await?;
            for name in &entry.delete_components {
                match hierarchy.iter().find(|c| c.name == *name) {
                    Some(c) if c.inherited => {
                        return Err(HostError::rejected(
                            "remove_component",
                            format!("{name} is inherited from {}", snapshot.parent_class),
                        ));
                    }
                    Some(_) => {
                        host.remove_component(path, name).await?;
                        components += 1;
                    }
                    None => debug!(path = %path, component = %name, "component already gone"),
                }
            }
        }

        let interfaces = if entry.keep_interfaces {
            0
        } else {
            host.remove_implemented_interfaces(path).await?
        };

        info!(
            path = %path,
            policy = %policy,
            nodes,
            components,
            interfaces,
            "cleared"
        );
        Ok(())
    }

    /// Set the new parent and make sure the child sees it
    async fn reparent(&self, path: &AssetPath, target: &ClassPath) -> HostResult<()> {
        let host = self.host.as_ref();
        host.set_parent_class(path, target).await?;
        host.gc_collect().await?;

        // Handles from before the reparent are stale; resolve the class again
        let class = host.get_generated_class(path).await?;
        if !is_ancestor(host, &class, target).await? {
            return Err(HostError::rejected(
                "set_parent_class",
                format!("{target} is not an ancestor of {class} after reparenting"),
            ));
        }
        host.reconstruct_all_nodes(path).await?;
        info!(path = %path, parent = %target, "reparented");
        Ok(())
    }

    /// Apply renames, then delete the variables the plan asks for
    ///
    /// Failures are partial: each is recorded as a warning and the rest proceed.
    async fn rename(&self, entry: &PlanEntry, log: &mut EntryLog) {
        let host = self.host.as_ref();
        let path = &entry.path;

        let mut declared = match host.list_variables(path).await {
            Ok(variables) => variables,
            Err(e) => {
                log.warn(Stage::Rename, Reason::RenameFailed, format!("listing variables: {e}"));
                Vec::new()
            }
        };

        let renames: Vec<(&str, &str)> = entry.effective_renames().collect();
        if !renames.is_empty() {
            let visible = match self.class_property_names(path).await {
                Ok(names) => names,
                Err(e) => {
                    log.warn(Stage::Rename, Reason::RenameFailed, format!("listing properties: {e}"));
                    Vec::new()
                }
            };
            for (old, new) in renames {
                let owns_old = declared.iter().any(|v| v.name == old);
                let result = if owns_old && !visible.iter().any(|n| n == new) {
                    host.rename_variable(path, old, new).await.map(|()| {
                        for variable in declared.iter_mut().filter(|v| v.name == old) {
                            new.clone_into(&mut variable.name);
                        }
                        "declaration"
                    })
                } else {
                    host.substitute_variable_references(path, old, new)
                        .await
                        .map(|_| "references")
                };
                match result {
                    Ok(what) => info!(path = %path, old, new, renamed = what, "renamed"),
                    Err(e) => log.warn(Stage::Rename, Reason::RenameFailed, format!("{old} -> {new}: {e}")),
                }
            }
        }

        for name in &entry.delete_variables {
            if !declared.iter().any(|v| v.name == *name) {
                debug!(path = %path, variable = %name, "variable already gone");
                continue;
            }
            match host.remove_variable(path, name).await {
                Ok(()) => info!(path = %path, variable = %name, "variable deleted"),
                Err(e) => log.warn(Stage::Rename, Reason::RenameFailed, format!("deleting {name}: {e}")),
            }
        }
    }

    async fn class_property_names(&self, path: &AssetPath) -> HostResult<Vec<String>> {
        let host = self.host.as_ref();
        let class = host.get_generated_class(path).await?;
        let object = host.get_default_object(&class).await?;
        let properties = host.enumerate_properties(&object).await?;
        Ok(properties.into_iter().map(|p| p.name).collect())
    }

    /// Compile, retrying once after a full node reconstruction
    async fn compile(&self, path: &AssetPath) -> HostResult<Vec<String>> {
        let host = self.host.as_ref();
        let outcome = match host.compile_blueprint(path).await {
            Ok(outcome) => outcome,
            Err(first) => {
                warn!(path = %path, error = %first, "compile failed, reconstructing nodes and retrying");
                host.reconstruct_all_nodes(path).await?;
                host.compile_blueprint(path).await?
            }
        };
        Ok(outcome.warnings)
    }
}

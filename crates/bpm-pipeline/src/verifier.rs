//! Post-migration checks
//!
//! Read-only: confirms each migrated asset loads, has its target parent in
//! its parent chain and exposes the properties the plan expects.

use crate::report::{EntryLog, Phase, Recorder, Report};
use crate::state::{Reason, Stage};
use bpm_host::{is_ancestor, HostAdapter, HostError, ReadOnlyHost};
use bpm_plan::{MigrationPlan, PlanEntry};
use std::sync::Arc;
use tracing::info;

/// Checks migrated assets against the plan
pub struct Verifier {
    host: ReadOnlyHost,
}

impl Verifier {
    /// Verifier over `host`, which is wrapped read-only
    #[must_use]
    pub fn new(host: Arc<dyn HostAdapter>) -> Self {
        Self {
            host: ReadOnlyHost::new(host),
        }
    }

    /// Check every entry of `plan`, in dependency order
    pub async fn run(&self, plan: &MigrationPlan) -> Report {
        info!(entries = plan.len(), "verify started");
        let mut recorder = Recorder::new(Phase::Verify);
        for entry in plan.ordered_entries() {
            let mut log = recorder.entry(entry.path.as_str());
            self.verify_entry(entry, &mut log).await;
            recorder.record(log);
        }
        let report = recorder.finish();
        info!(%report, "verify finished");
        report
    }

    async fn verify_entry(&self, entry: &PlanEntry, log: &mut EntryLog) {
        let host = &self.host;
        let path = &entry.path;

        match host.load_asset(path).await {
            Ok(_) => {}
            Err(HostError::AssetNotFound(_)) => {
                log.fail(Stage::Verify, Reason::AssetMissing, "asset does not exist");
                return;
            }
            Err(e) => {
                log.fail(Stage::Verify, Reason::LoadFailed, e.to_string());
                return;
            }
        }

        let class = match host.get_generated_class(path).await {
            Ok(class) => class,
            Err(e) => {
                log.fail(Stage::Verify, Reason::ReadFailed, e.to_string());
                return;
            }
        };
        match is_ancestor(host, &class, &entry.target_parent).await {
            Ok(true) => {}
            Ok(false) => {
                log.fail(
                    Stage::Verify,
                    Reason::ParentMismatch,
                    format!("{} is not in the parent chain of {class}", entry.target_parent),
                );
                return;
            }
            Err(e) => {
                log.fail(Stage::Verify, Reason::ReadFailed, e.to_string());
                return;
            }
        }

        if !entry.expect_properties.is_empty() {
            let object = match host.get_default_object(&class).await {
                Ok(object) => object,
                Err(e) => {
                    log.fail(Stage::Verify, Reason::ReadFailed, e.to_string());
                    return;
                }
            };
            let mut missing = Vec::new();
            for property in &entry.expect_properties {
                if host.read_property(&object, property).await.is_err() {
                    missing.push(property.as_str());
                }
            }
            if !missing.is_empty() {
                log.fail(
                    Stage::Verify,
                    Reason::ExpectedPropertyMissing,
                    format!("{object} lacks {}", missing.join(", ")),
                );
                return;
            }
        }

        match host.list_variables(path).await {
            Ok(variables) => {
                for (old, new) in entry.effective_renames() {
                    if variables.iter().any(|v| v.name == old) {
                        log.warn(
                            Stage::Verify,
                            Reason::StaleVariable,
                            format!("{old} is still declared next to {new}"),
                        );
                    }
                }
            }
            Err(e) => log.warn(Stage::Verify, Reason::ReadFailed, format!("listing variables: {e}")),
        }
    }
}

//! Online pass: restore cached defaults onto migrated assets
//!
//! Restoration is best effort. A value that cannot be placed is skipped with
//! a warning; only a component the host cannot construct, or a compile or
//! save failure, fails an entry. Values already equal to the cached ones are
//! not rewritten, which makes a second run a no-op.

use crate::cache::{CacheDocument, CacheRecord, ComponentRecord, ExtractedRecord};
use crate::report::{EntryLog, Phase, Recorder, Report};
use crate::state::{Reason, Stage};
use bpm_host::{ComponentInfo, HostAdapter, HostError, ObjectRef};
use bpm_model::{deserialize, PropertyDescriptor, SerializeError, TypedValue};
use bpm_plan::{ClearPolicy, MigrationPlan, PlanEntry};
use std::sync::Arc;
use tracing::{debug, info};

/// Writes cached values back through the adapter
pub struct Applier {
    host: Arc<dyn HostAdapter>,
    plan: Arc<MigrationPlan>,
    cache: CacheDocument,
    cache_sha256: Option<String>,
}

impl Applier {
    /// Applier restoring `cache` for the entries of `plan`
    #[must_use]
    pub fn new(host: Arc<dyn HostAdapter>, plan: Arc<MigrationPlan>, cache: CacheDocument) -> Self {
        Self {
            host,
            plan,
            cache,
            cache_sha256: None,
        }
    }

    /// Record the digest of the cache file in the report
    #[inline]
    #[must_use]
    pub fn with_cache_sha256(mut self, digest: impl Into<String>) -> Self {
        self.cache_sha256 = Some(digest.into());
        self
    }

    /// Restore every entry, in dependency order
    pub async fn run(&self) -> Report {
        info!(entries = self.plan.len(), records = self.cache.len(), "apply started");
        let mut recorder = Recorder::new(Phase::Apply).with_cache_sha256(self.cache_sha256.clone());

        for entry in self.plan.ordered_entries() {
            let mut log = recorder.entry(entry.path.as_str());
            self.apply_entry(entry, &mut log).await;
            recorder.record(log);
        }

        for (key, _) in self.cache.iter() {
            if self.plan.entry_for_cache_key(key).is_none() {
                debug!(key, "cache record not referenced by the plan");
            }
        }

        let report = recorder.finish();
        info!(%report, "apply finished");
        report
    }

    async fn apply_entry(&self, entry: &PlanEntry, log: &mut EntryLog) {
        let host = self.host.as_ref();
        let path = &entry.path;

        match host.load_asset(path).await {
            Ok(_) => {}
            Err(HostError::AssetNotFound(_)) => {
                log.warn(Stage::Load, Reason::AssetMissing, "asset does not exist");
                return;
            }
            Err(e) => {
                log.fail(Stage::Load, Reason::LoadFailed, e.to_string());
                return;
            }
        }

        let record = match self.cache.get(entry.cache_key()) {
            Some(CacheRecord::Extracted(record)) => record,
            Some(CacheRecord::Missing { error, .. }) => {
                log.warn(
                    Stage::Restore,
                    Reason::NoCachedRecord,
                    format!("cache holds `{error}` for {}", entry.cache_key()),
                );
                return;
            }
            None => {
                log.warn(
                    Stage::Restore,
                    Reason::NoCachedRecord,
                    format!("no cache record under {}", entry.cache_key()),
                );
                return;
            }
        };

        self.restore_defaults(entry, record, log).await;
        self.restore_components(entry, record, log).await;
        if log.has_failed() {
            return;
        }

        match host.compile_blueprint(path).await {
            Ok(outcome) => {
                for warning in outcome.warnings {
                    log.warn(Stage::Compile, Reason::CompileWarnings, warning);
                }
            }
            Err(e) => {
                log.fail(Stage::Compile, Reason::CompileFailed, e.to_string());
                return;
            }
        }
        if let Err(e) = host.save_asset(path).await {
            log.fail(Stage::Save, Reason::SaveFailed, e.to_string());
        }
    }

    async fn restore_defaults(&self, entry: &PlanEntry, record: &ExtractedRecord, log: &mut EntryLog) {
        let host = self.host.as_ref();
        let object = match host.get_generated_class(&entry.path).await {
            Ok(class) => match host.get_default_object(&class).await {
                Ok(object) => object,
                Err(e) => {
                    log.warn(Stage::Restore, Reason::ReadFailed, e.to_string());
                    return;
                }
            },
            Err(e) => {
                log.warn(Stage::Restore, Reason::ReadFailed, e.to_string());
                return;
            }
        };
        let descriptors = match host.enumerate_properties(&object).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                log.warn(Stage::Restore, Reason::ReadFailed, format!("{object}: {e}"));
                return;
            }
        };

        let mut written = 0;
        for (name, value) in &record.properties {
            if entry.deletes_variable(name) {
                debug!(path = %entry.path, property = %name, "property deleted by plan");
                continue;
            }
            let target = entry.renamed(name);
            let Some(descriptor) = descriptors.iter().find(|d| d.name == target) else {
                if target == name.as_str() {
                    log.warn(
                        Stage::Restore,
                        Reason::UnmappedProperty,
                        format!("{name} has no counterpart on {object}"),
                    );
                } else {
                    log.warn(
                        Stage::Restore,
                        Reason::TargetPropertyMissing,
                        format!("{name} renamed to {target}, which {object} does not declare"),
                    );
                }
                continue;
            };
            if self.restore(&object, descriptor, value, log).await {
                written += 1;
            }
        }
        info!(path = %entry.path, written, cached = record.properties.len(), "defaults restored");
    }

    async fn restore_components(&self, entry: &PlanEntry, record: &ExtractedRecord, log: &mut EntryLog) {
        if record.components.is_empty() {
            return;
        }
        let host = self.host.as_ref();
        let path = &entry.path;
        let mut live = match host.get_component_hierarchy(path).await {
            Ok(hierarchy) => hierarchy,
            Err(e) => {
                log.warn(Stage::Restore, Reason::ReadFailed, format!("component hierarchy: {e}"));
                return;
            }
        };

        for cached in &record.components {
            let existing = live.iter().find(|c| c.name == cached.name).map(|c| c.transform);
            let transform = match existing {
                Some(transform) => transform,
                None if entry.clear_policy == ClearPolicy::Full => {
                    match self.recreate(entry, cached, log).await {
                        Some(component) => {
                            let transform = component.transform;
                            live.push(component);
                            transform
                        }
                        None => continue,
                    }
                }
                None => {
                    log.warn(
                        Stage::Restore,
                        Reason::ComponentMissing,
                        format!("{} ({}) is not on the migrated asset", cached.name, cached.class),
                    );
                    continue;
                }
            };

            if transform != cached.relative_transform {
                if let Err(e) = host
                    .set_component_transform(path, &cached.name, cached.relative_transform)
                    .await
                {
                    log.warn(Stage::Restore, Reason::WriteRejected, format!("{} transform: {e}", cached.name));
                }
            }
            self.restore_component_properties(entry, cached, log).await;
        }
    }

    /// Add a cached component the clear removed
    async fn recreate(&self, entry: &PlanEntry, cached: &ComponentRecord, log: &mut EntryLog) -> Option<ComponentInfo> {
        let host = self.host.as_ref();
        let path = &entry.path;
        match host
            .add_component(path, &cached.name, &cached.class, cached.attach_parent.as_deref())
            .await
        {
            Ok(()) => info!(path = %path, component = %cached.name, class = %cached.class, "component recreated"),
            Err(e @ HostError::Unsupported(_)) => {
                log.fail(
                    Stage::Restore,
                    Reason::ComponentUnconstructible,
                    format!("{} ({}): {e}", cached.name, cached.class),
                );
                return None;
            }
            Err(e) => {
                log.warn(Stage::Restore, Reason::WriteRejected, format!("adding {}: {e}", cached.name));
                return None;
            }
        }
        match host.get_component_hierarchy(path).await {
            Ok(hierarchy) => hierarchy.into_iter().find(|c| c.name == cached.name),
            Err(e) => {
                log.warn(Stage::Restore, Reason::ReadFailed, format!("component hierarchy: {e}"));
                None
            }
        }
    }

    async fn restore_component_properties(&self, entry: &PlanEntry, cached: &ComponentRecord, log: &mut EntryLog) {
        if cached.typed_properties.is_empty() {
            return;
        }
        let object = ObjectRef::Component {
            asset: entry.path.clone(),
            name: cached.name.clone(),
        };
        let descriptors = match self.host.enumerate_properties(&object).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                log.warn(Stage::Restore, Reason::ReadFailed, format!("{object}: {e}"));
                return;
            }
        };
        for (name, value) in &cached.typed_properties {
            match descriptors.iter().find(|d| d.name == *name) {
                Some(descriptor) => {
                    self.restore(&object, descriptor, value, log).await;
                }
                None => log.warn(
                    Stage::Restore,
                    Reason::UnmappedProperty,
                    format!("{name} has no counterpart on {object}"),
                ),
            }
        }
    }

    /// Write one cached value if it differs from the live one; true if written
    async fn restore(
        &self,
        object: &ObjectRef,
        descriptor: &PropertyDescriptor,
        value: &TypedValue,
        log: &mut EntryLog,
    ) -> bool {
        let name = &descriptor.name;
        let host_value = match deserialize(value, &descriptor.kind) {
            Ok(host_value) => host_value,
            Err(e @ SerializeError::TypeMismatch { .. }) => {
                log.warn(Stage::Restore, Reason::TypeMismatch, format!("{object}.{name}: {e}"));
                return false;
            }
            Err(e @ SerializeError::UnknownValue { .. }) => {
                log.warn(Stage::Restore, Reason::UnknownTypedValue, format!("{object}.{name}: {e}"));
                return false;
            }
        };

        if let Ok(current) = self.host.read_property(object, name).await {
            if current == host_value {
                return false;
            }
        }
        match self.host.write_property(object, name, host_value).await {
            Ok(()) => {
                debug!(%object, property = %name, "value restored");
                true
            }
            Err(e) => {
                log.warn(Stage::Restore, Reason::WriteRejected, format!("{object}.{name}: {e}"));
                false
            }
        }
    }
}

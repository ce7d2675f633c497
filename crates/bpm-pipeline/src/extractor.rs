//! Offline pass: capture pre-migration defaults into the cache
//!
//! The extractor only ever talks to the host through a [`ReadOnlyHost`], so
//! it cannot mutate the asset store even by accident. The cache is built in
//! memory and written once at the end of the batch.

use crate::cache::{CacheDocument, CacheRecord, ComponentRecord, ExtractedRecord};
use crate::config::ExtractConfig;
use crate::error::CacheError;
use crate::report::{EntryLog, Phase, Recorder, Report};
use crate::state::{Reason, Stage};
use bpm_host::{ComponentInfo, HostAdapter, HostError, HostResult, ObjectRef, ReadOnlyHost};
use bpm_model::{serialize, PropertyDescriptor, TypedValue};
use bpm_plan::{MigrationPlan, PlanEntry};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads every planned asset's defaults
pub struct Extractor {
    host: ReadOnlyHost,
    config: ExtractConfig,
}

impl Extractor {
    /// Extractor over `host`, which is wrapped read-only
    #[must_use]
    pub fn new(host: Arc<dyn HostAdapter>) -> Self {
        Self {
            host: ReadOnlyHost::new(host),
            config: ExtractConfig::default(),
        }
    }

    /// Use `config`
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    /// Extract every entry of `plan`, in file order
    pub async fn run(&self, plan: &MigrationPlan) -> (CacheDocument, Report) {
        info!(entries = plan.len(), "extract started");
        let mut recorder = Recorder::new(Phase::Extract);
        let mut cache = CacheDocument::new();

        for entry in plan.entries() {
            let mut log = recorder.entry(entry.path.as_str());
            let record = self.extract_entry(entry, &mut log).await;
            cache.insert(entry.path.as_str(), record);
            recorder.record(log);
        }

        let report = recorder.finish();
        info!(%report, "extract finished");
        (cache, report)
    }

    async fn extract_entry(&self, entry: &PlanEntry, log: &mut EntryLog) -> CacheRecord {
        let path = &entry.path;
        let info = match self.host.load_asset(path).await {
            Ok(info) => info,
            Err(HostError::AssetNotFound(_)) => {
                log.fail(Stage::Load, Reason::AssetMissing, "asset does not exist");
                return CacheRecord::missing(path.as_str());
            }
            Err(e) => {
                log.fail(Stage::Load, Reason::LoadFailed, e.to_string());
                return CacheRecord::Missing {
                    path: path.as_str().to_owned(),
                    error: e.to_string(),
                };
            }
        };

        let class = match self.host.get_generated_class(path).await {
            Ok(class) => class,
            Err(e) => {
                log.fail(Stage::Extract, Reason::ReadFailed, e.to_string());
                return CacheRecord::Missing {
                    path: path.as_str().to_owned(),
                    error: e.to_string(),
                };
            }
        };

        let properties = match self.host.get_default_object(&class).await {
            Ok(object) => self.capture(&object, None, log).await,
            Err(e) => {
                log.fail(Stage::Extract, Reason::ReadFailed, e.to_string());
                BTreeMap::new()
            }
        };

        let components = match self.host.get_component_hierarchy(path).await {
            Ok(hierarchy) => self.capture_components(entry, hierarchy, log).await,
            Err(e) => {
                log.fail(Stage::Extract, Reason::ReadFailed, format!("component hierarchy: {e}"));
                Vec::new()
            }
        };

        debug!(
            path = %path,
            properties = properties.len(),
            components = components.len(),
            "entry extracted"
        );
        CacheRecord::Extracted(ExtractedRecord {
            path: path.as_str().to_owned(),
            class_name: class.as_str().to_owned(),
            parent_class: info.parent_class.as_str().to_owned(),
            properties,
            components,
        })
    }

    async fn capture_components(
        &self,
        entry: &PlanEntry,
        hierarchy: Vec<ComponentInfo>,
        log: &mut EntryLog,
    ) -> Vec<ComponentRecord> {
        let mut records = Vec::with_capacity(hierarchy.len());
        for component in hierarchy {
            let object = ObjectRef::Component {
                asset: entry.path.clone(),
                name: component.name.clone(),
            };
            let subset = entry.component_subset(&component.class);
            let typed_properties = self.capture(&object, subset, log).await;
            records.push(ComponentRecord {
                name: component.name,
                class: component.class,
                attach_parent: component.attach_parent,
                relative_transform: component.transform,
                typed_properties,
                inherited: component.inherited,
            });
        }
        records
    }

    /// Serialize the captured properties of `object`
    ///
    /// `subset` limits capture to the named properties.
    async fn capture(
        &self,
        object: &ObjectRef,
        subset: Option<&[String]>,
        log: &mut EntryLog,
    ) -> BTreeMap<String, TypedValue> {
        let mut values = BTreeMap::new();
        let descriptors = match self.host.enumerate_properties(object).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                log.warn(Stage::Extract, Reason::ReadFailed, format!("{object}: {e}"));
                return values;
            }
        };

        for descriptor in descriptors.iter().filter(|d| self.wanted(d, subset)) {
            match self.read(object, descriptor).await {
                Ok(value) => {
                    if value.contains_unrepresentable() {
                        log.warn(
                            Stage::Extract,
                            Reason::UnknownTypedValue,
                            format!("{object}.{} has no typed representation", descriptor.name),
                        );
                    }
                    values.insert(descriptor.name.clone(), value);
                }
                Err(e) => log.warn(Stage::Extract, Reason::ReadFailed, format!("{object}.{}: {e}", descriptor.name)),
            }
        }
        values
    }

    fn wanted(&self, descriptor: &PropertyDescriptor, subset: Option<&[String]>) -> bool {
        if self.config.skip_transient && !descriptor.is_persistent() {
            return false;
        }
        subset.map_or(true, |names| names.iter().any(|n| *n == descriptor.name))
    }

    async fn read(&self, object: &ObjectRef, descriptor: &PropertyDescriptor) -> HostResult<TypedValue> {
        let value = self.host.read_property(object, &descriptor.name).await?;
        Ok(serialize(&value, descriptor))
    }
}

/// Write a cache document atomically, returning its SHA-256
///
/// # Errors
/// I/O errors.
pub fn write_cache(cache: &CacheDocument, path: &Path) -> Result<String, CacheError> {
    let digest = cache.write(path)?;
    info!(cache = %path.display(), records = cache.len(), sha256 = %digest, "cache written");
    Ok(digest)
}

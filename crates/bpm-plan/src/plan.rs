//! The migration plan
//!
//! A plan is authored once per run and read-only afterwards. Loading it runs
//! every check up front: row schema, duplicate assets, policy/rename
//! consistency and the parent-class dependency order.

use crate::entry::{ClearPolicy, PlanEntry};
use crate::error::{PlanError, Result};
use crate::format::PlanFormat;
use crate::order::{dependency_order, OrderedEntries};
use bpm_model::{AssetPath, ClassPath};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// One row as written in the plan file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRow {
    path: String,
    target_parent: String,
    #[serde(default)]
    clear_policy: ClearPolicy,
    #[serde(default)]
    rename: IndexMap<String, String>,
    #[serde(default)]
    delete_functions: Vec<String>,
    #[serde(default)]
    delete_components: Vec<String>,
    #[serde(default)]
    delete_variables: Vec<String>,
    #[serde(default)]
    cache_key: Option<String>,
    #[serde(default)]
    component_properties: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    keep_interfaces: bool,
    #[serde(default)]
    expect_properties: Vec<String>,
}

/// A validated, dependency-ordered migration plan
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    entries: Vec<PlanEntry>,
    order: Vec<usize>,
    index: HashMap<AssetPath, usize>,
}

impl MigrationPlan {
    /// Read and validate a plan file; the format follows the extension
    ///
    /// # Errors
    /// Any [`PlanError`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = PlanFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::parse(&text, format)?;
        debug!(plan = %path.display(), entries = plan.len(), "plan loaded");
        Ok(plan)
    }

    /// Validate a plan from text
    ///
    /// # Errors
    /// Any [`PlanError`] except `Io`.
    pub fn parse(text: &str, format: PlanFormat) -> Result<Self> {
        Self::from_value(format.decode(text)?)
    }

    /// Validate a decoded plan document
    ///
    /// The document is either a list of rows or an object with an `entries`
    /// list and an optional plan-wide `component_properties` table.
    ///
    /// # Errors
    /// Any [`PlanError`] except `Io`.
    pub fn from_value(document: serde_json::Value) -> Result<Self> {
        let (rows, shared) = split_document(document)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let row_no = i + 1;
            let raw: RawRow =
                serde_json::from_value(row).map_err(|e| PlanError::row(row_no, e.to_string()))?;
            entries.push(build_entry(row_no, raw, &shared)?);
        }
        Self::from_entries(entries)
    }

    /// Validate already-built entries; rows are renumbered from 1
    ///
    /// # Errors
    /// `MalformedPlan`, `DuplicateAsset` or `CyclicParentDependency`.
    pub fn from_entries(mut entries: Vec<PlanEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.row = i + 1;
            validate_entry(entry)?;
            if let Some(first) = index.insert(entry.path.clone(), i) {
                return Err(PlanError::DuplicateAsset {
                    path: entry.path.to_string(),
                    first_row: first + 1,
                    row: entry.row,
                });
            }
        }
        let order = dependency_order(&entries)?;
        Ok(Self {
            entries,
            order,
            index,
        })
    }

    /// Entries in file order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Entries in dependency order, then file order for ties
    #[must_use]
    pub fn ordered_entries(&self) -> OrderedEntries<'_> {
        OrderedEntries {
            entries: &self.entries,
            order: self.order.iter(),
        }
    }

    /// Entry for an asset
    #[must_use]
    pub fn entry(&self, path: &AssetPath) -> Option<&PlanEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    /// Entry whose cache key is `key`
    #[must_use]
    pub fn entry_for_cache_key(&self, key: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.cache_key() == key)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type SharedComponentProperties = BTreeMap<String, Vec<String>>;

fn split_document(document: serde_json::Value) -> Result<(Vec<serde_json::Value>, SharedComponentProperties)> {
    use serde_json::Value;

    match document {
        Value::Null => Ok((Vec::new(), BTreeMap::new())),
        Value::Array(rows) => Ok((rows, BTreeMap::new())),
        Value::Object(mut map) => {
            let shared = match map.remove("component_properties") {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| PlanError::document(format!("component_properties: {e}")))?,
                None => BTreeMap::new(),
            };
            let rows = match map.remove("entries") {
                Some(Value::Array(rows)) => rows,
                Some(_) => return Err(PlanError::document("`entries` must be a list")),
                None if map.is_empty() => Vec::new(),
                None => return Err(PlanError::document("expected a list of rows or an `entries` list")),
            };
            if let Some(key) = map.keys().next() {
                return Err(PlanError::document(format!("unknown top-level key `{key}`")));
            }
            Ok((rows, shared))
        }
        other => Err(PlanError::document(format!(
            "expected a list of rows, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "a table",
    }
}

fn build_entry(row: usize, raw: RawRow, shared: &SharedComponentProperties) -> Result<PlanEntry> {
    let path = AssetPath::parse(&raw.path).map_err(|e| PlanError::row(row, format!("path: {e}")))?;
    let target_parent = ClassPath::parse(&raw.target_parent)
        .map_err(|e| PlanError::row(row, format!("target_parent: {e}")))?;

    let mut component_properties = shared.clone();
    component_properties.extend(raw.component_properties);

    Ok(PlanEntry {
        row,
        path,
        target_parent,
        clear_policy: raw.clear_policy,
        rename: raw.rename,
        delete_functions: raw.delete_functions,
        delete_components: raw.delete_components,
        delete_variables: raw.delete_variables,
        cache_key: raw.cache_key,
        component_properties,
        keep_interfaces: raw.keep_interfaces,
        expect_properties: raw.expect_properties,
    })
}

fn validate_entry(entry: &PlanEntry) -> Result<()> {
    let row = entry.row;

    if entry.clear_policy == ClearPolicy::Full && entry.effective_renames().next().is_some() {
        return Err(PlanError::row(
            row,
            "clear_policy `full` removes every variable; a rename map has nothing to rename",
        ));
    }

    let names = entry
        .rename
        .iter()
        .flat_map(|(old, new)| [old, new])
        .chain(&entry.delete_functions)
        .chain(&entry.delete_components)
        .chain(&entry.delete_variables)
        .chain(&entry.expect_properties);
    if names.into_iter().any(|n| n.trim().is_empty()) {
        return Err(PlanError::row(row, "names must not be empty"));
    }

    let mut targets: HashMap<&str, &str> = HashMap::new();
    for (old, new) in entry.effective_renames() {
        if let Some(other) = targets.insert(new, old) {
            return Err(PlanError::row(
                row,
                format!("rename maps both `{other}` and `{old}` to `{new}`"),
            ));
        }
        if entry.deletes_variable(new) {
            return Err(PlanError::row(
                row,
                format!("`{new}` is a rename target and also listed in delete_variables"),
            ));
        }
    }

    if entry.cache_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
        return Err(PlanError::row(row, "cache_key must not be empty"));
    }
    Ok(())
}

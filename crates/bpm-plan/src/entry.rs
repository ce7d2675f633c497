//! Plan entries and clear policies

use bpm_model::{AssetPath, ClassPath};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Which part of an asset the engine removes before reparenting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearPolicy {
    /// Every graph, every user variable and the whole component hierarchy
    #[default]
    Full,
    /// Graph content only
    #[serde(alias = "keep_variables")]
    KeepVariables,
    /// Graph content and variables; the component hierarchy stays
    #[serde(alias = "keep_components")]
    KeepComponents,
    /// Main event-graph nodes only
    #[serde(alias = "graphs_only")]
    GraphsOnly,
}

impl ClearPolicy {
    /// Function graphs, macros and delegates are removed
    #[inline]
    #[must_use]
    pub fn clears_functions(self) -> bool {
        !matches!(self, Self::GraphsOnly)
    }

    /// User-declared variables are removed
    #[inline]
    #[must_use]
    pub fn clears_variables(self) -> bool {
        matches!(self, Self::Full | Self::KeepComponents)
    }

    /// The component hierarchy is removed
    #[inline]
    #[must_use]
    pub fn clears_components(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Policy name as written in plan files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::KeepVariables => "keep-variables",
            Self::KeepComponents => "keep-components",
            Self::GraphsOnly => "graphs-only",
        }
    }
}

impl Display for ClearPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated row of a migration plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// 1-based position in the plan file
    pub row: usize,
    /// Asset to migrate
    pub path: AssetPath,
    /// New parent of the asset's generated class
    pub target_parent: ClassPath,
    /// What to remove before reparenting
    pub clear_policy: ClearPolicy,
    /// Variable/property renames, old to new, in file order
    pub rename: IndexMap<String, String>,
    /// Functions to delete after the policy clear
    pub delete_functions: Vec<String>,
    /// Components to delete after the policy clear
    pub delete_components: Vec<String>,
    /// Variable declarations to delete once references are renamed
    pub delete_variables: Vec<String>,
    /// Key of this asset's record in the value cache, when it is not the path
    pub cache_key: Option<String>,
    /// Component class to the properties captured for components of that class
    pub component_properties: BTreeMap<String, Vec<String>>,
    /// Leave implemented interfaces in place during the clear
    pub keep_interfaces: bool,
    /// Properties the verifier must find on the migrated default object
    pub expect_properties: Vec<String>,
}

impl PlanEntry {
    /// Entry with default policy and no extra steps
    #[must_use]
    pub fn new(path: AssetPath, target_parent: ClassPath) -> Self {
        Self {
            row: 0,
            path,
            target_parent,
            clear_policy: ClearPolicy::default(),
            rename: IndexMap::new(),
            delete_functions: Vec::new(),
            delete_components: Vec::new(),
            delete_variables: Vec::new(),
            cache_key: None,
            component_properties: BTreeMap::new(),
            keep_interfaces: false,
            expect_properties: Vec::new(),
        }
    }

    /// Set the clear policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear_policy = policy;
        self
    }

    /// Add a rename
    #[inline]
    #[must_use]
    pub fn with_rename(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.rename.insert(old.into(), new.into());
        self
    }

    /// Add a function to delete
    #[inline]
    #[must_use]
    pub fn with_deleted_function(mut self, name: impl Into<String>) -> Self {
        self.delete_functions.push(name.into());
        self
    }

    /// Add a component to delete
    #[inline]
    #[must_use]
    pub fn with_deleted_component(mut self, name: impl Into<String>) -> Self {
        self.delete_components.push(name.into());
        self
    }

    /// Add a variable declaration to delete
    #[inline]
    #[must_use]
    pub fn with_deleted_variable(mut self, name: impl Into<String>) -> Self {
        self.delete_variables.push(name.into());
        self
    }

    /// Look the asset up under a different cache key
    #[inline]
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Require a property on the migrated default object
    #[inline]
    #[must_use]
    pub fn with_expected_property(mut self, name: impl Into<String>) -> Self {
        self.expect_properties.push(name.into());
        self
    }

    /// Keep implemented interfaces through the clear
    #[inline]
    #[must_use]
    pub fn keeping_interfaces(mut self) -> Self {
        self.keep_interfaces = true;
        self
    }

    /// Key of this asset's record in the value cache
    #[inline]
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or(self.path.as_str())
    }

    /// Name a cached property is restored under
    #[must_use]
    pub fn renamed<'a>(&'a self, name: &'a str) -> &'a str {
        self.rename.get(name).map_or(name, String::as_str)
    }

    /// Renames that actually change a name (`X -> X` is a no-op)
    pub fn effective_renames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rename
            .iter()
            .filter(|(old, new)| old != new)
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Whether the plan deletes the variable `name`
    #[must_use]
    pub fn deletes_variable(&self, name: &str) -> bool {
        self.delete_variables.iter().any(|v| v == name)
    }

    /// Properties to capture for a component of `class`, `None` meaning all
    #[must_use]
    pub fn component_subset(&self, class: &str) -> Option<&[String]> {
        self.component_properties.get(class).map(Vec::as_slice)
    }
}

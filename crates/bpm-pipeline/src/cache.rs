//! The extracted-value cache file
//!
//! A JSON object keyed by asset path. Each value is either an extracted
//! record or a `{ "path", "error" }` marker for an asset the extractor could
//! not load. Maps are ordered so that the same input always produces the same
//! bytes.

use crate::error::CacheError;
use crate::persist::{atomic_write, sha256_hex};
use bpm_model::{Transform, TypedValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

/// Error marker written for an asset that does not exist
pub const MISSING: &str = "missing";

/// Cached state of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRecord {
    /// Component name
    pub name: String,
    /// Component class
    pub class: String,
    /// Attach parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_parent: Option<String>,
    /// Relative transform
    pub relative_transform: Transform,
    /// Captured properties
    #[serde(default)]
    pub typed_properties: BTreeMap<String, TypedValue>,
    /// Declared by a parent class
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inherited: bool,
}

/// Cached default state of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedRecord {
    /// Asset path
    pub path: String,
    /// Generated class at extraction time
    pub class_name: String,
    /// Parent class at extraction time
    pub parent_class: String,
    /// Default-object properties
    #[serde(default)]
    pub properties: BTreeMap<String, TypedValue>,
    /// Components of the default object
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

impl ExtractedRecord {
    /// Component by name
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentRecord> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// One value of the cache document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheRecord {
    /// Captured state
    Extracted(ExtractedRecord),
    /// Asset could not be read
    Missing {
        /// Asset path
        path: String,
        /// Why
        error: String,
    },
}

impl CacheRecord {
    /// Marker for an asset that does not exist
    #[must_use]
    pub fn missing(path: impl Into<String>) -> Self {
        Self::Missing {
            path: path.into(),
            error: MISSING.to_owned(),
        }
    }

    /// Extracted state, if any
    #[must_use]
    pub fn extracted(&self) -> Option<&ExtractedRecord> {
        match self {
            Self::Extracted(record) => Some(record),
            Self::Missing { .. } => None,
        }
    }

    /// Asset path the record describes
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Extracted(record) => &record.path,
            Self::Missing { path, .. } => path,
        }
    }

    fn from_json(key: &str, value: serde_json::Value) -> Result<Self, CacheError> {
        let record_error = |message: String| CacheError::Record {
            key: key.to_owned(),
            message,
        };
        let serde_json::Value::Object(fields) = value else {
            return Err(record_error("record is not an object".into()));
        };
        if let Some(error) = fields.get("error") {
            let error = error
                .as_str()
                .ok_or_else(|| record_error("`error` must be a string".into()))?
                .to_owned();
            let path = match fields.get("path") {
                Some(serde_json::Value::String(path)) => path.clone(),
                None => key.to_owned(),
                Some(_) => return Err(record_error("`path` must be a string".into())),
            };
            return Ok(Self::Missing { path, error });
        }
        serde_json::from_value(serde_json::Value::Object(fields))
            .map(Self::Extracted)
            .map_err(|e| record_error(e.to_string()))
    }
}

/// The whole cache file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CacheDocument(BTreeMap<String, CacheRecord>);

impl CacheDocument {
    /// Empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any previous one under `key`
    pub fn insert(&mut self, key: impl Into<String>, record: CacheRecord) {
        self.0.insert(key.into(), record);
    }

    /// Record under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.0.get(key)
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheRecord)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical text: pretty JSON, newline terminated
    ///
    /// # Errors
    /// Serialization errors (non-string map keys cannot occur).
    pub fn to_json(&self) -> Result<String, CacheError> {
        let mut text = serde_json::to_string_pretty(self).map_err(|e| CacheError::Syntax(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    /// Parse cache text
    ///
    /// # Errors
    /// [`CacheError::Syntax`] if the text is not a JSON object,
    /// [`CacheError::Record`] naming the first malformed record.
    pub fn parse(text: &str) -> Result<Self, CacheError> {
        let root: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| CacheError::Syntax(e.to_string()))?;
        root.into_iter()
            .map(|(key, value)| CacheRecord::from_json(&key, value).map(|record| (key, record)))
            .collect::<Result<_, _>>()
            .map(Self)
    }

    /// Read a cache file
    ///
    /// # Errors
    /// As [`Self::read_with_digest`].
    pub fn read(path: &Path) -> Result<Self, CacheError> {
        Self::read_with_digest(path).map(|(document, _)| document)
    }

    /// Read a cache file and the SHA-256 of its bytes
    ///
    /// # Errors
    /// I/O errors and the errors of [`Self::parse`].
    pub fn read_with_digest(path: &Path) -> Result<(Self, String), CacheError> {
        let bytes = fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| CacheError::Syntax(e.to_string()))?;
        Ok((Self::parse(&text)?, sha256_hex(text.as_bytes())))
    }

    /// Write the document atomically and return the SHA-256 of what was written
    ///
    /// # Errors
    /// I/O errors.
    pub fn write(&self, path: &Path) -> Result<String, CacheError> {
        let text = self.to_json()?;
        atomic_write(path, text.as_bytes()).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(sha256_hex(text.as_bytes()))
    }
}

/// What differs for one key between two caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difference {
    /// Key present only in the first cache
    OnlyInLeft,
    /// Key present only in the second cache
    OnlyInRight,
    /// One side is a missing-asset marker and the other is not
    Availability,
    /// A top-level field of the record differs
    Field {
        /// Field name
        field: &'static str,
    },
    /// A property exists on one side only
    PropertyPresence {
        /// Property name
        property: String,
    },
    /// A property has different values
    PropertyValue {
        /// Property name
        property: String,
    },
    /// A component exists on one side only
    ComponentPresence {
        /// Component name
        component: String,
    },
    /// A component differs in class, attachment, transform or properties
    Component {
        /// Component name
        component: String,
        /// Differing aspect
        aspect: String,
    },
}

/// One difference between two caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDifference {
    /// Record key
    pub key: String,
    /// What differs
    #[serde(flatten)]
    pub difference: Difference,
}

impl Display for CacheDifference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let key = &self.key;
        match &self.difference {
            Difference::OnlyInLeft => write!(f, "{key}: only in first cache"),
            Difference::OnlyInRight => write!(f, "{key}: only in second cache"),
            Difference::Availability => write!(f, "{key}: missing on one side"),
            Difference::Field { field } => write!(f, "{key}: {field} differs"),
            Difference::PropertyPresence { property } => write!(f, "{key}: property {property} on one side only"),
            Difference::PropertyValue { property } => write!(f, "{key}: property {property} differs"),
            Difference::ComponentPresence { component } => {
                write!(f, "{key}: component {component} on one side only")
            }
            Difference::Component { component, aspect } => write!(f, "{key}: component {component} {aspect} differs"),
        }
    }
}

/// Differences between two caches, in key order
#[must_use]
pub fn diff(left: &CacheDocument, right: &CacheDocument) -> Vec<CacheDifference> {
    let mut out = Vec::new();
    let keys: std::collections::BTreeSet<&String> = left.0.keys().chain(right.0.keys()).collect();
    for key in keys {
        let mut push = |difference| {
            out.push(CacheDifference {
                key: key.clone(),
                difference,
            });
        };
        match (left.0.get(key), right.0.get(key)) {
            (Some(_), None) => push(Difference::OnlyInLeft),
            (None, Some(_)) => push(Difference::OnlyInRight),
            (Some(CacheRecord::Extracted(a)), Some(CacheRecord::Extracted(b))) => {
                diff_records(a, b, &mut push);
            }
            (Some(a), Some(b)) => {
                if a.extracted().is_some() != b.extracted().is_some() {
                    push(Difference::Availability);
                }
            }
            (None, None) => {}
        }
    }
    out
}

fn diff_records(a: &ExtractedRecord, b: &ExtractedRecord, push: &mut impl FnMut(Difference)) {
    if a.class_name != b.class_name {
        push(Difference::Field { field: "class_name" });
    }
    if a.parent_class != b.parent_class {
        push(Difference::Field { field: "parent_class" });
    }
    diff_maps(&a.properties, &b.properties, |name, present| {
        push(if present {
            Difference::PropertyValue { property: name.to_owned() }
        } else {
            Difference::PropertyPresence { property: name.to_owned() }
        });
    });

    let names: std::collections::BTreeSet<&str> = a
        .components
        .iter()
        .chain(&b.components)
        .map(|c| c.name.as_str())
        .collect();
    for name in names {
        let (Some(ca), Some(cb)) = (a.component(name), b.component(name)) else {
            push(Difference::ComponentPresence { component: name.to_owned() });
            continue;
        };
        let mut aspect = |what: &str| {
            push(Difference::Component {
                component: name.to_owned(),
                aspect: what.to_owned(),
            });
        };
        if ca.class != cb.class {
            aspect("class");
        }
        if ca.attach_parent != cb.attach_parent {
            aspect("attach_parent");
        }
        if ca.relative_transform != cb.relative_transform {
            aspect("relative_transform");
        }
        diff_maps(&ca.typed_properties, &cb.typed_properties, |property, _| {
            aspect(&format!("property {property}"));
        });
    }
}

/// Calls `report(name, present_on_both_sides)` for every differing key
fn diff_maps(
    a: &BTreeMap<String, TypedValue>,
    b: &BTreeMap<String, TypedValue>,
    mut report: impl FnMut(&str, bool),
) {
    let names: std::collections::BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    for name in names {
        match (a.get(name), b.get(name)) {
            (Some(x), Some(y)) if x != y => report(name, true),
            (Some(_), None) | (None, Some(_)) => report(name, false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record() -> ExtractedRecord {
        ExtractedRecord {
            path: "/Game/A".into(),
            class_name: "/Game/A.A_C".into(),
            parent_class: "/Script/Engine.Actor".into(),
            properties: [("Speed".to_string(), TypedValue::Float { value: 2.5 })].into(),
            components: vec![ComponentRecord {
                name: "Mesh".into(),
                class: "StaticMeshComponent".into(),
                attach_parent: None,
                relative_transform: Transform::IDENTITY,
                typed_properties: BTreeMap::new(),
                inherited: false,
            }],
        }
    }

    #[test]
    fn missing_marker_shape() {
        let mut doc = CacheDocument::new();
        doc.insert("/Game/Missing", CacheRecord::missing("/Game/Missing"));
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "/Game/Missing": { "path": "/Game/Missing", "error": "missing" } }));
    }

    #[test]
    fn document_reads_back() {
        let mut doc = CacheDocument::new();
        doc.insert("/Game/A", CacheRecord::Extracted(record()));
        doc.insert("/Game/B", CacheRecord::missing("/Game/B"));
        assert_eq!(CacheDocument::parse(&doc.to_json().unwrap()).unwrap(), doc);
    }

    #[test]
    fn typed_value_without_tag_names_the_record() {
        let text = r#"{ "/Game/A": { "path": "/Game/A", "class_name": "C", "parent_class": "P",
                        "properties": { "Speed": { "value": 1 } } } }"#;
        match CacheDocument::parse(text) {
            Err(CacheError::Record { key, message }) => {
                assert_eq!(key, "/Game/A");
                assert!(message.contains("type"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn top_level_array_is_rejected() {
        assert!(matches!(CacheDocument::parse("[]"), Err(CacheError::Syntax(_))));
    }

    #[test]
    fn write_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = CacheDocument::new();
        doc.insert("/Game/A", CacheRecord::Extracted(record()));
        let first = doc.write(&dir.path().join("a.json")).unwrap();
        let second = doc.write(&dir.path().join("b.json")).unwrap();
        assert_eq!(first, second);
        let (back, digest) = CacheDocument::read_with_digest(&dir.path().join("a.json")).unwrap();
        assert_eq!(back, doc);
        assert_eq!(digest, first);
    }

    #[test]
    fn diff_reports_each_change() {
        let mut left = CacheDocument::new();
        left.insert("/Game/A", CacheRecord::Extracted(record()));
        left.insert("/Game/Gone", CacheRecord::missing("/Game/Gone"));

        let mut changed = record();
        changed.parent_class = "/Script/Game.NP_A".into();
        changed.properties.insert("Speed".into(), TypedValue::Float { value: 3.0 });
        changed.properties.insert("Extra".into(), TypedValue::Bool { value: true });
        changed.components[0].relative_transform = Transform::from_location([1.0, 0.0, 0.0]);
        let mut right = CacheDocument::new();
        right.insert("/Game/A", CacheRecord::Extracted(changed));

        let found: Vec<String> = diff(&left, &right).iter().map(ToString::to_string).collect();
        assert_eq!(
            found,
            vec![
                "/Game/A: parent_class differs",
                "/Game/A: property Extra on one side only",
                "/Game/A: property Speed differs",
                "/Game/A: component Mesh relative_transform differs",
                "/Game/Gone: only in first cache",
            ]
        );
        assert!(diff(&left, &left).is_empty());
    }
}

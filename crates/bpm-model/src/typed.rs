//! The typed-value algebra stored in the extracted-value cache
//!
//! Every value carries a mandatory `type` discriminator:
//!
//! ```json
//! { "type": "soft_object_ref", "path": "/Game/Meshes/SM_Door.SM_Door" }
//! ```
//!
//! Readers reject objects without `type`. Discriminators this version does not
//! know are kept verbatim as [`TypedValue::Foreign`] so that a newer cache can
//! pass through an older tool without losing data.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Name of the discriminator field
pub const TYPE_TAG: &str = "type";

/// Discriminators understood by this version
pub const KNOWN_TAGS: &[&str] = &[
    "bool",
    "int",
    "float",
    "string",
    "object_ref",
    "soft_object_ref",
    "class_ref",
    "array",
    "map",
    "struct",
    "enum",
    "localized_text",
    "gameplay_tag",
    "unknown",
];

/// A cached property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", tag = "type", rename_all = "snake_case")]
pub enum TypedValue {
    /// Boolean
    Bool {
        /// Value
        value: bool,
    },
    /// Integer
    Int {
        /// Value
        value: i64,
    },
    /// Float
    Float {
        /// Value
        value: f64,
    },
    /// String (also carries names)
    String {
        /// Value
        value: String,
    },
    /// Hard object reference by canonical path
    ObjectRef {
        /// Referenced object path, `null` for a null reference
        #[serde(default)]
        path: Option<String>,
    },
    /// Soft object reference by canonical path
    SoftObjectRef {
        /// Referenced object path, `null` for a null reference
        #[serde(default)]
        path: Option<String>,
    },
    /// Class reference by canonical path
    ClassRef {
        /// Referenced class path, `null` for a null reference
        #[serde(default)]
        path: Option<String>,
    },
    /// Array
    Array {
        /// Elements
        items: Vec<TypedValue>,
    },
    /// Map
    Map {
        /// Entries in host order
        entries: Vec<MapEntry>,
    },
    /// Struct
    Struct {
        /// Struct type name
        struct_type: String,
        /// Field values
        typed_properties: BTreeMap<String, TypedValue>,
    },
    /// Enum member
    Enum {
        /// Enum type name
        enum_type: String,
        /// Member name
        member: String,
    },
    /// Localised text
    LocalizedText {
        /// Localisation namespace
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        /// Localisation key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// Source string
        source: String,
    },
    /// Gameplay tag
    GameplayTag {
        /// Dotted tag name
        tag: String,
    },
    /// A value the serializer could not represent
    Unknown {
        /// Host textual export of the value
        repr: String,
    },
    /// A value with a discriminator this version does not understand
    #[serde(skip)]
    Foreign(ForeignValue),
}

/// One entry of a cached map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Key
    pub key: TypedValue,
    /// Value
    pub value: TypedValue,
}

/// A typed value with an unrecognised discriminator, preserved as read
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignValue {
    /// The unrecognised discriminator
    pub kind: String,
    /// All fields, including the discriminator
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl TypedValue {
    /// String value
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }

    /// Hard object reference
    #[inline]
    #[must_use]
    pub fn object_ref(path: impl Into<String>) -> Self {
        Self::ObjectRef {
            path: Some(path.into()),
        }
    }

    /// Soft object reference
    #[inline]
    #[must_use]
    pub fn soft_object_ref(path: impl Into<String>) -> Self {
        Self::SoftObjectRef {
            path: Some(path.into()),
        }
    }

    /// The JSON discriminator of this value
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Bool { .. } => "bool",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::String { .. } => "string",
            Self::ObjectRef { .. } => "object_ref",
            Self::SoftObjectRef { .. } => "soft_object_ref",
            Self::ClassRef { .. } => "class_ref",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Struct { .. } => "struct",
            Self::Enum { .. } => "enum",
            Self::LocalizedText { .. } => "localized_text",
            Self::GameplayTag { .. } => "gameplay_tag",
            Self::Unknown { .. } => "unknown",
            Self::Foreign(foreign) => &foreign.kind,
        }
    }

    /// Whether this value (or anything nested in it) cannot be restored
    #[must_use]
    pub fn contains_unrepresentable(&self) -> bool {
        match self {
            Self::Unknown { .. } | Self::Foreign(_) => true,
            Self::Array { items } => items.iter().any(Self::contains_unrepresentable),
            Self::Map { entries } => entries
                .iter()
                .any(|e| e.key.contains_unrepresentable() || e.value.contains_unrepresentable()),
            Self::Struct {
                typed_properties, ..
            } => typed_properties.values().any(Self::contains_unrepresentable),
            _ => false,
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Foreign(foreign) => foreign.fields.serialize(serializer),
            known => TypedValue::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TypedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let kind = match fields.get(TYPE_TAG) {
            Some(serde_json::Value::String(kind)) => kind.clone(),
            Some(_) => return Err(D::Error::custom("typed value `type` must be a string")),
            None => return Err(D::Error::missing_field(TYPE_TAG)),
        };

        if KNOWN_TAGS.contains(&kind.as_str()) {
            TypedValue::deserialize(serde_json::Value::Object(fields)).map_err(D::Error::custom)
        } else {
            Ok(Self::Foreign(ForeignValue { kind, fields }))
        }
    }
}

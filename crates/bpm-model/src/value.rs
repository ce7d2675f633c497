//! Engine-typed values
//!
//! [`HostValue`] is the shape in which the host editor adapter hands out and
//! accepts default-object property values. It mirrors the host's reflection
//! types closely; converting it to the cache representation is the job of
//! [`crate::serializer`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property value as the host editor represents it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HostValue {
    /// Boolean
    Bool(bool),
    /// Any integer width, widened
    Int(i64),
    /// Float or double
    Float(f64),
    /// String
    Str(String),
    /// Name (interned identifier)
    Name(String),
    /// Localised text
    Text {
        /// Localisation namespace
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        /// Localisation key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// Source string
        source: String,
    },
    /// Hard object reference (`None` is a null reference)
    Object(Option<String>),
    /// Soft object reference
    SoftObject(Option<String>),
    /// Class reference
    Class(Option<String>),
    /// Dynamic array
    Array(Vec<HostValue>),
    /// Map, in host iteration order
    Map(Vec<(HostValue, HostValue)>),
    /// Struct instance
    Struct {
        /// Struct type name
        name: String,
        /// Field values
        fields: BTreeMap<String, HostValue>,
    },
    /// Enum member
    Enum {
        /// Enum type name
        enum_type: String,
        /// Member name
        member: String,
    },
    /// Gameplay tag (dotted name)
    Tag(String),
    /// A value the host can only print, never reconstruct
    Opaque {
        /// Host type name
        type_name: String,
        /// Host textual export
        text: String,
    },
}

impl HostValue {
    /// Short name of the value's kind, used in diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Name(_) => "name",
            Self::Text { .. } => "text",
            Self::Object(_) => "object",
            Self::SoftObject(_) => "soft_object",
            Self::Class(_) => "class",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Struct { .. } => "struct",
            Self::Enum { .. } => "enum",
            Self::Tag(_) => "gameplay_tag",
            Self::Opaque { .. } => "opaque",
        }
    }

    /// Textual export in the host's notation, used for `unknown` cache values
    #[must_use]
    pub fn export_text(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => format!("{x:.6}"),
            Self::Str(s) | Self::Name(s) => format!("\"{s}\""),
            Self::Text { source, .. } => format!("NSLOCTEXT(\"{source}\")"),
            Self::Object(p) | Self::SoftObject(p) | Self::Class(p) => {
                p.clone().unwrap_or_else(|| "None".to_string())
            }
            Self::Array(items) => {
                let inner: Vec<_> = items.iter().map(Self::export_text).collect();
                format!("({})", inner.join(","))
            }
            Self::Map(entries) => {
                let inner: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| format!("({}, {})", k.export_text(), v.export_text()))
                    .collect();
                format!("({})", inner.join(","))
            }
            Self::Struct { fields, .. } => {
                let inner: Vec<_> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}={}", v.export_text()))
                    .collect();
                format!("({})", inner.join(","))
            }
            Self::Enum { member, .. } => member.clone(),
            Self::Tag(tag) => format!("(TagName=\"{tag}\")"),
            Self::Opaque { text, .. } => text.clone(),
        }
    }
}

/// Relative transform of a component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation (x, y, z)
    pub location: [f64; 3],
    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: [f64; 3],
    /// Scale (x, y, z)
    pub scale: [f64; 3],
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        location: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    /// Transform with only a translation
    #[inline]
    #[must_use]
    pub fn from_location(location: [f64; 3]) -> Self {
        Self {
            location,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

//! Property descriptors
//!
//! A [`PropertyDescriptor`] is what the host's reflection reports for one
//! property of a class: its name, its declared [`PropertyKind`] and a handful
//! of flags the pipeline cares about.

use crate::value::HostValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Declared type of a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    /// Boolean
    Bool,
    /// Integer of any width
    Int,
    /// Float or double
    Float,
    /// String
    String,
    /// Name
    Name,
    /// Localised text
    Text,
    /// Hard object reference
    Object {
        /// Base class the reference is constrained to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    /// Soft object reference
    SoftObject {
        /// Base class the reference is constrained to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    /// Class reference
    Class {
        /// Meta class the reference is constrained to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta_class: Option<String>,
    },
    /// Dynamic array
    Array {
        /// Element type
        element: Box<PropertyKind>,
    },
    /// Map
    Map {
        /// Key type
        key: Box<PropertyKind>,
        /// Value type
        value: Box<PropertyKind>,
    },
    /// Struct
    Struct {
        /// Struct type name
        name: String,
        /// Field types
        #[serde(default)]
        fields: BTreeMap<String, PropertyKind>,
    },
    /// Enum
    Enum {
        /// Enum type name
        enum_type: String,
    },
    /// Gameplay tag
    GameplayTag,
    /// Something the pipeline has no representation for (delegates, interfaces, ...)
    Opaque {
        /// Host type name
        type_name: String,
    },
}

impl PropertyKind {
    /// Array of `element`
    #[inline]
    #[must_use]
    pub fn array_of(element: PropertyKind) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Map from `key` to `value`
    #[inline]
    #[must_use]
    pub fn map_of(key: PropertyKind, value: PropertyKind) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Unconstrained hard object reference
    #[inline]
    #[must_use]
    pub fn object() -> Self {
        Self::Object { class: None }
    }

    /// Unconstrained soft object reference
    #[inline]
    #[must_use]
    pub fn soft_object() -> Self {
        Self::SoftObject { class: None }
    }

    /// Value a freshly constructed default object holds for this kind
    #[must_use]
    pub fn zero_value(&self) -> HostValue {
        match self {
            Self::Bool => HostValue::Bool(false),
            Self::Int => HostValue::Int(0),
            Self::Float => HostValue::Float(0.0),
            Self::String => HostValue::Str(String::new()),
            Self::Name => HostValue::Name("None".to_string()),
            Self::Text => HostValue::Text {
                namespace: None,
                key: None,
                source: String::new(),
            },
            Self::Object { .. } => HostValue::Object(None),
            Self::SoftObject { .. } => HostValue::SoftObject(None),
            Self::Class { .. } => HostValue::Class(None),
            Self::Array { .. } => HostValue::Array(Vec::new()),
            Self::Map { .. } => HostValue::Map(Vec::new()),
            Self::Struct { name, fields } => HostValue::Struct {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(field, kind)| (field.clone(), kind.zero_value()))
                    .collect(),
            },
            Self::Enum { enum_type } => HostValue::Enum {
                enum_type: enum_type.clone(),
                member: format!("{enum_type}::None"),
            },
            Self::GameplayTag => HostValue::Tag(String::new()),
            Self::Opaque { type_name } => HostValue::Opaque {
                type_name: type_name.clone(),
                text: String::new(),
            },
        }
    }

    /// Whether `value` can be stored in a property of this kind as-is
    #[must_use]
    pub fn accepts(&self, value: &HostValue) -> bool {
        match (self, value) {
            (Self::Bool, HostValue::Bool(_))
            | (Self::Int, HostValue::Int(_))
            | (Self::Float, HostValue::Float(_))
            | (Self::String, HostValue::Str(_))
            | (Self::Name, HostValue::Name(_))
            | (Self::Text, HostValue::Text { .. })
            | (Self::Object { .. }, HostValue::Object(_))
            | (Self::SoftObject { .. }, HostValue::SoftObject(_))
            | (Self::Class { .. }, HostValue::Class(_))
            | (Self::GameplayTag, HostValue::Tag(_)) => true,
            (Self::Array { element }, HostValue::Array(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (Self::Map { key, value: val }, HostValue::Map(entries)) => entries
                .iter()
                .all(|(k, v)| key.accepts(k) && val.accepts(v)),
            (Self::Struct { name, fields }, HostValue::Struct { name: got, fields: values }) => {
                name == got
                    && values.iter().all(|(field, v)| {
                        fields.get(field).is_some_and(|kind| kind.accepts(v))
                    })
            }
            (Self::Enum { enum_type }, HostValue::Enum { enum_type: got, .. }) => enum_type == got,
            (Self::Opaque { type_name }, HostValue::Opaque { type_name: got, .. }) => {
                type_name == got
            }
            _ => false,
        }
    }
}

impl Display for PropertyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Name => f.write_str("name"),
            Self::Text => f.write_str("text"),
            Self::Object { class } => write!(f, "object<{}>", class.as_deref().unwrap_or("Object")),
            Self::SoftObject { class } => {
                write!(f, "soft_object<{}>", class.as_deref().unwrap_or("Object"))
            }
            Self::Class { meta_class } => {
                write!(f, "class<{}>", meta_class.as_deref().unwrap_or("Object"))
            }
            Self::Array { element } => write!(f, "array<{element}>"),
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
            Self::Struct { name, .. } => write!(f, "struct {name}"),
            Self::Enum { enum_type } => write!(f, "enum {enum_type}"),
            Self::GameplayTag => f.write_str("gameplay_tag"),
            Self::Opaque { type_name } => write!(f, "opaque {type_name}"),
        }
    }
}

/// Reflection flags relevant to extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFlags {
    /// Not persisted with the default object
    #[serde(default)]
    pub transient: bool,
    /// Computed from other state (not worth caching)
    #[serde(default)]
    pub derived: bool,
    /// Declared by the Blueprint itself rather than a parent class
    #[serde(default)]
    pub user_declared: bool,
}

/// Reflection data for a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name
    pub name: String,
    /// Declared type
    pub kind: PropertyKind,
    /// Flags
    #[serde(default)]
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    /// Descriptor with default flags
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: PropertyFlags::default(),
        }
    }

    /// Mark the descriptor transient
    #[inline]
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.flags.transient = true;
        self
    }

    /// Mark the descriptor as user-declared (a Blueprint variable)
    #[inline]
    #[must_use]
    pub fn user_declared(mut self) -> Self {
        self.flags.user_declared = true;
        self
    }

    /// Whether the extractor should capture this property
    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !self.flags.transient && !self.flags.derived
    }
}

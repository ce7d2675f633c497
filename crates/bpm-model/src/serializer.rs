//! Property serializer
//!
//! Pure conversion between [`HostValue`] and [`TypedValue`], driven entirely by
//! the property's declared [`PropertyKind`]. No global state and no lookups:
//! a cache written today can be applied against a different session later.
//!
//! Conversions never cross kinds. A cached `string` cannot satisfy an `int`
//! property and a soft reference cannot satisfy a hard one; both are reported
//! as [`SerializeError::TypeMismatch`]. The only textual leniency is that
//! `string` fills both string and name properties, since names are cached as
//! strings.

use crate::property::{PropertyDescriptor, PropertyKind};
use crate::typed::{MapEntry, TypedValue};
use crate::value::HostValue;
use std::collections::BTreeMap;

/// Why a cached value cannot be turned back into a host value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    /// Cached value and target property disagree on type
    #[error("type mismatch at {at}: target expects {expected}, cache holds {found}")]
    TypeMismatch {
        /// Location inside the value (`$` is the property itself)
        at: String,
        /// Target kind
        expected: String,
        /// Cached discriminator
        found: String,
    },

    /// Cached value is `unknown` or carries an unrecognised discriminator
    #[error("value at {at} has no restorable representation ({tag})")]
    UnknownValue {
        /// Location inside the value
        at: String,
        /// Discriminator of the unrestorable value
        tag: String,
    },
}

/// Convert a host value to its cached representation
///
/// Never fails: anything that does not fit the descriptor, or has no cached
/// representation, becomes `unknown` carrying the host's textual export.
#[must_use]
pub fn serialize(value: &HostValue, descriptor: &PropertyDescriptor) -> TypedValue {
    serialize_kind(value, &descriptor.kind)
}

fn serialize_kind(value: &HostValue, kind: &PropertyKind) -> TypedValue {
    match (kind, value) {
        (PropertyKind::Bool, HostValue::Bool(value)) => TypedValue::Bool { value: *value },
        (PropertyKind::Int, HostValue::Int(value)) => TypedValue::Int { value: *value },
        // JSON has no NaN or infinity
        (PropertyKind::Float, HostValue::Float(value)) if value.is_finite() => {
            TypedValue::Float { value: *value }
        }
        (PropertyKind::String, HostValue::Str(value)) | (PropertyKind::Name, HostValue::Name(value)) => {
            TypedValue::String {
                value: value.clone(),
            }
        }
        (
            PropertyKind::Text,
            HostValue::Text {
                namespace,
                key,
                source,
            },
        ) => TypedValue::LocalizedText {
            namespace: namespace.clone(),
            key: key.clone(),
            source: source.clone(),
        },
        (PropertyKind::Object { .. }, HostValue::Object(path)) => TypedValue::ObjectRef { path: path.clone() },
        (PropertyKind::SoftObject { .. }, HostValue::SoftObject(path)) => {
            TypedValue::SoftObjectRef { path: path.clone() }
        }
        (PropertyKind::Class { .. }, HostValue::Class(path)) => TypedValue::ClassRef { path: path.clone() },
        (PropertyKind::Array { element }, HostValue::Array(items)) => TypedValue::Array {
            items: items.iter().map(|item| serialize_kind(item, element)).collect(),
        },
        (PropertyKind::Map { key, value: val }, HostValue::Map(entries)) => TypedValue::Map {
            entries: entries
                .iter()
                .map(|(k, v)| MapEntry {
                    key: serialize_kind(k, key),
                    value: serialize_kind(v, val),
                })
                .collect(),
        },
        (PropertyKind::Struct { name, fields }, HostValue::Struct { name: got, fields: values })
            if name == got =>
        {
            TypedValue::Struct {
                struct_type: name.clone(),
                typed_properties: values
                    .iter()
                    .map(|(field, v)| {
                        let typed = match fields.get(field) {
                            Some(field_kind) => serialize_kind(v, field_kind),
                            None => unknown(v),
                        };
                        (field.clone(), typed)
                    })
                    .collect(),
            }
        }
        (PropertyKind::Enum { enum_type }, HostValue::Enum { enum_type: got, member }) if enum_type == got => {
            TypedValue::Enum {
                enum_type: enum_type.clone(),
                member: member.clone(),
            }
        }
        (PropertyKind::GameplayTag, HostValue::Tag(tag)) => TypedValue::GameplayTag { tag: tag.clone() },
        _ => unknown(value),
    }
}

fn unknown(value: &HostValue) -> TypedValue {
    TypedValue::Unknown {
        repr: value.export_text(),
    }
}

/// Convert a cached value back into a host value for a property of `kind`
///
/// # Errors
/// - [`SerializeError::UnknownValue`] if the cached value (or a nested one) is
///   `unknown` or has an unrecognised discriminator
/// - [`SerializeError::TypeMismatch`] if the cached value does not have the
///   shape `kind` requires
pub fn deserialize(value: &TypedValue, kind: &PropertyKind) -> Result<HostValue, SerializeError> {
    deserialize_at(value, kind, "$")
}

fn deserialize_at(value: &TypedValue, kind: &PropertyKind, at: &str) -> Result<HostValue, SerializeError> {
    if let TypedValue::Unknown { .. } | TypedValue::Foreign(_) = value {
        return Err(SerializeError::UnknownValue {
            at: at.to_string(),
            tag: value.tag().to_string(),
        });
    }

    let mismatch = || SerializeError::TypeMismatch {
        at: at.to_string(),
        expected: kind.to_string(),
        found: value.tag().to_string(),
    };

    let host = match (kind, value) {
        (PropertyKind::Bool, TypedValue::Bool { value }) => HostValue::Bool(*value),
        (PropertyKind::Int, TypedValue::Int { value }) => HostValue::Int(*value),
        (PropertyKind::Float, TypedValue::Float { value }) => HostValue::Float(*value),
        (PropertyKind::String, TypedValue::String { value }) => HostValue::Str(value.clone()),
        (PropertyKind::Name, TypedValue::String { value }) => HostValue::Name(value.clone()),
        (
            PropertyKind::Text,
            TypedValue::LocalizedText {
                namespace,
                key,
                source,
            },
        ) => HostValue::Text {
            namespace: namespace.clone(),
            key: key.clone(),
            source: source.clone(),
        },
        (PropertyKind::Object { .. }, TypedValue::ObjectRef { path }) => HostValue::Object(path.clone()),
        (PropertyKind::SoftObject { .. }, TypedValue::SoftObjectRef { path }) => {
            HostValue::SoftObject(path.clone())
        }
        (PropertyKind::Class { .. }, TypedValue::ClassRef { path }) => HostValue::Class(path.clone()),
        (PropertyKind::Array { element }, TypedValue::Array { items }) => HostValue::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| deserialize_at(item, element, &format!("{at}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        (PropertyKind::Map { key, value: val }, TypedValue::Map { entries }) => HostValue::Map(
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    Ok((
                        deserialize_at(&entry.key, key, &format!("{at}{{{i}}}.key"))?,
                        deserialize_at(&entry.value, val, &format!("{at}{{{i}}}.value"))?,
                    ))
                })
                .collect::<Result<_, SerializeError>>()?,
        ),
        (
            PropertyKind::Struct { name, fields },
            TypedValue::Struct {
                struct_type,
                typed_properties,
            },
        ) => {
            if name != struct_type {
                return Err(mismatch());
            }
            let mut out = BTreeMap::new();
            for (field, cached) in typed_properties {
                let field_at = format!("{at}.{field}");
                let field_kind = fields.get(field).ok_or_else(|| SerializeError::TypeMismatch {
                    at: field_at.clone(),
                    expected: format!("a field of struct {name}"),
                    found: cached.tag().to_string(),
                })?;
                out.insert(field.clone(), deserialize_at(cached, field_kind, &field_at)?);
            }
            HostValue::Struct {
                name: name.clone(),
                fields: out,
            }
        }
        (PropertyKind::Enum { enum_type }, TypedValue::Enum { enum_type: got, member }) => {
            if enum_type != got {
                return Err(mismatch());
            }
            HostValue::Enum {
                enum_type: enum_type.clone(),
                member: member.clone(),
            }
        }
        (PropertyKind::GameplayTag, TypedValue::GameplayTag { tag }) => HostValue::Tag(tag.clone()),
        _ => return Err(mismatch()),
    };
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf_kind() -> impl Strategy<Value = PropertyKind> {
        prop_oneof![
            Just(PropertyKind::Bool),
            Just(PropertyKind::Int),
            Just(PropertyKind::Float),
            Just(PropertyKind::String),
            Just(PropertyKind::Name),
            Just(PropertyKind::Text),
            Just(PropertyKind::object()),
            Just(PropertyKind::soft_object()),
            Just(PropertyKind::Class { meta_class: None }),
            Just(PropertyKind::GameplayTag),
            Just(PropertyKind::Enum {
                enum_type: "EState".into()
            }),
        ]
    }

    fn any_kind() -> impl Strategy<Value = PropertyKind> {
        leaf_kind().prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(PropertyKind::array_of),
                (leaf_kind(), inner.clone()).prop_map(|(k, v)| PropertyKind::map_of(k, v)),
                proptest::collection::btree_map("[A-Z][a-z]{1,6}", inner, 0..4).prop_map(|fields| {
                    PropertyKind::Struct {
                        name: "Generated".into(),
                        fields,
                    }
                }),
            ]
        })
    }

    fn value_for(kind: &PropertyKind) -> BoxedStrategy<HostValue> {
        let path = proptest::option::of("/Game/[A-Z][a-z]{1,8}\\.[A-Z][a-z]{1,8}");
        match kind {
            PropertyKind::Bool => any::<bool>().prop_map(HostValue::Bool).boxed(),
            PropertyKind::Int => any::<i64>().prop_map(HostValue::Int).boxed(),
            PropertyKind::Float => (-1.0e9f64..1.0e9).prop_map(HostValue::Float).boxed(),
            PropertyKind::String => "[a-zA-Z0-9 ]{0,12}".prop_map(HostValue::Str).boxed(),
            PropertyKind::Name => "[A-Za-z_]{1,12}".prop_map(HostValue::Name).boxed(),
            PropertyKind::Text => ("[a-z ]{0,10}", proptest::option::of("[A-F0-9]{8}"))
                .prop_map(|(source, key)| HostValue::Text {
                    namespace: None,
                    key,
                    source,
                })
                .boxed(),
            PropertyKind::Object { .. } => path.prop_map(HostValue::Object).boxed(),
            PropertyKind::SoftObject { .. } => path.prop_map(HostValue::SoftObject).boxed(),
            PropertyKind::Class { .. } => path.prop_map(HostValue::Class).boxed(),
            PropertyKind::GameplayTag => "[A-Z][a-z]{1,5}(\\.[A-Z][a-z]{1,5}){0,2}"
                .prop_map(HostValue::Tag)
                .boxed(),
            PropertyKind::Enum { enum_type } => {
                let enum_type = enum_type.clone();
                "[A-Z][a-z]{1,6}"
                    .prop_map(move |member| HostValue::Enum {
                        enum_type: enum_type.clone(),
                        member,
                    })
                    .boxed()
            }
            PropertyKind::Array { element } => proptest::collection::vec(value_for(element), 0..4)
                .prop_map(HostValue::Array)
                .boxed(),
            PropertyKind::Map { key, value } => {
                proptest::collection::vec((value_for(key), value_for(value)), 0..3)
                    .prop_map(HostValue::Map)
                    .boxed()
            }
            PropertyKind::Struct { name, fields } => {
                let name = name.clone();
                let field_values: Vec<_> = fields
                    .iter()
                    .map(|(field, kind)| {
                        let field = field.clone();
                        value_for(kind).prop_map(move |v| (field.clone(), v))
                    })
                    .collect();
                field_values
                    .prop_map(move |pairs| HostValue::Struct {
                        name: name.clone(),
                        fields: pairs.into_iter().collect(),
                    })
                    .boxed()
            }
            PropertyKind::Opaque { type_name } => Just(HostValue::Opaque {
                type_name: type_name.clone(),
                text: String::new(),
            })
            .boxed(),
        }
    }

    fn kind_and_value() -> impl Strategy<Value = (PropertyKind, HostValue)> {
        any_kind().prop_flat_map(|kind| {
            let values = value_for(&kind);
            (Just(kind), values)
        })
    }

    proptest! {
        #[test]
        fn prop_serialize_then_deserialize_is_identity((kind, value) in kind_and_value()) {
            let descriptor = PropertyDescriptor::new("Prop", kind.clone());
            let typed = serialize(&value, &descriptor);
            prop_assert!(!typed.contains_unrepresentable());

            // Through the cache's JSON form as well
            let text = serde_json::to_string(&typed).unwrap();
            let reread: TypedValue = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(&reread, &typed);

            let restored = deserialize(&reread, &kind).unwrap();
            prop_assert_eq!(restored, value);
        }
    }

    #[test]
    fn soft_reference_does_not_satisfy_hard_reference() {
        let cached = TypedValue::soft_object_ref("/Game/X.X");
        let err = deserialize(&cached, &PropertyKind::object()).unwrap_err();
        assert!(matches!(err, SerializeError::TypeMismatch { ref found, .. } if found == "soft_object_ref"));
    }

    #[test]
    fn string_does_not_satisfy_numeric_property() {
        let cached = TypedValue::string("42");
        assert!(matches!(
            deserialize(&cached, &PropertyKind::Int),
            Err(SerializeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            deserialize(&TypedValue::Int { value: 1 }, &PropertyKind::Float),
            Err(SerializeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn value_not_matching_descriptor_serializes_as_unknown() {
        let descriptor = PropertyDescriptor::new("Speed", PropertyKind::Float);
        let typed = serialize(&HostValue::Str("fast".into()), &descriptor);
        assert_eq!(
            typed,
            TypedValue::Unknown {
                repr: "\"fast\"".into()
            }
        );
    }

    #[test]
    fn non_finite_float_serializes_as_unknown() {
        let descriptor = PropertyDescriptor::new("Speed", PropertyKind::Float);
        assert!(matches!(
            serialize(&HostValue::Float(f64::NAN), &descriptor),
            TypedValue::Unknown { .. }
        ));
    }

    #[test]
    fn nested_unknown_reports_location() {
        let cached = TypedValue::Array {
            items: vec![
                TypedValue::Int { value: 1 },
                TypedValue::Unknown { repr: "?".into() },
            ],
        };
        let err = deserialize(&cached, &PropertyKind::array_of(PropertyKind::Int)).unwrap_err();
        assert_eq!(
            err,
            SerializeError::UnknownValue {
                at: "$[1]".into(),
                tag: "unknown".into()
            }
        );
    }

    #[test]
    fn struct_name_must_match() {
        let cached = TypedValue::Struct {
            struct_type: "A".into(),
            typed_properties: BTreeMap::new(),
        };
        let kind = PropertyKind::Struct {
            name: "B".into(),
            fields: BTreeMap::new(),
        };
        assert!(matches!(
            deserialize(&cached, &kind),
            Err(SerializeError::TypeMismatch { .. })
        ));
    }
}

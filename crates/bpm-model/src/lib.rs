//! Data model shared by every stage of a Blueprint migration.
//!
//! - [`AssetPath`] and [`ClassPath`]: canonical identity of assets and classes
//! - [`HostValue`]: engine-typed values as the host editor hands them out
//! - [`PropertyDescriptor`]: what the host says a property looks like
//! - [`TypedValue`]: the JSON-stable tagged union stored in the value cache
//! - [`serializer`]: the pure conversion between the two value worlds

pub mod path;
pub mod property;
pub mod serializer;
pub mod typed;
pub mod value;

pub use path::{AssetPath, ClassPath, PathError};
pub use property::{PropertyDescriptor, PropertyFlags, PropertyKind};
pub use serializer::{deserialize, serialize, SerializeError};
pub use typed::{ForeignValue, MapEntry, TypedValue};
pub use value::{HostValue, Transform};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

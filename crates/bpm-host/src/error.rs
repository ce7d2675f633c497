//! Adapter-level errors
//!
//! Every adapter operation returns one of these instead of unwinding. The
//! pipeline wraps them into the state-specific reason of the step that called.

use bpm_model::{AssetPath, ClassPath};

/// Why a host operation failed
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No asset at this path
    #[error("asset not found: {0}")]
    AssetNotFound(AssetPath),

    /// No such class (native or generated)
    #[error("class not found: {0}")]
    ClassNotFound(ClassPath),

    /// The object has no property of this name
    #[error("property {property} not found on {object}")]
    PropertyNotFound {
        /// Object description
        object: String,
        /// Property name
        property: String,
    },

    /// The asset has no component of this name
    #[error("component {component} not found on {asset}")]
    ComponentNotFound {
        /// Owning asset
        asset: AssetPath,
        /// Component name
        component: String,
    },

    /// The host cannot perform this operation at all
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A mutation was attempted through a read-only adapter
    #[error("read-only adapter refused {0}")]
    ReadOnly(&'static str),

    /// The host refused the operation
    #[error("{op} rejected: {message}")]
    Rejected {
        /// Operation name
        op: &'static str,
        /// Host message
        message: String,
    },

    /// Opaque failure raised inside the host
    #[error("host error: {0}")]
    Host(String),

    /// Asset store I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Host refused `op`
    #[inline]
    pub fn rejected(op: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            op,
            message: message.into(),
        }
    }

    /// Whether the error means "the thing is not there" rather than "the host failed"
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound(_)
                | Self::ClassNotFound(_)
                | Self::PropertyNotFound { .. }
                | Self::ComponentNotFound { .. }
        )
    }
}

/// Result alias for adapter operations
pub type HostResult<T> = Result<T, HostError>;

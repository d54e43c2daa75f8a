//! Property error types.

use thiserror::Error;

use crate::PropertyType;

/// Errors raised while validating or reading properties.
///
/// Every variant names the offending property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The name does not match any supported descriptor.
    #[error("unknown property: {name}")]
    Unknown { name: String },

    /// The value (explicit or default) does not parse under the declared type.
    #[error("invalid value {value:?} for property {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    /// The property was read through an accessor for a different type.
    #[error("property {name} is declared as {declared}, cannot read it as {requested}")]
    TypeMismatch {
        name: String,
        declared: PropertyType,
        requested: PropertyType,
    },
}

impl PropertyError {
    /// Create an Unknown error.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    /// Create an Invalid error.
    pub fn invalid(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The property this error is about.
    pub fn property(&self) -> &str {
        match self {
            Self::Unknown { name } | Self::Invalid { name, .. } | Self::TypeMismatch { name, .. } => {
                name
            }
        }
    }
}

/// Property result type.
pub type PropertyResult<T> = Result<T, PropertyError>;

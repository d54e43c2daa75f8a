//! Property descriptors.

use serde::{Deserialize, Serialize};

/// Declared type of a property value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PropertyType {
    /// Any string.
    String,
    /// Exactly `true` or `false`.
    Boolean,
    /// Signed 32-bit decimal integer.
    Integer,
    /// Signed 64-bit decimal integer.
    Long,
    /// Non-negative 64-bit decimal integer.
    Natural,
    /// Floating point number.
    Double,
    /// Byte count with optional `k`, `m` or `g` suffix.
    Size,
}

/// Declaration of one supported property.
///
/// Descriptors are immutable once created. An empty default is the same as
/// no default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescription {
    name: String,
    kind: PropertyType,
    default: Option<String>,
    description: String,
}

impl PropertyDescription {
    /// Create a new descriptor.
    pub fn new(
        name: impl Into<String>,
        kind: PropertyType,
        default: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: default.filter(|d| !d.is_empty()).map(str::to_string),
            description: description.into(),
        }
    }

    /// Property name, usually dotted (`fileway.adaptors.local.copy.buffer`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type.
    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_default_is_absent() {
        let desc = PropertyDescription::new("key", PropertyType::Integer, Some(""), "test");
        assert_eq!(desc.default_value(), None);
    }

    #[test]
    fn test_type_text_form() {
        assert_eq!(PropertyType::Natural.to_string(), "NATURAL");
        assert_eq!(PropertyType::from_str("SIZE").unwrap(), PropertyType::Size);
    }
}

//! Value grammars for each property type.
//!
//! Parsers return a plain reason string on failure; callers attach the
//! property name and value.

use crate::PropertyType;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

pub(crate) fn parse_boolean(value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

pub(crate) fn parse_integer(value: &str) -> Result<i32, String> {
    value
        .parse::<i32>()
        .map_err(|e| format!("not an integer: {e}"))
}

pub(crate) fn parse_long(value: &str) -> Result<i64, String> {
    value.parse::<i64>().map_err(|e| format!("not a long: {e}"))
}

pub(crate) fn parse_natural(value: &str) -> Result<u64, String> {
    let n = parse_long(value)?;
    u64::try_from(n).map_err(|_| "must not be negative".to_string())
}

pub(crate) fn parse_double(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|e| format!("not a double: {e}"))
}

/// Parse `<digits>[kKmMgG]` into a byte count.
pub(crate) fn parse_size(value: &str) -> Result<u64, String> {
    let (digits, multiplier) = match value.char_indices().last() {
        Some((i, 'k' | 'K')) => (&value[..i], KIB),
        Some((i, 'm' | 'M')) => (&value[..i], MIB),
        Some((i, 'g' | 'G')) => (&value[..i], GIB),
        _ => (value, 1),
    };

    let base = digits
        .parse::<u64>()
        .map_err(|_| "expected a size such as 512, 64k, 8m or 1g".to_string())?;

    base.checked_mul(multiplier)
        .ok_or_else(|| "size overflows 64 bits".to_string())
}

/// Check that `value` parses under `kind`.
pub(crate) fn check(kind: PropertyType, value: &str) -> Result<(), String> {
    match kind {
        PropertyType::String => Ok(()),
        PropertyType::Boolean => parse_boolean(value).map(drop),
        PropertyType::Integer => parse_integer(value).map(drop),
        PropertyType::Long => parse_long(value).map(drop),
        PropertyType::Natural => parse_natural(value).map(drop),
        PropertyType::Double => parse_double(value).map(drop),
        PropertyType::Size => parse_size(value).map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_suffixes() {
        assert_eq!(parse_size("1"), Ok(1));
        assert_eq!(parse_size("1k"), Ok(1024));
        assert_eq!(parse_size("1K"), Ok(1024));
        assert_eq!(parse_size("1m"), Ok(1048576));
        assert_eq!(parse_size("1M"), Ok(1048576));
        assert_eq!(parse_size("1g"), Ok(1073741824));
        assert_eq!(parse_size("1G"), Ok(1073741824));
        assert_eq!(parse_size("42g"), Ok(42 * GIB));
    }

    #[test]
    fn test_size_rejects_garbage() {
        assert!(parse_size("1X").is_err());
        assert!(parse_size("k").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("-1k").is_err());
        assert!(parse_size("1kk").is_err());
        assert!(parse_size("99999999999999g").is_err());
    }

    #[test]
    fn test_boolean_is_exact() {
        assert_eq!(parse_boolean("true"), Ok(true));
        assert_eq!(parse_boolean("false"), Ok(false));
        assert!(parse_boolean("bla").is_err());
        assert!(parse_boolean("").is_err());
    }

    #[test]
    fn test_natural_rejects_negative() {
        assert_eq!(parse_natural("43"), Ok(43));
        assert!(parse_natural("-43").is_err());
        assert!(parse_natural("hello").is_err());
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(parse_integer("-7"), Ok(-7));
        assert!(parse_integer("4294967296").is_err());
        assert_eq!(parse_long("4294967296"), Ok(4294967296));
    }

    #[test]
    fn test_double_syntax() {
        assert_eq!(parse_double("42.0"), Ok(42.0));
        assert_eq!(parse_double("1e3"), Ok(1000.0));
        assert!(parse_double("aap").is_err());
    }
}

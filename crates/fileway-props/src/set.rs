//! Validated, merged property sets.

use indexmap::IndexMap;
use std::fmt;
use std::io;

use crate::error::{PropertyError, PropertyResult};
use crate::parse;
use crate::{PropertyDescription, PropertyType};

/// One entry of a [`PropertySet`], in iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEntry<'a> {
    /// Property name.
    pub name: &'a str,
    /// Effective value.
    pub value: &'a str,
    /// True when the value comes from the descriptor default.
    pub from_default: bool,
}

/// Explicit configuration values merged with descriptor defaults.
///
/// Construction rejects unknown names and unparseable values, defaults
/// included. Type mismatches are only detected by the typed accessors.
///
/// Iteration order is: explicitly supplied entries in the order they were
/// given, then defaults of the remaining descriptors in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    /// Supported descriptors, in declaration order.
    supported: IndexMap<String, PropertyDescription>,
    /// Explicit values, in caller order.
    explicit: IndexMap<String, String>,
}

impl PropertySet {
    /// Validate `explicit` against `descriptors` and merge with defaults.
    pub fn new<I, K, V>(
        descriptors: impl IntoIterator<Item = PropertyDescription>,
        explicit: I,
    ) -> PropertyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut supported = IndexMap::new();
        for desc in descriptors {
            if let Some(default) = desc.default_value() {
                validate(&desc, default)?;
            }
            supported.insert(desc.name().to_string(), desc);
        }

        let mut set = Self {
            supported,
            explicit: IndexMap::new(),
        };
        set.apply(explicit)?;
        Ok(set)
    }

    /// A set with only descriptor defaults.
    pub fn with_defaults(
        descriptors: impl IntoIterator<Item = PropertyDescription>,
    ) -> PropertyResult<Self> {
        Self::new(descriptors, std::iter::empty::<(String, String)>())
    }

    /// Return a copy where `explicit` overrides the current values.
    ///
    /// New values are validated exactly as at construction. Keys that were
    /// already set keep their position in iteration order.
    pub fn with_overrides<I, K, V>(&self, explicit: I) -> PropertyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut next = self.clone();
        next.apply(explicit)?;
        Ok(next)
    }

    fn apply<I, K, V>(&mut self, explicit: I) -> PropertyResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in explicit {
            let name = name.into();
            let value = value.into();
            let desc = self
                .supported
                .get(&name)
                .ok_or_else(|| PropertyError::unknown(&name))?;
            validate(desc, &value)?;
            self.explicit.insert(name, value);
        }
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// True if `name` has a descriptor.
    pub fn supports_property(&self, name: &str) -> bool {
        self.supported.contains_key(name)
    }

    /// True if `name` was explicitly supplied (defaults don't count).
    pub fn property_set(&self, name: &str) -> PropertyResult<bool> {
        self.descriptor(name)?;
        Ok(self.explicit.contains_key(name))
    }

    /// Names of all supported properties, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.supported.keys().map(String::as_str).collect()
    }

    /// All supported descriptors, in declaration order.
    pub fn supported_properties(&self) -> Vec<PropertyDescription> {
        self.supported.values().cloned().collect()
    }

    /// Number of entries with a value (explicit or default).
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if no entry has a value.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Entries with a value, explicit ones first.
    pub fn iter(&self) -> impl Iterator<Item = PropertyEntry<'_>> {
        let explicit = self.explicit.iter().map(|(name, value)| PropertyEntry {
            name,
            value,
            from_default: false,
        });
        let defaults = self
            .supported
            .values()
            .filter(|desc| !self.explicit.contains_key(desc.name()))
            .filter_map(|desc| {
                desc.default_value().map(|value| PropertyEntry {
                    name: desc.name(),
                    value,
                    from_default: true,
                })
            });
        explicit.chain(defaults)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Raw effective value of `name`, if it has one.
    pub fn get_property(&self, name: &str) -> PropertyResult<Option<&str>> {
        let desc = self.descriptor(name)?;
        Ok(self.value_of(desc))
    }

    /// Read a STRING property.
    pub fn get_string(&self, name: &str) -> PropertyResult<&str> {
        self.typed(name, PropertyType::String)?
            .ok_or_else(|| missing(name))
    }

    /// Read a BOOLEAN property.
    pub fn get_boolean(&self, name: &str) -> PropertyResult<bool> {
        self.parsed(name, PropertyType::Boolean, parse::parse_boolean)
    }

    /// Read a BOOLEAN property, or `fallback` if it has no value.
    pub fn get_boolean_or(&self, name: &str, fallback: bool) -> PropertyResult<bool> {
        self.parsed_or(name, PropertyType::Boolean, parse::parse_boolean, fallback)
    }

    /// Read an INTEGER property.
    pub fn get_integer(&self, name: &str) -> PropertyResult<i32> {
        self.parsed(name, PropertyType::Integer, parse::parse_integer)
    }

    /// Read an INTEGER property, or `fallback` if it has no value.
    pub fn get_integer_or(&self, name: &str, fallback: i32) -> PropertyResult<i32> {
        self.parsed_or(name, PropertyType::Integer, parse::parse_integer, fallback)
    }

    /// Read a LONG property.
    pub fn get_long(&self, name: &str) -> PropertyResult<i64> {
        self.parsed(name, PropertyType::Long, parse::parse_long)
    }

    /// Read a LONG property, or `fallback` if it has no value.
    pub fn get_long_or(&self, name: &str, fallback: i64) -> PropertyResult<i64> {
        self.parsed_or(name, PropertyType::Long, parse::parse_long, fallback)
    }

    /// Read a NATURAL property.
    pub fn get_natural(&self, name: &str) -> PropertyResult<u64> {
        self.parsed(name, PropertyType::Natural, parse::parse_natural)
    }

    /// Read a NATURAL property, or `fallback` if it has no value.
    pub fn get_natural_or(&self, name: &str, fallback: u64) -> PropertyResult<u64> {
        self.parsed_or(name, PropertyType::Natural, parse::parse_natural, fallback)
    }

    /// Read a DOUBLE property.
    pub fn get_double(&self, name: &str) -> PropertyResult<f64> {
        self.parsed(name, PropertyType::Double, parse::parse_double)
    }

    /// Read a DOUBLE property, or `fallback` if it has no value.
    pub fn get_double_or(&self, name: &str, fallback: f64) -> PropertyResult<f64> {
        self.parsed_or(name, PropertyType::Double, parse::parse_double, fallback)
    }

    /// Read a SIZE property, in bytes.
    pub fn get_size(&self, name: &str) -> PropertyResult<u64> {
        self.parsed(name, PropertyType::Size, parse::parse_size)
    }

    /// Read a SIZE property, or `fallback` if it has no value.
    pub fn get_size_or(&self, name: &str, fallback: u64) -> PropertyResult<u64> {
        self.parsed_or(name, PropertyType::Size, parse::parse_size, fallback)
    }

    fn descriptor(&self, name: &str) -> PropertyResult<&PropertyDescription> {
        self.supported
            .get(name)
            .ok_or_else(|| PropertyError::unknown(name))
    }

    fn value_of<'a>(&'a self, desc: &'a PropertyDescription) -> Option<&'a str> {
        self.explicit
            .get(desc.name())
            .map(String::as_str)
            .or(desc.default_value())
    }

    /// Look up `name`, check its declared type, return its value if any.
    fn typed(&self, name: &str, requested: PropertyType) -> PropertyResult<Option<&str>> {
        let desc = self.descriptor(name)?;
        if desc.kind() != requested {
            return Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                declared: desc.kind(),
                requested,
            });
        }
        Ok(self.value_of(desc))
    }

    fn parsed<T>(
        &self,
        name: &str,
        kind: PropertyType,
        parse: fn(&str) -> Result<T, String>,
    ) -> PropertyResult<T> {
        let value = self.typed(name, kind)?.ok_or_else(|| missing(name))?;
        parse(value).map_err(|reason| PropertyError::invalid(name, value, reason))
    }

    fn parsed_or<T>(
        &self,
        name: &str,
        kind: PropertyType,
        parse: fn(&str) -> Result<T, String>,
        fallback: T,
    ) -> PropertyResult<T> {
        match self.typed(name, kind)? {
            Some(value) => {
                parse(value).map_err(|reason| PropertyError::invalid(name, value, reason))
            }
            None => Ok(fallback),
        }
    }

    // ========================================================================
    // Derived sets
    // ========================================================================

    /// Restrict to descriptors whose name starts with `prefix`.
    pub fn filter(&self, prefix: &str) -> Self {
        self.partition(|name| name.starts_with(prefix))
    }

    /// Restrict to descriptors whose name does not start with `prefix`.
    pub fn exclude(&self, prefix: &str) -> Self {
        self.partition(|name| !name.starts_with(prefix))
    }

    /// Drop explicit overrides whose name starts with `prefix`.
    ///
    /// The descriptors stay supported and fall back to their defaults.
    pub fn clear(&self, prefix: &str) -> Self {
        let mut next = self.clone();
        next.explicit.retain(|name, _| !name.starts_with(prefix));
        next
    }

    fn partition(&self, keep: impl Fn(&str) -> bool) -> Self {
        Self {
            supported: self
                .supported
                .iter()
                .filter(|(name, _)| keep(name))
                .map(|(name, desc)| (name.clone(), desc.clone()))
                .collect(),
            explicit: self
                .explicit
                .iter()
                .filter(|(name, _)| keep(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Write `name = value` lines in declaration order.
    ///
    /// Only names starting with `prefix` are written when a prefix is given.
    /// Properties without a value are skipped.
    pub fn print_properties(&self, out: &mut impl io::Write, prefix: Option<&str>) -> io::Result<()> {
        for desc in self.supported.values() {
            if prefix.is_some_and(|p| !desc.name().starts_with(p)) {
                continue;
            }
            if let Some(value) = self.value_of(desc) {
                writeln!(out, "{} = {}", desc.name(), value)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if entry.from_default {
                write!(f, "<<{}={}>>", entry.name, entry.value)?;
            } else {
                write!(f, "{}={}", entry.name, entry.value)?;
            }
        }
        f.write_str("}")
    }
}

fn validate(desc: &PropertyDescription, value: &str) -> PropertyResult<()> {
    parse::check(desc.kind(), value)
        .map_err(|reason| PropertyError::invalid(desc.name(), value, reason))
}

fn missing(name: &str) -> PropertyError {
    PropertyError::invalid(name, "", "no value and no default")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, kind: PropertyType, default: Option<&str>) -> PropertyDescription {
        PropertyDescription::new(name, kind, default, "test property")
    }

    fn two_keys() -> Vec<PropertyDescription> {
        vec![
            desc("aap.key", PropertyType::String, Some("aap")),
            desc("noot.key", PropertyType::String, Some("noot")),
        ]
    }

    #[test]
    fn test_supports_property() {
        let props = PropertySet::new(
            [desc("key", PropertyType::String, Some("bla"))],
            [("key", "value")],
        )
        .unwrap();
        assert!(props.supports_property("key"));
        assert!(!props.supports_property("aap"));

        let defaults =
            PropertySet::with_defaults([desc("key", PropertyType::String, Some("bla"))]).unwrap();
        assert!(defaults.supports_property("key"));
    }

    #[test]
    fn test_property_set_ignores_defaults() {
        let descs = [desc("key", PropertyType::String, Some("bla"))];
        let set = PropertySet::new(descs.clone(), [("key", "value")]).unwrap();
        assert!(set.property_set("key").unwrap());

        let unset = PropertySet::with_defaults(descs).unwrap();
        assert!(!unset.property_set("key").unwrap());
        assert!(matches!(
            unset.property_set("aap"),
            Err(PropertyError::Unknown { .. })
        ));
    }

    #[test]
    fn test_get_property_explicit_and_default() {
        let descs = [desc("key", PropertyType::String, Some("bla"))];
        let set = PropertySet::new(descs.clone(), [("key", "value")]).unwrap();
        assert_eq!(set.get_property("key").unwrap(), Some("value"));

        let unset = PropertySet::with_defaults(descs).unwrap();
        assert_eq!(unset.get_property("key").unwrap(), Some("bla"));
        assert!(unset.get_property("aap").is_err());
    }

    #[test]
    fn test_unknown_key_rejected_at_construction() {
        let result = PropertySet::new(
            [desc("key", PropertyType::String, Some("value"))],
            [("key2", "value2")],
        );
        match result {
            Err(PropertyError::Unknown { name }) => assert_eq!(name, "key2"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_display_explicit_then_defaults() {
        let set = PropertySet::new(
            [
                desc("key", PropertyType::String, Some("value")),
                desc("key2", PropertyType::String, Some("value")),
            ],
            [("key2", "value2")],
        )
        .unwrap();
        assert_eq!(set.to_string(), "{key2=value2, <<key=value>>}");

        let only = PropertySet::new(
            [desc("key", PropertyType::String, Some("bla"))],
            [("key", "value")],
        )
        .unwrap();
        assert_eq!(only.to_string(), "{key=value}");
    }

    #[test]
    fn test_display_keeps_caller_order() {
        let set = PropertySet::new(
            [
                desc("a", PropertyType::String, None),
                desc("b", PropertyType::String, None),
                desc("c", PropertyType::String, Some("3")),
            ],
            [("b", "2"), ("a", "1")],
        )
        .unwrap();
        assert_eq!(set.to_string(), "{b=2, a=1, <<c=3>>}");
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(PropertySet::default().to_string(), "{}");
        assert!(PropertySet::default().is_empty());

        let defaults =
            PropertySet::with_defaults([desc("aap.key", PropertyType::String, Some("aap"))])
                .unwrap();
        assert_eq!(defaults.to_string(), "{<<aap.key=aap>>}");
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn test_boolean_accessor() {
        let descs = [desc("key", PropertyType::Boolean, Some("true"))];
        let set = PropertySet::new(descs.clone(), [("key", "false")]).unwrap();
        assert!(!set.get_boolean("key").unwrap());

        let unset = PropertySet::with_defaults(descs.clone()).unwrap();
        assert!(unset.get_boolean("key").unwrap());

        assert!(matches!(
            PropertySet::new(descs.clone(), [("key", "bla")]),
            Err(PropertyError::Invalid { .. })
        ));
        assert!(matches!(
            unset.get_boolean("noot"),
            Err(PropertyError::Unknown { .. })
        ));
    }

    #[test]
    fn test_invalid_default_fails_construction() {
        for (kind, default) in [
            (PropertyType::Boolean, "aap"),
            (PropertyType::Integer, "aap"),
            (PropertyType::Long, "Hello"),
            (PropertyType::Double, "aap"),
            (PropertyType::Natural, "hello"),
            (PropertyType::Size, "42x"),
        ] {
            let result = PropertySet::with_defaults([desc("key", kind, Some(default))]);
            assert!(
                matches!(result, Err(PropertyError::Invalid { ref name, .. }) if name == "key"),
                "{kind} default {default:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_natural_rejects_negative_default() {
        let result = PropertySet::with_defaults([desc("aap.key", PropertyType::Natural, Some("-42"))])
            .and_then(|set| set.get_natural("aap.key"));
        assert!(matches!(result, Err(PropertyError::Invalid { .. })));
    }

    #[test]
    fn test_natural_accessor() {
        let descs = [desc("aap.key", PropertyType::Natural, Some("42"))];
        let set = PropertySet::new(descs.clone(), [("aap.key", "43")]).unwrap();
        assert_eq!(set.get_natural("aap.key").unwrap(), 43);

        assert!(PropertySet::new(descs.clone(), [("aap.key", "-43")]).is_err());
        assert!(PropertySet::new(descs, [("aap.key", "hello")]).is_err());
    }

    #[test]
    fn test_wrong_accessor_type() {
        let set =
            PropertySet::with_defaults([desc("key", PropertyType::String, Some("value"))]).unwrap();
        match set.get_boolean("key") {
            Err(PropertyError::TypeMismatch {
                declared,
                requested,
                ..
            }) => {
                assert_eq!(declared, PropertyType::String);
                assert_eq!(requested, PropertyType::Boolean);
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }

        let long = PropertySet::with_defaults([desc("n", PropertyType::Long, Some("1"))]).unwrap();
        assert!(matches!(
            long.get_integer("n"),
            Err(PropertyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_numeric_accessors() {
        let set = PropertySet::new(
            [
                desc("int", PropertyType::Integer, Some("42")),
                desc("long", PropertyType::Long, Some("42")),
                desc("double", PropertyType::Double, Some("42.0")),
            ],
            [("int", "1"), ("double", "1.0")],
        )
        .unwrap();
        assert_eq!(set.get_integer("int").unwrap(), 1);
        assert_eq!(set.get_long("long").unwrap(), 42);
        assert_eq!(set.get_double("double").unwrap(), 1.0);
    }

    #[test]
    fn test_size_accessor() {
        let descs = [desc("key", PropertyType::Size, Some("42g"))];
        for (value, expected) in [
            ("1", 1u64),
            ("1k", 1024),
            ("1K", 1024),
            ("1m", 1024 * 1024),
            ("1M", 1024 * 1024),
            ("1g", 1024 * 1024 * 1024),
            ("1G", 1024 * 1024 * 1024),
        ] {
            let set = PropertySet::new(descs.clone(), [("key", value)]).unwrap();
            assert_eq!(set.get_size("key").unwrap(), expected, "size {value}");
        }

        let result = PropertySet::new(descs, [("key", "1X")]).and_then(|s| s.get_size("key"));
        assert!(matches!(result, Err(PropertyError::Invalid { .. })));
    }

    #[test]
    fn test_fallback_accessors() {
        let explicit = PropertySet::new(
            [desc("aap.key", PropertyType::Integer, Some("42"))],
            [("aap.key", "43")],
        )
        .unwrap();
        assert_eq!(explicit.get_integer_or("aap.key", 66).unwrap(), 43);

        let default =
            PropertySet::with_defaults([desc("aap.key", PropertyType::Integer, Some("42"))])
                .unwrap();
        assert_eq!(default.get_integer_or("aap.key", 66).unwrap(), 42);

        for absent in [None, Some("")] {
            let set = PropertySet::with_defaults([desc("aap.key", PropertyType::Integer, absent)])
                .unwrap();
            assert_eq!(set.get_integer_or("aap.key", 66).unwrap(), 66);
            assert!(matches!(
                set.get_integer("aap.key"),
                Err(PropertyError::Invalid { .. })
            ));
        }
    }

    #[test]
    fn test_filter() {
        let set = PropertySet::new(two_keys(), [("aap.key", "aap2"), ("noot.key", "noot2")]).unwrap();
        assert_eq!(set.filter("aap").to_string(), "{aap.key=aap2}");

        let defaults = PropertySet::with_defaults(two_keys()).unwrap();
        assert_eq!(defaults.filter("aap").to_string(), "{<<aap.key=aap>>}");
        assert_eq!(defaults.filter("bla").to_string(), "{}");
        assert!(!defaults.filter("aap").supports_property("noot.key"));
    }

    #[test]
    fn test_exclude() {
        let set = PropertySet::new(two_keys(), [("aap.key", "aap2"), ("noot.key", "noot2")]).unwrap();
        assert_eq!(set.exclude("noot").to_string(), "{aap.key=aap2}");

        let defaults = PropertySet::with_defaults(two_keys()).unwrap();
        assert_eq!(defaults.exclude("noot").to_string(), "{<<aap.key=aap>>}");
        assert_eq!(defaults.exclude("bla").property_names(), ["aap.key", "noot.key"]);
    }

    #[test]
    fn test_filter_and_exclude_partition_descriptors() {
        let descs = vec![
            desc("a.one", PropertyType::String, Some("1")),
            desc("b.two", PropertyType::Size, Some("2k")),
            desc("a.three", PropertyType::Boolean, None),
            desc("ab", PropertyType::Natural, Some("4")),
        ];
        let set = PropertySet::new(descs.clone(), [("a.three", "true")]).unwrap();

        for prefix in ["", "a", "a.", "b", "zzz", "ab"] {
            let kept = set.filter(prefix).supported_properties();
            let dropped = set.exclude(prefix).supported_properties();
            assert_eq!(kept.len() + dropped.len(), descs.len(), "prefix {prefix:?}");
            for d in &descs {
                let in_kept = kept.contains(d);
                let in_dropped = dropped.contains(d);
                assert!(in_kept != in_dropped, "{} in exactly one side", d.name());
            }
        }
    }

    #[test]
    fn test_clear_reverts_to_default() {
        let descs = vec![
            desc("aap.key", PropertyType::String, Some("aap")),
            desc("noot.key", PropertyType::String, Some("aap")),
        ];
        let set = PropertySet::new(descs, [("aap.key", "noot"), ("noot.key", "noot")]).unwrap();
        let cleared = set.clear("aap.");

        assert_eq!(cleared.to_string(), "{noot.key=noot, <<aap.key=aap>>}");
        assert_eq!(cleared.get_string("aap.key").unwrap(), "aap");
        assert!(!cleared.property_set("aap.key").unwrap());
        assert!(cleared.supports_property("aap.key"));

        // Nothing explicitly set under the prefix: no-op.
        assert_eq!(cleared.clear("aap.").to_string(), cleared.to_string());
    }

    #[test]
    fn test_names_and_descriptors_in_declaration_order() {
        let set = PropertySet::with_defaults(two_keys()).unwrap();
        assert_eq!(set.property_names(), ["aap.key", "noot.key"]);
        assert_eq!(set.supported_properties(), two_keys());
    }

    #[test]
    fn test_get_string() {
        let set = PropertySet::new(
            [
                desc("aap.key", PropertyType::String, Some("aap")),
                desc("noot.key", PropertyType::String, Some("aap")),
            ],
            [("aap.key", "noot")],
        )
        .unwrap();
        assert_eq!(set.get_string("aap.key").unwrap(), "noot");
        assert_eq!(set.get_string("noot.key").unwrap(), "aap");
    }

    #[test]
    fn test_print_properties() {
        let descs = vec![
            desc("aap.key", PropertyType::String, Some("aap")),
            desc("noot.key", PropertyType::String, Some("aap")),
        ];
        let set = PropertySet::new(descs.clone(), [("aap.key", "noot")]).unwrap();

        let mut out = Vec::new();
        set.print_properties(&mut out, None).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "aap.key = noot\nnoot.key = aap\n");

        let mut out = Vec::new();
        set.print_properties(&mut out, Some("noot.")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "noot.key = aap\n");

        // The prefix matches names, never values.
        let upper = PropertySet::new(descs, [("aap.key", "NOOT")]).unwrap();
        let mut out = Vec::new();
        upper.print_properties(&mut out, Some("noot.")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "noot.key = aap\n");
    }

    #[test]
    fn test_with_overrides() {
        let base = PropertySet::new(
            [
                desc("buffer", PropertyType::Size, Some("64k")),
                desc("parallel", PropertyType::Natural, Some("4")),
            ],
            [("parallel", "2")],
        )
        .unwrap();

        let next = base.with_overrides([("buffer", "1m"), ("parallel", "8")]).unwrap();
        assert_eq!(next.get_size("buffer").unwrap(), 1024 * 1024);
        assert_eq!(next.get_natural("parallel").unwrap(), 8);
        assert_eq!(next.to_string(), "{parallel=8, buffer=1m}");
        // Original untouched.
        assert_eq!(base.get_natural("parallel").unwrap(), 2);

        assert!(matches!(
            base.with_overrides([("nope", "1")]),
            Err(PropertyError::Unknown { .. })
        ));
        assert!(matches!(
            base.with_overrides([("parallel", "-1")]),
            Err(PropertyError::Invalid { .. })
        ));
    }
}

//! Adaptor descriptors and the immutable adaptor registry.

use fileway_props::{PropertyDescription, PropertySet};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::credentials::CredentialsAdaptor;
use crate::error::{FilesError, FilesResult};
use crate::ops::FilesAdaptor;

/// A backend bundle: name, schemes, properties and capability facets.
pub struct Adaptor {
    name: String,
    description: String,
    schemes: Vec<String>,
    properties: PropertySet,
    files: Option<Arc<dyn FilesAdaptor>>,
    credentials: Option<Arc<dyn CredentialsAdaptor>>,
}

impl fmt::Debug for Adaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adaptor")
            .field("name", &self.name)
            .field("schemes", &self.schemes)
            .field("properties", &self.properties.to_string())
            .field("files", &self.files.is_some())
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

impl Adaptor {
    /// Create an adaptor with no facets.
    ///
    /// Schemes are matched case-insensitively; the empty string is a valid
    /// scheme.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schemes: impl IntoIterator<Item = impl Into<String>>,
        properties: PropertySet,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schemes: schemes
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
            properties,
            files: None,
            credentials: None,
        }
    }

    /// Attach the files facet.
    pub fn with_files(mut self, files: Arc<dyn FilesAdaptor>) -> Self {
        self.files = Some(files);
        self
    }

    /// Attach the credentials facet.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialsAdaptor>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Schemes this adaptor answers to, lowercased.
    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn supports_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.to_ascii_lowercase();
        self.schemes.iter().any(|s| *s == scheme)
    }

    /// Engine-level properties of this adaptor.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// The files facet.
    pub fn files(&self) -> FilesResult<Arc<dyn FilesAdaptor>> {
        self.files
            .clone()
            .ok_or_else(|| FilesError::unsupported(&self.name, "files"))
    }

    /// The credentials facet.
    pub fn credentials(&self) -> FilesResult<Arc<dyn CredentialsAdaptor>> {
        self.credentials
            .clone()
            .ok_or_else(|| FilesError::unsupported(&self.name, "credentials"))
    }
}

/// Builds one adaptor at engine start.
pub trait AdaptorFactory: Send + Sync {
    /// Adaptor name; properties live under `fileway.adaptors.<name>.`.
    fn name(&self) -> &str;

    /// Descriptors with fully qualified names.
    fn supported_properties(&self) -> Vec<PropertyDescription>;

    /// Build the adaptor from its slice of the engine properties.
    fn create(&self, properties: PropertySet) -> FilesResult<Adaptor>;
}

/// Name and scheme lookup over the registered adaptors.
///
/// Built once by the engine and never mutated afterwards.
pub struct AdaptorRegistry {
    adaptors: IndexMap<String, Arc<Adaptor>>,
    schemes: HashMap<String, String>,
}

impl fmt::Debug for AdaptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptorRegistry")
            .field("adaptors", &self.adaptors.keys().collect::<Vec<_>>())
            .field("schemes", &self.schemes)
            .finish()
    }
}

impl AdaptorRegistry {
    /// Build a registry. Names and schemes must be unique.
    pub fn build(adaptors: impl IntoIterator<Item = Adaptor>) -> FilesResult<Self> {
        let mut by_name = IndexMap::new();
        let mut schemes = HashMap::new();
        for adaptor in adaptors {
            if by_name.contains_key(adaptor.name()) {
                return Err(FilesError::DuplicateAdaptor(format!(
                    "adaptor name {}",
                    adaptor.name()
                )));
            }
            for scheme in adaptor.schemes() {
                if let Some(owner) = schemes.insert(scheme.clone(), adaptor.name().to_string()) {
                    return Err(FilesError::DuplicateAdaptor(format!(
                        "scheme {scheme:?} claimed by {owner} and {}",
                        adaptor.name()
                    )));
                }
            }
            by_name.insert(adaptor.name().to_string(), Arc::new(adaptor));
        }
        Ok(Self {
            adaptors: by_name,
            schemes,
        })
    }

    /// Adaptor by name.
    pub fn get(&self, name: &str) -> Option<Arc<Adaptor>> {
        self.adaptors.get(name).cloned()
    }

    /// Adaptor answering to `scheme` (case-insensitive).
    pub fn for_scheme(&self, scheme: &str) -> FilesResult<Arc<Adaptor>> {
        self.schemes
            .get(&scheme.to_ascii_lowercase())
            .and_then(|name| self.get(name))
            .ok_or_else(|| FilesError::UnknownScheme(scheme.to_string()))
    }

    /// Registered adaptors, in registration order.
    pub fn adaptors(&self) -> impl Iterator<Item = &Arc<Adaptor>> {
        self.adaptors.values()
    }

    pub fn len(&self) -> usize {
        self.adaptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adaptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str, schemes: &[&str]) -> Adaptor {
        Adaptor::new(name, "test", schemes.iter().copied(), PropertySet::default())
    }

    #[test]
    fn test_scheme_lookup_is_case_insensitive() {
        let registry = AdaptorRegistry::build([bare("local", &["file", "local", ""]), bare("ssh", &["SSH", "sftp"])])
            .unwrap();
        assert_eq!(registry.for_scheme("FILE").unwrap().name(), "local");
        assert_eq!(registry.for_scheme("").unwrap().name(), "local");
        assert_eq!(registry.for_scheme("ssh").unwrap().name(), "ssh");
        assert!(matches!(
            registry.for_scheme("gopher"),
            Err(FilesError::UnknownScheme(_))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(matches!(
            AdaptorRegistry::build([bare("a", &["x"]), bare("a", &["y"])]),
            Err(FilesError::DuplicateAdaptor(_))
        ));
        assert!(matches!(
            AdaptorRegistry::build([bare("a", &["x"]), bare("b", &["X"])]),
            Err(FilesError::DuplicateAdaptor(_))
        ));
    }

    #[test]
    fn test_missing_facets_are_unsupported() {
        let adaptor = bare("gridftp", &["gsiftp"]);
        assert!(adaptor.files().err().expect("expected Err").is_unsupported());
        assert!(adaptor.credentials().err().expect("expected Err").is_unsupported());
        assert!(adaptor.supports_scheme("GSIFTP"));
    }
}

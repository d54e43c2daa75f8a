//! Filesystem handles.

use fileway_props::PropertySet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::credentials::Credential;
use crate::path::{Path, RelativePath};

/// One logical connection opened by an adaptor.
///
/// Cheap to clone. Equality and hashing use only the adaptor name and the
/// unique id, so two handles for the same connection compare equal even if
/// they carry different credentials, properties or entry paths.
#[derive(Clone)]
pub struct FileSystem(Arc<FileSystemInner>);

struct FileSystemInner {
    adaptor: String,
    id: String,
    location: String,
    entry_path: RelativePath,
    credential: Credential,
    properties: PropertySet,
}

impl FileSystem {
    /// Create a handle. Called by adaptors from `new_file_system`.
    pub fn new(
        adaptor: impl Into<String>,
        id: impl Into<String>,
        location: impl Into<String>,
        entry_path: RelativePath,
        credential: Credential,
        properties: PropertySet,
    ) -> Self {
        Self(Arc::new(FileSystemInner {
            adaptor: adaptor.into(),
            id: id.into(),
            location: location.into(),
            entry_path,
            credential,
            properties,
        }))
    }

    /// Same connection, different entry path.
    pub fn with_entry_path(&self, entry_path: RelativePath) -> Self {
        Self(Arc::new(FileSystemInner {
            adaptor: self.0.adaptor.clone(),
            id: self.0.id.clone(),
            location: self.0.location.clone(),
            entry_path,
            credential: self.0.credential.clone(),
            properties: self.0.properties.clone(),
        }))
    }

    /// Name of the adaptor that opened this handle.
    pub fn adaptor_name(&self) -> &str {
        &self.0.adaptor
    }

    /// Adaptor-unique id of the connection.
    pub fn unique_id(&self) -> &str {
        &self.0.id
    }

    /// Location passed to `new_file_system`.
    pub fn location(&self) -> &str {
        &self.0.location
    }

    /// Absolute path relative paths resolve against.
    pub fn entry_path(&self) -> &RelativePath {
        &self.0.entry_path
    }

    /// The entry path as a [`Path`] on this filesystem.
    pub fn entry(&self) -> Path {
        Path::new(self, self.0.entry_path.clone())
    }

    /// Credential used to open the connection.
    pub fn credential(&self) -> &Credential {
        &self.0.credential
    }

    /// Effective properties (adaptor defaults layered with caller values).
    pub fn properties(&self) -> &PropertySet {
        &self.0.properties
    }
}

impl PartialEq for FileSystem {
    fn eq(&self, other: &Self) -> bool {
        self.0.adaptor == other.0.adaptor && self.0.id == other.0.id
    }
}

impl Eq for FileSystem {}

impl Hash for FileSystem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.adaptor.hash(state);
        self.0.id.hash(state);
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("adaptor", &self.0.adaptor)
            .field("id", &self.0.id)
            .field("location", &self.0.location)
            .field("entry_path", &self.0.entry_path.to_string())
            .field("credential", &self.0.credential.kind())
            .finish()
    }
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.adaptor, self.0.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileway_props::{PropertyDescription, PropertyType};
    use std::collections::HashSet;

    fn props(value: &str) -> PropertySet {
        PropertySet::new(
            [PropertyDescription::new("k", PropertyType::String, None, "test")],
            [("k", value)],
        )
        .unwrap()
    }

    #[test]
    fn test_equality_ignores_credentials_and_properties() {
        let a = FileSystem::new(
            "ssh",
            "ssh-1",
            "host",
            RelativePath::root(),
            Credential::Default,
            props("a"),
        );
        let b = FileSystem::new(
            "ssh",
            "ssh-1",
            "other",
            RelativePath::new("/home"),
            Credential::Password {
                username: "u".into(),
                password: "p".into(),
            },
            props("b"),
        );
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));

        let c = FileSystem::new("ftp", "ssh-1", "host", RelativePath::root(), Credential::Default, props("a"));
        assert_ne!(a, c);
    }

    #[test]
    fn test_with_entry_path_keeps_identity() {
        let fs = FileSystem::new(
            "local",
            "local-0",
            "/",
            RelativePath::root(),
            Credential::Default,
            PropertySet::default(),
        );
        let moved = fs.with_entry_path(RelativePath::new("/tmp"));
        assert_eq!(fs, moved);
        assert_eq!(moved.entry().absolute().to_string(), "/tmp");
    }
}

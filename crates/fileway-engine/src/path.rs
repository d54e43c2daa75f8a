//! Paths within a filesystem handle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filesystem::FileSystem;

/// A normalized `/`-separated path.
///
/// Absolute paths start at the filesystem root; relative paths are resolved
/// against an entry path. `.` elements are dropped and `..` pops one element,
/// never above the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelativePath {
    elements: Vec<String>,
    absolute: bool,
}

impl RelativePath {
    /// Parse and normalize a path string.
    pub fn new(path: &str) -> Self {
        let mut out = Self {
            elements: Vec::new(),
            absolute: path.starts_with('/'),
        };
        for element in path.split('/') {
            out.push(element);
        }
        out
    }

    /// The absolute root path `/`.
    pub fn root() -> Self {
        Self {
            elements: Vec::new(),
            absolute: true,
        }
    }

    fn push(&mut self, element: &str) {
        match element {
            "" | "." => {}
            ".." => {
                self.elements.pop();
            }
            name => self.elements.push(name.to_string()),
        }
    }

    /// True if this path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True for `/` (and the empty relative path).
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// Path elements, outermost first.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Last element, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.elements.last().map(String::as_str)
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.elements.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.elements.pop();
        Some(parent)
    }

    /// Resolve `other` against this path.
    ///
    /// An absolute `other` replaces this path; a relative one is appended.
    pub fn resolve(&self, other: &RelativePath) -> Self {
        if other.absolute {
            return other.clone();
        }
        let mut out = self.clone();
        for element in &other.elements {
            out.push(element);
        }
        out
    }

    /// Append a single element (or a relative path string).
    pub fn join(&self, path: &str) -> Self {
        self.resolve(&RelativePath::new(path.trim_start_matches('/')))
    }

    /// True if `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &RelativePath) -> bool {
        self.absolute == prefix.absolute && self.elements.starts_with(&prefix.elements)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        f.write_str(&self.elements.join("/"))
    }
}

impl From<&str> for RelativePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A location within a [`FileSystem`].
///
/// The owning adaptor resolves the relative part against the filesystem's
/// entry path; [`Path::absolute`] does that resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    filesystem: FileSystem,
    relative: RelativePath,
}

impl Path {
    /// Create a path on `filesystem`.
    pub fn new(filesystem: &FileSystem, relative: impl Into<RelativePath>) -> Self {
        Self {
            filesystem: filesystem.clone(),
            relative: relative.into(),
        }
    }

    /// The filesystem handle this path belongs to.
    pub fn filesystem(&self) -> &FileSystem {
        &self.filesystem
    }

    /// Name of the adaptor owning this path.
    pub fn adaptor_name(&self) -> &str {
        self.filesystem.adaptor_name()
    }

    /// The path as given, before resolution.
    pub fn relative(&self) -> &RelativePath {
        &self.relative
    }

    /// The path resolved against the filesystem's entry path.
    pub fn absolute(&self) -> RelativePath {
        self.filesystem.entry_path().resolve(&self.relative)
    }

    /// A sibling-or-child path on the same filesystem.
    pub fn resolve(&self, other: impl Into<RelativePath>) -> Path {
        Path {
            filesystem: self.filesystem.clone(),
            relative: self.absolute().resolve(&other.into()),
        }
    }

    /// Parent directory; `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        self.absolute().parent().map(|relative| Path {
            filesystem: self.filesystem.clone(),
            relative,
        })
    }

    /// Last element of the resolved path.
    pub fn file_name(&self) -> Option<String> {
        self.absolute().file_name().map(str::to_string)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.filesystem.location();
        if location.is_empty() || location == "/" {
            write!(f, "{}://{}", self.adaptor_name(), self.absolute())
        } else {
            write!(f, "{}://{}{}", self.adaptor_name(), location, self.absolute())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(RelativePath::new("/a/./b//c/").to_string(), "/a/b/c");
        assert_eq!(RelativePath::new("a/b/../c").to_string(), "a/c");
        assert_eq!(RelativePath::new("/../..").to_string(), "/");
        assert_eq!(RelativePath::new("").to_string(), "");
        assert!(RelativePath::new("/").is_root());
    }

    #[test]
    fn test_resolve() {
        let entry = RelativePath::new("/home/user");
        assert_eq!(entry.resolve(&"docs/a.txt".into()).to_string(), "/home/user/docs/a.txt");
        assert_eq!(entry.resolve(&"/tmp".into()).to_string(), "/tmp");
        assert_eq!(entry.resolve(&"../other".into()).to_string(), "/home/other");
        assert_eq!(entry.join("/x").to_string(), "/home/user/x");
    }

    #[test]
    fn test_parent_and_name() {
        let path = RelativePath::new("/a/b");
        assert_eq!(path.file_name(), Some("b"));
        assert_eq!(path.parent().map(|p| p.to_string()), Some("/a".to_string()));
        assert_eq!(RelativePath::root().parent(), None);
    }

    #[test]
    fn test_starts_with() {
        let base = RelativePath::new("/a/b");
        assert!(RelativePath::new("/a/b/c").starts_with(&base));
        assert!(base.starts_with(&base));
        assert!(!RelativePath::new("/a/bc").starts_with(&base));
        assert!(!RelativePath::new("a/b/c").starts_with(&base));
    }
}

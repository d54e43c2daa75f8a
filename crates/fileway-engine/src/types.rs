//! File attributes, permissions and operation options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::SystemTime;
use strum::IntoEnumIterator;

use crate::error::{FilesError, FilesResult};
use crate::path::Path;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Device, socket, fifo, ...
    Other,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// One POSIX permission bit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PosixFilePermission {
    OwnerRead,
    OwnerWrite,
    OwnerExecute,
    GroupRead,
    GroupWrite,
    GroupExecute,
    OthersRead,
    OthersWrite,
    OthersExecute,
}

impl PosixFilePermission {
    /// The mode bit for this permission.
    pub fn bit(self) -> u32 {
        match self {
            Self::OwnerRead => 0o400,
            Self::OwnerWrite => 0o200,
            Self::OwnerExecute => 0o100,
            Self::GroupRead => 0o040,
            Self::GroupWrite => 0o020,
            Self::GroupExecute => 0o010,
            Self::OthersRead => 0o004,
            Self::OthersWrite => 0o002,
            Self::OthersExecute => 0o001,
        }
    }

    /// Permission set encoded in the low nine bits of `mode`.
    pub fn from_mode(mode: u32) -> BTreeSet<Self> {
        Self::iter().filter(|p| mode & p.bit() != 0).collect()
    }

    /// Numeric mode for a permission set.
    pub fn to_mode(permissions: &BTreeSet<Self>) -> u32 {
        permissions.iter().fold(0, |mode, p| mode | p.bit())
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// File type.
    pub kind: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Creation time, if the backend tracks it.
    pub creation_time: Option<SystemTime>,
    /// Last access time, if the backend tracks it.
    pub last_access_time: Option<SystemTime>,
    /// Last modification time.
    pub last_modified_time: SystemTime,
    /// Owner (user id or name, backend dependent).
    pub owner: Option<String>,
    /// Group (group id or name, backend dependent).
    pub group: Option<String>,
    /// POSIX permission set.
    pub permissions: BTreeSet<PosixFilePermission>,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    /// Name starts with a dot.
    pub hidden: bool,
}

impl FileAttributes {
    /// Attributes for a fresh in-memory entry.
    pub fn new(kind: FileType, size: u64, mode: u32) -> Self {
        let now = SystemTime::now();
        let permissions = PosixFilePermission::from_mode(mode);
        Self {
            kind,
            size,
            creation_time: Some(now),
            last_access_time: Some(now),
            last_modified_time: now,
            owner: None,
            group: None,
            readable: permissions.contains(&PosixFilePermission::OwnerRead),
            writable: permissions.contains(&PosixFilePermission::OwnerWrite),
            executable: permissions.contains(&PosixFilePermission::OwnerExecute),
            permissions,
            hidden: false,
        }
    }

    /// Replace the permission set and the derived owner flags.
    pub fn set_permissions(&mut self, permissions: BTreeSet<PosixFilePermission>) {
        self.readable = permissions.contains(&PosixFilePermission::OwnerRead);
        self.writable = permissions.contains(&PosixFilePermission::OwnerWrite);
        self.executable = permissions.contains(&PosixFilePermission::OwnerExecute);
        self.permissions = permissions;
    }

    /// Numeric mode of the permission set.
    pub fn mode(&self) -> u32 {
        PosixFilePermission::to_mode(&self.permissions)
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

/// A directory entry together with its attributes.
#[derive(Debug, Clone)]
pub struct PathAttributesPair {
    pub path: Path,
    pub attributes: FileAttributes,
}

// ============================================================================
// Open options
// ============================================================================

/// Options for `new_output_stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum OpenOption {
    /// Create a new file, fail if it exists.
    Create,
    /// Create the file if it does not exist.
    OpenOrCreate,
    /// Open an existing file, fail if it does not exist.
    Open,
    /// Write at the end of the file.
    Append,
    /// Truncate the file before writing.
    Truncate,
    /// Open for writing (implied by output streams).
    Write,
}

/// How the target file is found or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    OpenOrCreate,
    Open,
}

/// A validated set of [`OpenOption`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPlan {
    pub mode: OpenMode,
    /// Append when true, truncate otherwise.
    pub append: bool,
}

impl OpenOption {
    /// Validate and collapse a list of options.
    ///
    /// At most one open mode (default `OpenOrCreate`) and at most one of
    /// `Append`/`Truncate` (default `Truncate`). Repeating an option is fine.
    pub fn resolve(options: &[OpenOption]) -> FilesResult<OpenPlan> {
        let mut mode = None;
        let mut append = None;
        for option in options {
            match option {
                Self::Create | Self::OpenOrCreate | Self::Open => {
                    let next = match option {
                        Self::Create => OpenMode::Create,
                        Self::Open => OpenMode::Open,
                        _ => OpenMode::OpenOrCreate,
                    };
                    if mode.is_some_and(|m| m != next) {
                        return Err(FilesError::invalid_options(format!(
                            "conflicting open modes in {options:?}"
                        )));
                    }
                    mode = Some(next);
                }
                Self::Append | Self::Truncate => {
                    let next = *option == Self::Append;
                    if append.is_some_and(|a| a != next) {
                        return Err(FilesError::invalid_options(
                            "Append and Truncate are mutually exclusive",
                        ));
                    }
                    append = Some(next);
                }
                Self::Write => {}
            }
        }
        Ok(OpenPlan {
            mode: mode.unwrap_or(OpenMode::OpenOrCreate),
            append: append.unwrap_or(false),
        })
    }
}

// ============================================================================
// Copy options
// ============================================================================

/// Options for `copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CopyOption {
    /// Fail if the target exists (default).
    Create,
    /// Overwrite the target.
    Replace,
    /// Skip the copy if the target exists.
    Ignore,
    /// Append the source to the target.
    Append,
    /// Continue a partial target.
    Resume,
    /// Return immediately and copy in the background.
    Asynchronous,
}

/// What to do with an existing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CopyMode {
    Create,
    Replace,
    Ignore,
    Append,
    Resume,
}

/// A validated set of [`CopyOption`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyPlan {
    pub mode: CopyMode,
    pub asynchronous: bool,
}

impl CopyOption {
    /// Validate and collapse a list of options.
    pub fn resolve(options: &[CopyOption]) -> FilesResult<CopyPlan> {
        let mut mode = None;
        let mut asynchronous = false;
        for option in options {
            let next = match option {
                Self::Asynchronous => {
                    asynchronous = true;
                    continue;
                }
                Self::Create => CopyMode::Create,
                Self::Replace => CopyMode::Replace,
                Self::Ignore => CopyMode::Ignore,
                Self::Append => CopyMode::Append,
                Self::Resume => CopyMode::Resume,
            };
            match mode {
                Some(current) if current != next => {
                    return Err(FilesError::invalid_options(format!(
                        "copy options {current} and {next} are mutually exclusive"
                    )));
                }
                _ => {}
            }
            mode = Some(next);
        }
        Ok(CopyPlan {
            mode: mode.unwrap_or(CopyMode::Create),
            asynchronous,
        })
    }
}

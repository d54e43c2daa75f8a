//! Built-in adaptors.
//!
//! - [`LocalAdaptor`] - the host filesystem (schemes `file`, `local`, empty)
//! - [`MemoryAdaptor`] - named in-process stores (scheme `memory`)

mod local;
mod memory;

pub use local::{LOCAL_SCHEMES, LocalAdaptor, LocalCredentials, LocalFiles};
pub use memory::{MEMORY_ADAPTOR_NAME, MEMORY_SCHEMES, MemoryAdaptor, MemoryCredentials, MemoryFiles};

pub(crate) use local::LocalDisk;

use fileway_props::{PropertyDescription, PropertyType};

use crate::copy::{
    COPY_BUFFER_PROPERTY, COPY_PARALLEL_PROPERTY, DEFAULT_COPY_BUFFER, DEFAULT_COPY_PARALLEL,
};

/// Copy tuning descriptors, named under `prefix`.
pub(crate) fn copy_properties(prefix: &str) -> Vec<PropertyDescription> {
    vec![
        PropertyDescription::new(
            format!("{prefix}{COPY_BUFFER_PROPERTY}"),
            PropertyType::Size,
            Some(DEFAULT_COPY_BUFFER),
            "Chunk size used when copying data.",
        ),
        PropertyDescription::new(
            format!("{prefix}{COPY_PARALLEL_PROPERTY}"),
            PropertyType::Natural,
            Some(DEFAULT_COPY_PARALLEL),
            "Maximum number of copies running at the same time.",
        ),
    ]
}

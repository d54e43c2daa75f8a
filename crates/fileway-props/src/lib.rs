//! # fileway-props
//!
//! Typed, defaulted configuration properties for fileway adaptors.
//!
//! Each adaptor declares the properties it understands as a list of
//! [`PropertyDescription`]s. Callers supply explicit string values, which a
//! [`PropertySet`] validates eagerly against the declared types and merges
//! with the descriptor defaults.
//!
//! ```
//! use fileway_props::{PropertyDescription, PropertySet, PropertyType};
//!
//! let descs = [PropertyDescription::new(
//!     "copy.buffer",
//!     PropertyType::Size,
//!     Some("64k"),
//!     "Copy chunk size",
//! )];
//! let props = PropertySet::new(descs, [("copy.buffer", "1m")]).unwrap();
//! assert_eq!(props.get_size("copy.buffer").unwrap(), 1024 * 1024);
//! ```

mod description;
mod error;
mod parse;
mod set;

pub use description::{PropertyDescription, PropertyType};
pub use error::{PropertyError, PropertyResult};
pub use set::{PropertyEntry, PropertySet};

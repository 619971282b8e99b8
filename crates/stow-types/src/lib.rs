//! Foundation types for Stow.
//!
//! Stow exposes one file-management contract over interchangeable storage
//! backends. This crate holds the value types every backend speaks:
//!
//! - [`FileRef`] -- flat descriptor returned by a low-level upload
//! - [`FileNode`] -- tree-capable descriptor, leaf (file) or directory
//! - [`AltVariant`] -- secondary artifact kept next to a converted primary
//! - [`FileTreeBuilder`] -- nests a flat list of [`FileRef`]s into one tree
//!
//! Both descriptors serialize to the flat JSON sidecar record (`name`, `path`,
//! `size`, `mime_type`, `alt_*`, `is_file`, `children`) that other tooling
//! parses directly, so field names and nullability are part of the contract.

pub mod error;
pub mod file;
pub mod tree;

pub use error::{TypeError, TypeResult};
pub use file::{AltVariant, FileNode, FileRef};
pub use tree::FileTreeBuilder;

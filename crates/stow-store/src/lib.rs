//! File storage backends for Stow.
//!
//! One contract, [`FileStore`], over two backends:
//!
//! - [`LocalFileStore`] -- a directory tree on the local filesystem
//! - [`S3FileStore`] -- an S3-compatible bucket behind the [`ObjectClient`] seam
//!
//! Both compose the same parts ([`StoreParts`]): a [`PathSanitizer`] guarding
//! every caller-supplied path, a [`ContentCipher`] sealing payloads at rest,
//! [`SidecarNaming`] for metadata records, and an upload [`SizeLimit`].
//!
//! # Design Rules
//!
//! 1. Every path and name is sanitized before any backend call; sanitizer
//!    errors always reach the caller.
//! 2. Payload first, sidecar second. The pair is never updated atomically.
//! 3. Payload outcomes are authoritative; sidecar failures during copy, move
//!    and delete are logged and swallowed.
//! 4. Listings read sidecars only. A payload without a readable sidecar is
//!    left out of the result.
//! 5. Sizes in sidecars are plaintext sizes, whatever the cipher does.
//!
//! [`ContentCipher`]: stow_crypto::ContentCipher

pub mod config;
pub mod error;
mod listing;
pub mod local;
pub mod mime;
pub mod s3;
pub mod sanitize;
pub mod sidecar;
pub mod traits;
pub mod upload;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{StoreConfig, StoreParts};
pub use error::{StoreError, StoreResult};
pub use local::LocalFileStore;
pub use s3::{Bucket, ImageConverter, InMemoryObjectClient, ObjectClient, S3FileStore};
pub use sanitize::PathSanitizer;
pub use sidecar::SidecarNaming;
pub use traits::FileStore;
pub use upload::{FileContent, SizeLimit, Upload};

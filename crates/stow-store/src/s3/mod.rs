//! S3-compatible backend.
//!
//! The object store is reached through the [`ObjectClient`] seam, which
//! carries only the six calls the store needs. [`Bucket`] layers key
//! prefixing, pagination and uploads (with optional image conversion) on
//! top of it, and [`S3FileStore`] implements the store contract with
//! sidecar objects next to every payload.

pub mod bucket;
pub mod client;
pub mod memory;
pub mod store;

pub use bucket::{Bucket, ImageConverter};
pub use client::{ListPage, ObjectClient, ObjectData, ObjectHead};
pub use memory::InMemoryObjectClient;
pub use store::S3FileStore;

use std::path::Path;

use async_trait::async_trait;
use stow_types::FileNode;

use crate::error::StoreResult;
use crate::upload::{FileContent, Upload};

/// Uniform file-management contract implemented by every backend.
///
/// All implementations must satisfy these invariants:
/// - Every caller-supplied path, folder and file name goes through the
///   store's `PathSanitizer` first; sanitizer errors are always returned.
/// - Payloads pass through the store's `ContentCipher` on write and read.
///   Sizes recorded in sidecars are the original, unencrypted sizes.
/// - Payload operations decide the result. Sidecar failures during copy,
///   move and delete are logged and swallowed.
/// - Boolean operations report payload failure as `Ok(false)`.
/// - Sidecars are not payloads: a path whose last segment ends with the
///   sidecar suffix is rejected with `InvalidInput`.
/// - Copying or moving a path onto itself fails with `Ok(false)` and
///   leaves the payload untouched.
/// - No in-process locking: concurrent writers to one path race at the
///   backend, and payload plus sidecar are never updated as a unit.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store an uploaded payload under `folder` and record its sidecar.
    async fn write(&self, upload: Upload, folder: &str) -> StoreResult<FileNode>;

    /// Store an existing local file under `folder`.
    ///
    /// Returns `NotFound` if `source` does not exist.
    async fn write_local(&self, source: &Path, folder: &str) -> StoreResult<FileNode>;

    /// Read and decrypt a payload.
    ///
    /// Returns `NotFound` if the payload does not exist.
    async fn read(&self, path: &str) -> StoreResult<FileContent>;

    /// Direct children of `folder`: files from their sidecars, sub-folders
    /// as bare directory nodes.
    async fn list(&self, folder: &str) -> StoreResult<Vec<FileNode>>;

    /// Everything below `folder`, nested into directory nodes.
    async fn list_recursive(&self, folder: &str) -> StoreResult<Vec<FileNode>>;

    /// Whether a payload (or folder) exists at `path`.
    async fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Copy a payload and, best-effort, its sidecar.
    async fn copy(&self, source: &str, destination: &str) -> StoreResult<bool>;

    /// Move a payload and, best-effort, its sidecar.
    async fn move_to(&self, source: &str, destination: &str) -> StoreResult<bool>;

    /// Delete a payload with its sidecar, or a whole folder.
    ///
    /// Returns `Ok(false)` if nothing exists at `path`.
    async fn delete(&self, path: &str) -> StoreResult<bool>;
}

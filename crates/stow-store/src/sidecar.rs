//! Metadata sidecars.
//!
//! Every stored payload has a small JSON record next to it, keyed by the
//! payload's full path plus a fixed suffix (`a/b.txt` -> `a/b.txt.meta`).
//! The record is a serialized [`FileNode`] carrying the original,
//! unencrypted size, the mime type and the alt variant, so listings never
//! need to read payloads.
//!
//! Sidecars are written after their payload and removed after it. The pair
//! is never updated atomically: a failure in between leaves a payload with
//! a stale or missing record, and such payloads drop out of listings.

use stow_types::FileNode;

use crate::error::{StoreError, StoreResult};

/// Default sidecar suffix.
pub const DEFAULT_SUFFIX: &str = ".meta";

/// Content type sidecars are stored with.
pub const SIDECAR_CONTENT_TYPE: &str = "application/json";

/// Maps payload paths to sidecar paths and recognizes sidecars in listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarNaming {
    suffix: String,
}

impl SidecarNaming {
    /// Naming with a custom suffix, e.g. `".meta.json"`.
    pub fn new(suffix: impl Into<String>) -> StoreResult<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() || suffix.contains('/') {
            return Err(StoreError::InvalidInput(format!(
                "sidecar suffix {suffix:?} must be non-empty and contain no '/'"
            )));
        }
        Ok(Self { suffix })
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Sidecar path for a payload path.
    pub fn sidecar_for(&self, payload: &str) -> String {
        format!("{payload}{}", self.suffix)
    }

    /// Whether a path or key names a sidecar.
    pub fn is_sidecar(&self, path: &str) -> bool {
        path.ends_with(&self.suffix)
    }
}

impl Default for SidecarNaming {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

/// Serialize a node into its sidecar record.
pub fn encode(node: &FileNode) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(node)?)
}

/// Parse a sidecar record.
pub fn decode(bytes: &[u8]) -> StoreResult<FileNode> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Rewrite a record for a payload that now lives at `path`.
pub fn relocate(mut node: FileNode, path: &str) -> FileNode {
    node.name = crate::sanitize::file_name_of(path).to_string();
    node.path = path.to_string();
    node
}

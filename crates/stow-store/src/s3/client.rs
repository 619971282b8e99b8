use async_trait::async_trait;

use crate::error::StoreResult;

/// Size and content type of a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_length: u64,
    pub content_type: Option<String>,
}

/// A fetched object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectData {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// One page of a prefix listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full keys, in the order the backend returns them.
    pub keys: Vec<String>,
    /// Continuation token for the next page, if any.
    pub next: Option<String>,
}

/// Minimal object-store client.
///
/// Keys are full object keys (prefix included). Absence is reported through
/// `Option`/`bool`, never as an error; errors mean the call itself failed.
/// Implementations must be safe to share across concurrent operations.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Metadata for `key`, or `None` if no object exists.
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>>;

    /// Contents of `key`, or `None` if no object exists.
    async fn get(&self, key: &str) -> StoreResult<Option<ObjectData>>;

    /// Create or replace `key`.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Server-side copy. Returns `false` if `from` does not exist.
    async fn copy(&self, from: &str, to: &str) -> StoreResult<bool>;

    /// Remove `key`. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// One page of keys starting with `prefix`. Pass the previous page's
    /// `next` token to continue.
    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> StoreResult<ListPage>;
}

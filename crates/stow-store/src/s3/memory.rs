use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::s3::client::{ListPage, ObjectClient, ObjectData, ObjectHead};

/// Default number of keys per listing page, matching S3.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory, BTreeMap-based object client.
///
/// Intended for tests and embedding. Keys list in lexicographic order and
/// listings are paged, with the last key of a page as continuation token.
pub struct InMemoryObjectClient {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    page_size: usize,
}

impl InMemoryObjectClient {
    /// Create a new empty client.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a client returning at most `page_size` keys per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Raw stored bytes of `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|obj| obj.data.clone())
    }
}

impl Default for InMemoryObjectClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectClient for InMemoryObjectClient {
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).map(|obj| ObjectHead {
            content_length: obj.data.len() as u64,
            content_type: Some(obj.content_type.clone()),
        }))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<ObjectData>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).map(|obj| ObjectData {
            data: obj.data.clone(),
            content_type: Some(obj.content_type.clone()),
        }))
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        let Some(obj) = map.get(from).cloned() else {
            return Ok(false);
        };
        map.insert(to.to_string(), obj);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> StoreResult<ListPage> {
        let map = self.objects.read().expect("lock poisoned");
        let start = match continuation {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Included(prefix.to_string()),
        };
        let mut keys: Vec<String> = map
            .range((start, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();
        let next = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, next })
    }
}

impl std::fmt::Debug for InMemoryObjectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectClient")
            .field("object_count", &self.len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_head_get() {
        let client = InMemoryObjectClient::new();
        assert!(client.is_empty());
        client.put("a/b.txt", b"hello".to_vec(), "text/plain").await.unwrap();

        let head = client.head("a/b.txt").await.unwrap().unwrap();
        assert_eq!(head.content_length, 5);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));

        let obj = client.get("a/b.txt").await.unwrap().unwrap();
        assert_eq!(obj.data, b"hello");
        assert!(client.get("missing").await.unwrap().is_none());
        assert!(client.head("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn copy_and_delete() {
        let client = InMemoryObjectClient::new();
        assert!(!client.copy("nope", "dst").await.unwrap());
        assert!(client.is_empty());

        client.put("src", b"x".to_vec(), "text/plain").await.unwrap();
        assert!(client.copy("src", "dst").await.unwrap());
        assert_eq!(client.raw("dst").unwrap(), b"x");
        assert!(client.delete("src").await.unwrap());
        assert!(!client.delete("src").await.unwrap());
        assert_eq!(client.keys(), ["dst"]);
    }

    #[tokio::test]
    async fn paged_listing() {
        let client = InMemoryObjectClient::with_page_size(2);
        for key in ["p/a", "p/b", "p/c", "q/d", "pz"] {
            client.put(key, Vec::new(), "text/plain").await.unwrap();
        }

        let first = client.list_page("p/", None).await.unwrap();
        assert_eq!(first.keys, ["p/a", "p/b"]);
        let token = first.next.unwrap();

        let second = client.list_page("p/", Some(&token)).await.unwrap();
        assert_eq!(second.keys, ["p/c"]);
        assert!(second.next.is_none());

        let all = client.list_page("", None).await.unwrap();
        assert_eq!(all.keys.len(), 2);
        assert!(all.next.is_some());
    }

    #[tokio::test]
    async fn exact_page_has_no_continuation() {
        let client = InMemoryObjectClient::with_page_size(2);
        client.put("a", Vec::new(), "x").await.unwrap();
        client.put("b", Vec::new(), "x").await.unwrap();
        let page = client.list_page("", None).await.unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(page.next.is_none());
    }
}

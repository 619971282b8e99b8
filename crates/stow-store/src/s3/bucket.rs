use std::sync::Arc;

use stow_crypto::ContentCipher;
use stow_types::{AltVariant, FileRef};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::mime;
use crate::s3::client::{ObjectClient, ObjectData};
use crate::sanitize::join_path;
use crate::upload::Upload;

/// Re-encodes raster images as webp.
pub trait ImageConverter: Send + Sync {
    fn to_webp(&self, image: &[u8]) -> StoreResult<Vec<u8>>;
}

/// A key namespace inside an object store.
///
/// Callers address objects by logical `/`-separated paths; the bucket
/// prepends its prefix exactly once to form keys, and strips it again when
/// listing. Logical paths are never URL-encoded.
#[derive(Clone)]
pub struct Bucket {
    client: Arc<dyn ObjectClient>,
    prefix: String,
    converter: Option<Arc<dyn ImageConverter>>,
}

impl Bucket {
    /// A bucket namespace under `prefix` (leading and trailing `/` ignored).
    pub fn new(client: Arc<dyn ObjectClient>, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.trim_matches('/').to_string(),
            converter: None,
        }
    }

    /// Convert uploaded raster images to webp, keeping the original as alt.
    pub fn with_converter(mut self, converter: Arc<dyn ImageConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key for a logical path.
    pub fn to_key(&self, path: &str) -> String {
        join_path(&self.prefix, path)
    }

    /// Logical path for an object key, or `None` if the key lies outside
    /// the namespace.
    pub fn to_path<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')
    }

    /// Key prefix matching everything below a logical folder.
    fn folder_prefix(&self, folder: &str) -> String {
        let key = self.to_key(folder);
        if key.is_empty() {
            key
        } else {
            format!("{key}/")
        }
    }

    // ------------------------------------------------------------------
    // Single-object operations
    // ------------------------------------------------------------------

    pub async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.client.head(&self.to_key(path)).await?.is_some())
    }

    pub async fn get(&self, path: &str) -> StoreResult<Option<ObjectData>> {
        self.client.get(&self.to_key(path)).await
    }

    /// Store `data` and return the stored object's size.
    pub async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> StoreResult<u64> {
        let key = self.to_key(path);
        self.client.put(&key, data, content_type).await?;
        let head = self
            .client
            .head(&key)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("object {key} missing after upload")))?;
        debug!(key = %key, size = head.content_length, "object stored");
        Ok(head.content_length)
    }

    /// Server-side copy. Copying a key onto itself is refused.
    pub async fn copy(&self, from: &str, to: &str) -> StoreResult<bool> {
        let (from, to) = (self.to_key(from), self.to_key(to));
        if from == to {
            return Ok(false);
        }
        self.client.copy(&from, &to).await
    }

    /// Copy then delete the source. A key is never moved onto itself.
    pub async fn move_object(&self, from: &str, to: &str) -> StoreResult<bool> {
        if !self.copy(from, to).await? {
            return Ok(false);
        }
        self.delete(from).await?;
        Ok(true)
    }

    pub async fn delete(&self, path: &str) -> StoreResult<bool> {
        self.client.delete(&self.to_key(path)).await
    }

    // ------------------------------------------------------------------
    // Prefix operations
    // ------------------------------------------------------------------

    /// Logical paths of every object below `folder`, in backend order.
    /// All pages are drained.
    pub async fn list(&self, folder: &str) -> StoreResult<Vec<String>> {
        let prefix = self.folder_prefix(folder);
        let mut paths = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .list_page(&prefix, continuation.as_deref())
                .await?;
            paths.extend(
                page.keys
                    .iter()
                    .filter_map(|key| self.to_path(key))
                    .map(str::to_string),
            );
            match page.next {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }
        Ok(paths)
    }

    /// Delete every object below `folder`. Returns how many were removed.
    pub async fn delete_prefix(&self, folder: &str) -> StoreResult<usize> {
        let mut deleted = 0;
        for path in self.list(folder).await? {
            if self.delete(&path).await? {
                deleted += 1;
            }
        }
        debug!(folder, deleted, "prefix deleted");
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------

    /// Store an upload as `folder/name`, sealing every artifact with
    /// `cipher`. `folder` and `name` must already be sanitized.
    ///
    /// Convertible images are stored as `<stem>.webp` with the original kept
    /// as the alt variant. Reported sizes are plaintext sizes.
    pub async fn upload(
        &self,
        upload: &Upload,
        folder: &str,
        name: &str,
        cipher: &ContentCipher,
    ) -> StoreResult<FileRef> {
        let content_type = mime::resolve(name, upload.content_type.as_deref());

        if let Some(webp) = self.convert(name, &content_type, &upload.data) {
            let webp_name = webp_name(name);
            let path = join_path(folder, &webp_name);
            let alt_path = join_path(folder, name);

            self.put(&path, cipher.encrypt(&webp)?, mime::WEBP).await?;
            self.put(&alt_path, cipher.encrypt(&upload.data)?, &content_type)
                .await?;

            let alt = AltVariant::new(name, alt_path, upload.size(), content_type);
            return Ok(
                FileRef::new(webp_name, path, webp.len() as u64, Some(mime::WEBP.to_string()))
                    .with_alt(alt),
            );
        }

        let path = join_path(folder, name);
        self.put(&path, cipher.encrypt(&upload.data)?, &content_type)
            .await?;
        Ok(FileRef::new(name, path, upload.size(), Some(content_type)))
    }

    fn convert(&self, name: &str, content_type: &str, data: &[u8]) -> Option<Vec<u8>> {
        let converter = self.converter.as_ref()?;
        if !mime::is_convertible_image(content_type) || webp_name(name) == name {
            return None;
        }
        match converter.to_webp(data) {
            Ok(webp) => Some(webp),
            Err(e) => {
                warn!(name, error = %e, "image conversion failed; storing original only");
                None
            }
        }
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("prefix", &self.prefix)
            .field("converts_images", &self.converter.is_some())
            .finish()
    }
}

/// `photo.png` -> `photo.webp`. A leading dot does not start an extension.
fn webp_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };
    format!("{stem}.webp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::memory::InMemoryObjectClient;
    use stow_crypto::CipherKey;

    struct PrefixConverter;

    impl ImageConverter for PrefixConverter {
        fn to_webp(&self, image: &[u8]) -> StoreResult<Vec<u8>> {
            Ok([b"RIFF".as_slice(), &image[..1]].concat())
        }
    }

    struct BrokenConverter;

    impl ImageConverter for BrokenConverter {
        fn to_webp(&self, _image: &[u8]) -> StoreResult<Vec<u8>> {
            Err(StoreError::Backend("decoder unavailable".into()))
        }
    }

    fn bucket(prefix: &str) -> (Arc<InMemoryObjectClient>, Bucket) {
        let client = Arc::new(InMemoryObjectClient::with_page_size(2));
        let bucket = Bucket::new(client.clone(), prefix);
        (client, bucket)
    }

    #[test]
    fn key_mapping() {
        let (_, b) = bucket("/tenant/");
        assert_eq!(b.prefix(), "tenant");
        assert_eq!(b.to_key("a/b.txt"), "tenant/a/b.txt");
        assert_eq!(b.to_key(""), "tenant");
        assert_eq!(b.to_path("tenant/a/b.txt"), Some("a/b.txt"));
        assert_eq!(b.to_path("tenants/a"), None);
        assert_eq!(b.to_key("tenant/x"), "tenant/tenant/x");

        let (_, bare) = bucket("");
        assert_eq!(bare.to_key("a"), "a");
        assert_eq!(bare.to_path("a"), Some("a"));
    }

    #[test]
    fn webp_names() {
        assert_eq!(webp_name("photo.png"), "photo.webp");
        assert_eq!(webp_name("archive.tar.gz"), "archive.tar.webp");
        assert_eq!(webp_name("noext"), "noext.webp");
        assert_eq!(webp_name(".png"), ".png.webp");
    }

    #[tokio::test]
    async fn list_drains_pages_and_scopes_folder() {
        let (client, b) = bucket("p");
        for key in ["p/a/1", "p/a/2", "p/a/3", "p/ab", "p/b/4", "other/a/5"] {
            client.put(key, Vec::new(), "text/plain").await.unwrap();
        }
        assert_eq!(b.list("a").await.unwrap(), ["a/1", "a/2", "a/3"]);
        assert_eq!(b.list("").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn put_move_delete() {
        let (client, b) = bucket("p");
        assert_eq!(b.put("x.txt", b"abc".to_vec(), "text/plain").await.unwrap(), 3);
        assert!(b.exists("x.txt").await.unwrap());

        assert!(b.move_object("x.txt", "y/x.txt").await.unwrap());
        assert!(!b.exists("x.txt").await.unwrap());
        assert_eq!(client.raw("p/y/x.txt").unwrap(), b"abc");
        assert!(!b.move_object("x.txt", "z.txt").await.unwrap());

        assert!(!b.copy("y/x.txt", "y/x.txt").await.unwrap());
        assert!(!b.move_object("y/x.txt", "y/x.txt").await.unwrap());
        assert_eq!(client.raw("p/y/x.txt").unwrap(), b"abc");

        b.put("y/z.txt", Vec::new(), "text/plain").await.unwrap();
        assert_eq!(b.delete_prefix("y").await.unwrap(), 2);
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn plain_upload() {
        let (client, b) = bucket("");
        let up = Upload::new("notes.txt", b"hello".to_vec());
        let file = b.upload(&up, "docs", "notes.txt", &ContentCipher::disabled()).await.unwrap();
        assert_eq!(file.path, "docs/notes.txt");
        assert_eq!(file.size, 5);
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert!(file.alt.is_none());
        assert_eq!(client.raw("docs/notes.txt").unwrap(), b"hello");
    }

    #[tokio::test]
    async fn image_upload_keeps_original_as_alt() {
        let (client, b) = bucket("");
        let b = b.with_converter(Arc::new(PrefixConverter));
        let cipher = ContentCipher::new(CipherKey::generate());
        let up = Upload::new("photo.png", b"PNGDATA".to_vec()).with_content_type("image/png");

        let file = b.upload(&up, "img", "photo.png", &cipher).await.unwrap();
        assert_eq!(file.name, "photo.webp");
        assert_eq!(file.path, "img/photo.webp");
        assert_eq!(file.size, 5);
        assert_eq!(file.mime_type.as_deref(), Some("image/webp"));
        let alt = file.alt.unwrap();
        assert_eq!(alt.name, "photo.png");
        assert_eq!(alt.path, "img/photo.png");
        assert_eq!(alt.size, 7);
        assert_eq!(alt.mime_type, "image/png");

        let sealed = client.raw("img/photo.png").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"PNGDATA");
        let webp = client.raw("img/photo.webp").unwrap();
        assert_eq!(cipher.decrypt(&webp).unwrap(), b"RIFFP");
    }

    #[tokio::test]
    async fn webp_and_failed_conversions_store_original() {
        let (client, b) = bucket("");
        let b = b.with_converter(Arc::new(BrokenConverter));
        let up = Upload::new("photo.jpg", b"JPEG".to_vec());
        let file = b.upload(&up, "", "photo.jpg", &ContentCipher::disabled()).await.unwrap();
        assert_eq!(file.path, "photo.jpg");
        assert_eq!(file.mime_type.as_deref(), Some("image/jpeg"));
        assert!(file.alt.is_none());

        let up = Upload::new("pic.webp", b"RIFF".to_vec());
        let file = b.upload(&up, "", "pic.webp", &ContentCipher::disabled()).await.unwrap();
        assert_eq!(file.mime_type.as_deref(), Some("image/webp"));
        assert!(file.alt.is_none());
        assert_eq!(client.len(), 2);
    }
}

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use stow_types::FileNode;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::config::{StoreConfig, StoreParts};
use crate::error::{StoreError, StoreResult};
use crate::listing::TreeArena;
use crate::s3::bucket::Bucket;
use crate::s3::client::ObjectClient;
use crate::sanitize::{file_name_of, join_path, parent_of, PathSanitizer};
use crate::sidecar::{self, SIDECAR_CONTENT_TYPE};
use crate::traits::FileStore;
use crate::upload::{FileContent, Upload};

/// File store on an S3-compatible bucket.
///
/// Folders exist only as `/`-delimited key prefixes. Each payload has a
/// sidecar object holding its [`FileNode`], which is the only source of
/// size, mime type and alt fields for listings. Alt variants written by
/// image conversion have no sidecar of their own and do not show up in
/// listings; they follow their primary through copy, move and delete.
pub struct S3FileStore {
    bucket: Bucket,
    parts: StoreParts,
}

impl S3FileStore {
    /// A store with default parts.
    pub fn new(bucket: Bucket) -> Self {
        Self::with_parts(bucket, StoreParts::default())
    }

    /// A store composed from explicit parts.
    pub fn with_parts(bucket: Bucket, parts: StoreParts) -> Self {
        debug!(prefix = %bucket.prefix(), encrypted = parts.cipher.is_enabled(), "s3 store opened");
        Self { bucket, parts }
    }

    /// A store described by a configuration, on top of `client`.
    pub fn from_config(config: &StoreConfig, client: Arc<dyn ObjectClient>) -> StoreResult<Self> {
        let bucket = Bucket::new(client, &config.prefix);
        Ok(Self::with_parts(bucket, StoreParts::from_config(config)?))
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.parts.sanitizer
    }

    /// Replace the allow-list pattern. On error the current one is kept.
    pub fn set_path_pattern(&mut self, pattern: &str) -> StoreResult<()> {
        self.parts.sanitizer.set_pattern(pattern)
    }

    // ------------------------------------------------------------------
    // Sidecars
    // ------------------------------------------------------------------

    async fn read_sidecar(&self, path: &str) -> StoreResult<FileNode> {
        let meta = self.parts.naming.sidecar_for(path);
        let object = self
            .bucket
            .get(&meta)
            .await?
            .ok_or_else(|| StoreError::NotFound(meta.clone()))?;
        sidecar::decode(&object.data)
    }

    async fn write_sidecar(&self, node: &FileNode) -> StoreResult<()> {
        let meta = self.parts.naming.sidecar_for(&node.path);
        self.bucket
            .put(&meta, sidecar::encode(node)?, SIDECAR_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    async fn delete_sidecar(&self, path: &str) {
        let meta = self.parts.naming.sidecar_for(path);
        if let Err(e) = self.bucket.delete(&meta).await {
            warn!(path, error = %e, "could not delete sidecar");
        }
    }

    /// Copy the sidecar of `source` to `destination`, rewriting its path.
    /// An alt variant is carried next to the destination, moved when
    /// `remove_source` is set and copied otherwise.
    async fn relocate_sidecar(
        &self,
        source: &str,
        destination: &str,
        remove_source: bool,
    ) -> StoreResult<()> {
        let mut node = sidecar::relocate(self.read_sidecar(source).await?, destination);
        if let Some(alt) = node.alt.as_mut() {
            let name = alt_name(file_name_of(destination), &alt.name);
            let target = join_path(parent_of(destination), &name);
            if target != alt.path && target != destination {
                let carried = if remove_source {
                    self.bucket.move_object(&alt.path, &target).await
                } else {
                    self.bucket.copy(&alt.path, &target).await
                };
                match carried {
                    Ok(true) => {
                        alt.name = name;
                        alt.path = target;
                    }
                    Ok(false) => warn!(alt = %alt.path, "alt variant not found"),
                    Err(e) => warn!(alt = %alt.path, error = %e, "could not carry alt variant"),
                }
            }
        }
        self.write_sidecar(&node).await
    }

    async fn resolve_listed(&self, path: &str) -> Option<FileNode> {
        match self.read_sidecar(path).await {
            Ok(node) => Some(node),
            Err(e) => {
                warn!(path, error = %e, "skipping object without readable sidecar");
                None
            }
        }
    }

    async fn delete_payload(&self, path: &str) -> StoreResult<bool> {
        let alt = self.read_sidecar(path).await.ok().and_then(|node| node.alt);
        if self.bucket.delete(path).await? {
            self.delete_sidecar(path).await;
            if let Some(alt) = alt {
                if let Err(e) = self.bucket.delete(&alt.path).await {
                    warn!(path, alt = %alt.path, error = %e, "could not delete alt variant");
                }
            }
            return Ok(true);
        }
        Ok(self.bucket.delete_prefix(path).await? > 0)
    }
}

/// Name for an alt variant that accompanies a payload called `name`: the
/// payload's stem with the alt's own extension.
fn alt_name(name: &str, alt: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    match alt.rsplit_once('.') {
        Some((_, ext)) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Path of `path` relative to `folder`; both are sanitized logical paths.
fn relative<'a>(folder: &str, path: &'a str) -> Option<&'a str> {
    if folder.is_empty() {
        return Some(path);
    }
    path.strip_prefix(folder)?.strip_prefix('/')
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn write(&self, upload: Upload, folder: &str) -> StoreResult<FileNode> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let name = self.parts.payload_name(upload.file_name.as_deref())?;
        self.parts.limit.check(upload.size())?;

        let file = self
            .bucket
            .upload(&upload, &folder, &name, &self.parts.cipher)
            .await?;
        let mut node = FileNode::from(file);
        if node.alt.is_none() {
            node.size = Some(upload.size());
        }
        self.write_sidecar(&node).await?;

        debug!(path = %node.path, size = upload.size(), converted = node.alt.is_some(), "file written");
        Ok(node)
    }

    async fn write_local(&self, source: &Path, folder: &str) -> StoreResult<FileNode> {
        let is_file = fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(StoreError::NotFound(source.display().to_string()));
        }
        let upload = Upload {
            file_name: source.file_name().and_then(|n| n.to_str()).map(str::to_string),
            content_type: None,
            data: fs::read(source).await?,
        };
        self.write(upload, folder).await
    }

    async fn read(&self, path: &str) -> StoreResult<FileContent> {
        let path = self.parts.payload_path(path)?;
        let object = self
            .bucket
            .get(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        Ok(FileContent {
            data: self.parts.cipher.decrypt(&object.data)?,
            mime_type: object.content_type,
        })
    }

    async fn list(&self, folder: &str) -> StoreResult<Vec<FileNode>> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let mut nodes = Vec::new();
        let mut seen_dirs = HashSet::new();

        for path in self.bucket.list(&folder).await? {
            let Some(rel) = relative(&folder, &path) else {
                continue;
            };
            if rel.is_empty() || self.parts.naming.is_sidecar(rel) {
                continue;
            }
            match rel.split_once('/') {
                None => {
                    if let Some(node) = self.resolve_listed(&path).await {
                        nodes.push(node);
                    }
                }
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        nodes.push(FileNode::directory(dir, join_path(&folder, dir)));
                    }
                }
            }
        }
        Ok(nodes)
    }

    async fn list_recursive(&self, folder: &str) -> StoreResult<Vec<FileNode>> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let mut arena = TreeArena::new(&folder);

        for path in self.bucket.list(&folder).await? {
            let Some(rel) = relative(&folder, &path) else {
                continue;
            };
            // Folder marker objects (`a/b/`) stand for empty directories.
            if rel.ends_with('/') {
                let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
                arena.ensure_dir(&segments);
                continue;
            }
            if rel.is_empty() || self.parts.naming.is_sidecar(rel) {
                continue;
            }
            if let Some(node) = self.resolve_listed(&path).await {
                arena.insert_file(rel, node);
            }
        }
        Ok(arena.into_nodes())
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let path = self.parts.payload_path(path)?;
        match self.bucket.exists(&path).await {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(path = %path, error = %e, "could not check object");
                Ok(false)
            }
        }
    }

    async fn copy(&self, source: &str, destination: &str) -> StoreResult<bool> {
        let source = self.parts.payload_path(source)?;
        let destination = self.parts.payload_path(destination)?;
        if source == destination {
            error!(source = %source, "copy failed: source and destination are the same");
            return Ok(false);
        }
        match self.bucket.copy(&source, &destination).await {
            Ok(true) => {}
            Ok(false) => {
                error!(source = %source, destination = %destination, "copy failed: source not found");
                return Ok(false);
            }
            Err(e) => {
                error!(source = %source, destination = %destination, error = %e, "copy failed");
                return Ok(false);
            }
        }
        if let Err(e) = self.relocate_sidecar(&source, &destination, false).await {
            warn!(source = %source, destination = %destination, error = %e, "could not copy sidecar");
        }
        debug!(source = %source, destination = %destination, "object copied");
        Ok(true)
    }

    async fn move_to(&self, source: &str, destination: &str) -> StoreResult<bool> {
        let source = self.parts.payload_path(source)?;
        let destination = self.parts.payload_path(destination)?;
        if source == destination {
            error!(source = %source, "move failed: source and destination are the same");
            return Ok(false);
        }
        match self.bucket.move_object(&source, &destination).await {
            Ok(true) => {}
            Ok(false) => {
                error!(source = %source, destination = %destination, "move failed: source not found");
                return Ok(false);
            }
            Err(e) => {
                error!(source = %source, destination = %destination, error = %e, "move failed");
                return Ok(false);
            }
        }
        match self.relocate_sidecar(&source, &destination, true).await {
            Ok(()) => self.delete_sidecar(&source).await,
            Err(e) => {
                warn!(source = %source, destination = %destination, error = %e, "could not move sidecar")
            }
        }
        debug!(source = %source, destination = %destination, "object moved");
        Ok(true)
    }

    async fn delete(&self, path: &str) -> StoreResult<bool> {
        let path = self.parts.payload_path(path)?;
        if path.is_empty() {
            return Err(StoreError::InvalidInput("refusing to delete the store root".into()));
        }
        match self.delete_payload(&path).await {
            Ok(deleted) => {
                debug!(path = %path, deleted, "delete");
                Ok(deleted)
            }
            Err(e) => {
                error!(path = %path, error = %e, "delete failed");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for S3FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3FileStore")
            .field("bucket", &self.bucket)
            .field("encrypted", &self.parts.cipher.is_enabled())
            .finish()
    }
}

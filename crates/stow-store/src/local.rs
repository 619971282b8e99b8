use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stow_types::FileNode;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::config::{StoreConfig, StoreParts};
use crate::error::{StoreError, StoreResult};
use crate::listing::TreeArena;
use crate::mime;
use crate::sanitize::{join_path, PathSanitizer};
use crate::sidecar;
use crate::traits::FileStore;
use crate::upload::{FileContent, Upload};

/// File store rooted at a local directory.
///
/// The root is created if missing and canonicalized once at construction.
/// Every resolved path is canonicalized again (through its deepest existing
/// ancestor) and must stay below the root, so symlinks cannot be used to
/// escape it. Sidecars live next to their payloads as `<file><suffix>`.
pub struct LocalFileStore {
    root: PathBuf,
    parts: StoreParts,
}

impl LocalFileStore {
    /// A store with default parts: no encryption, default pattern and suffix.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::with_parts(root, StoreParts::default())
    }

    /// A store composed from explicit parts.
    pub fn with_parts(root: impl AsRef<Path>, parts: StoreParts) -> StoreResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = std::fs::canonicalize(root)?;
        debug!(root = %root.display(), encrypted = parts.cipher.is_enabled(), "local store opened");
        Ok(Self { root, parts })
    }

    /// A store described by a configuration.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::with_parts(&config.root, StoreParts::from_config(config)?)
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sanitizer(&self) -> &PathSanitizer {
        &self.parts.sanitizer
    }

    /// Replace the allow-list pattern. On error the current one is kept.
    pub fn set_path_pattern(&mut self, pattern: &str) -> StoreResult<()> {
        self.parts.sanitizer.set_pattern(pattern)
    }

    // ------------------------------------------------------------------
    // Path resolution
    // ------------------------------------------------------------------

    async fn resolve(&self, rel: &str) -> StoreResult<PathBuf> {
        let mut full = self.root.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty() && *s != ".") {
            full.push(segment);
        }
        let resolved = canonicalize_existing(&full).await?;
        if !resolved.starts_with(&self.root) {
            return Err(StoreError::PathOutsideRoot(rel.to_string()));
        }
        Ok(resolved)
    }

    /// Logical `/`-separated path of a location below the root.
    fn logical(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = rel.iter().map(|s| s.to_str()).collect();
        Some(segments?.join("/"))
    }

    fn sidecar_path(&self, payload: &Path) -> PathBuf {
        let mut s: OsString = payload.as_os_str().to_os_string();
        s.push(self.parts.naming.suffix());
        PathBuf::from(s)
    }

    // ------------------------------------------------------------------
    // Payload and sidecar I/O
    // ------------------------------------------------------------------

    async fn read_sidecar(&self, payload: &Path) -> StoreResult<FileNode> {
        let bytes = fs::read(self.sidecar_path(payload)).await?;
        sidecar::decode(&bytes)
    }

    async fn write_sidecar(&self, payload: &Path, node: &FileNode) -> StoreResult<()> {
        fs::write(self.sidecar_path(payload), sidecar::encode(node)?).await?;
        Ok(())
    }

    /// Copy the sidecar of `from` next to `to`, rewriting its logical path.
    async fn relocate_sidecar(&self, from: &Path, to: &Path, destination: &str) -> StoreResult<()> {
        let node = self.read_sidecar(from).await?;
        self.write_sidecar(to, &sidecar::relocate(node, destination))
            .await
    }

    async fn remove_sidecar(&self, payload: &Path) {
        match fs::remove_file(self.sidecar_path(payload)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %payload.display(), error = %e, "could not delete sidecar"),
        }
    }

    /// Node for one directory entry, or `None` when it is skipped.
    async fn entry_node(&self, path: &Path, is_dir: bool) -> Option<FileNode> {
        let logical = self.logical(path)?;
        let name = path.file_name()?.to_str()?.to_string();
        if is_dir {
            return Some(FileNode::directory(name, logical));
        }
        match self.read_sidecar(path).await {
            Ok(node) => Some(node),
            Err(e) => {
                warn!(path = %logical, error = %e, "skipping file without readable sidecar");
                None
            }
        }
    }

    /// Resolve a listing target. `None` means it does not exist.
    async fn listing_dir(&self, folder: &str) -> StoreResult<Option<PathBuf>> {
        let dir = self.resolve(folder).await?;
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(dir)),
            Ok(_) => Err(StoreError::NotADirectory(folder.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Checks run before copy or move touch anything.
    async fn check_transfer(&self, from: &Path, to: &Path, destination: &str) -> StoreResult<()> {
        if from == to {
            return Err(StoreError::InvalidInput(
                "source and destination are the same".into(),
            ));
        }
        if to.starts_with(from) {
            return Err(StoreError::InvalidInput(format!(
                "destination {destination:?} lies inside its source"
            )));
        }
        if fs::metadata(to).await.map_or(false, |m| m.is_dir()) {
            return Err(StoreError::InvalidInput(format!(
                "destination {destination:?} is a directory"
            )));
        }
        Ok(())
    }

    async fn copy_payload(&self, source: &str, destination: &str) -> StoreResult<()> {
        let from = self.resolve(source).await?;
        let to = self.resolve(destination).await?;
        if !is_file(&from).await {
            return Err(StoreError::NotFound(source.to_string()));
        }
        self.check_transfer(&from, &to, destination).await?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&from, &to).await?;

        if let Err(e) = self.relocate_sidecar(&from, &to, destination).await {
            warn!(source, destination, error = %e, "could not copy sidecar");
        }
        Ok(())
    }

    async fn move_payload(&self, source: &str, destination: &str) -> StoreResult<()> {
        let from = self.resolve(source).await?;
        let to = self.resolve(destination).await?;
        let meta = match fs::metadata(&from).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(source.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        self.check_transfer(&from, &to, destination).await?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from, &to).await?;

        // Directories carry their sidecars along.
        if meta.is_dir() {
            return Ok(());
        }
        match self.relocate_sidecar(&from, &to, destination).await {
            Ok(()) => self.remove_sidecar(&from).await,
            Err(e) => warn!(source, destination, error = %e, "could not move sidecar"),
        }
        Ok(())
    }

    async fn delete_payload(&self, path: &str) -> StoreResult<bool> {
        let full = self.resolve(path).await?;
        let meta = match fs::metadata(&full).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            fs::remove_dir_all(&full).await?;
        } else {
            fs::remove_file(&full).await?;
            self.remove_sidecar(&full).await;
        }
        Ok(true)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write(&self, upload: Upload, folder: &str) -> StoreResult<FileNode> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let name = self.parts.payload_name(upload.file_name.as_deref())?;
        self.parts.limit.check(upload.size())?;

        let dir = self.resolve(&folder).await?;
        fs::create_dir_all(&dir).await?;
        let target = dir.join(&name);

        let mime_type = mime::resolve(&name, upload.content_type.as_deref());
        let path = join_path(&folder, &name);
        let node = FileNode::file(&name, &path, upload.size(), Some(mime_type));

        let sealed = self.parts.cipher.encrypt(&upload.data)?;
        fs::write(&target, &sealed).await?;
        self.write_sidecar(&target, &node).await?;

        debug!(path = %path, size = upload.size(), stored = sealed.len(), "file written");
        Ok(node)
    }

    async fn write_local(&self, source: &Path, folder: &str) -> StoreResult<FileNode> {
        if !is_file(source).await {
            return Err(StoreError::NotFound(source.display().to_string()));
        }
        let file_name = source.file_name().and_then(|n| n.to_str()).map(str::to_string);
        let data = fs::read(source).await?;
        let upload = Upload {
            file_name,
            content_type: None,
            data,
        };
        self.write(upload, folder).await
    }

    async fn read(&self, path: &str) -> StoreResult<FileContent> {
        let path = self.parts.payload_path(path)?;
        let full = self.resolve(&path).await?;
        if !is_file(&full).await {
            return Err(StoreError::NotFound(path));
        }
        let data = self.parts.cipher.decrypt(&fs::read(&full).await?)?;
        let mime_type = full.file_name().and_then(|n| n.to_str()).and_then(mime::guess);
        Ok(FileContent { data, mime_type })
    }

    async fn list(&self, folder: &str) -> StoreResult<Vec<FileNode>> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let Some(dir) = self.listing_dir(&folder).await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            entries.push((entry.path(), entry.file_type().await?.is_dir()));
        }
        entries.sort();

        let mut nodes = Vec::with_capacity(entries.len());
        for (path, is_dir) in entries {
            let is_sidecar = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| self.parts.naming.is_sidecar(n));
            if is_sidecar {
                continue;
            }
            if let Some(node) = self.entry_node(&path, is_dir).await {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    async fn list_recursive(&self, folder: &str) -> StoreResult<Vec<FileNode>> {
        let folder = self.parts.sanitizer.sanitize_path(folder)?;
        let Some(dir) = self.listing_dir(&folder).await? else {
            return Ok(Vec::new());
        };

        let walk_root = dir.clone();
        let entries = tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(&walk_root)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some((entry.path().to_path_buf(), entry.file_type().is_dir())),
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable entry");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut arena = TreeArena::new(&folder);
        for (path, is_dir) in entries {
            let Some(rel) = path
                .strip_prefix(&dir)
                .ok()
                .and_then(|rel| rel.iter().map(|s| s.to_str()).collect::<Option<Vec<_>>>())
            else {
                continue;
            };
            if is_dir {
                arena.ensure_dir(&rel);
                continue;
            }
            if rel.last().map_or(true, |n| self.parts.naming.is_sidecar(n)) {
                continue;
            }
            if let Some(node) = self.entry_node(&path, false).await {
                arena.insert_file(&rel.join("/"), node);
            }
        }
        Ok(arena.into_nodes())
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let path = self.parts.payload_path(path)?;
        let full = match self.resolve(&path).await {
            Ok(full) => full,
            Err(e) => {
                warn!(path = %path, error = %e, "could not resolve path");
                return Ok(false);
            }
        };
        match fs::try_exists(&full).await {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(path = %path, error = %e, "could not check path");
                Ok(false)
            }
        }
    }

    async fn copy(&self, source: &str, destination: &str) -> StoreResult<bool> {
        let source = self.parts.payload_path(source)?;
        let destination = self.parts.payload_path(destination)?;
        match self.copy_payload(&source, &destination).await {
            Ok(()) => {
                debug!(source = %source, destination = %destination, "file copied");
                Ok(true)
            }
            Err(e) => {
                error!(source = %source, destination = %destination, error = %e, "copy failed");
                Ok(false)
            }
        }
    }

    async fn move_to(&self, source: &str, destination: &str) -> StoreResult<bool> {
        let source = self.parts.payload_path(source)?;
        let destination = self.parts.payload_path(destination)?;
        match self.move_payload(&source, &destination).await {
            Ok(()) => {
                debug!(source = %source, destination = %destination, "file moved");
                Ok(true)
            }
            Err(e) => {
                error!(source = %source, destination = %destination, error = %e, "move failed");
                Ok(false)
            }
        }
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

impl std::fmt::Debug for LocalFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStore")
            .field("root", &self.root)
            .field("encrypted", &self.parts.cipher.is_enabled())
            .finish()
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// missing tail.
async fn canonicalize_existing(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        match fs::canonicalize(&existing).await {
            Ok(mut base) => {
                for segment in tail.iter().rev() {
                    base.push(segment);
                }
                return Ok(base);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name().map(OsString::from) else {
                    return Err(e);
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

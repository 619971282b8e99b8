use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{TypeError, TypeResult};

/// Secondary artifact stored next to a converted primary.
///
/// When an image upload is converted (e.g. to webp), the converted bytes
/// become the primary payload and the original is kept as the alt variant.
/// On the wire the four fields are flattened into `alt_name`, `alt_path`,
/// `alt_size` and `alt_mime_type`, which are either all set or all null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AltVariant {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mime_type: String,
}

impl AltVariant {
    /// Create a new alt variant.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            mime_type: mime_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileRef
// ---------------------------------------------------------------------------

/// Flat descriptor returned by a low-level upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "FileRefRecord", try_from = "FileRefRecord")]
pub struct FileRef {
    /// File name (last path segment).
    pub name: String,
    /// Full logical path of the primary payload.
    pub path: String,
    /// Size of the primary payload in bytes.
    pub size: u64,
    /// Mime type of the primary payload, if known.
    pub mime_type: Option<String>,
    /// Original artifact kept when the primary was converted.
    pub alt: Option<AltVariant>,
}

impl FileRef {
    /// Create a reference without an alt variant.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            mime_type,
            alt: None,
        }
    }

    /// Attach an alt variant.
    pub fn with_alt(mut self, alt: AltVariant) -> Self {
        self.alt = Some(alt);
        self
    }
}

// ---------------------------------------------------------------------------
// FileNode
// ---------------------------------------------------------------------------

/// Tree-capable descriptor: a file leaf or a directory.
///
/// Invariants (enforced by the constructors and on deserialization):
/// - a file never has children;
/// - a directory never carries `size`, `mime_type` or an alt variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "FileNodeRecord", try_from = "FileNodeRecord")]
pub struct FileNode {
    pub name: String,
    /// Logical path relative to the store root. Empty for a synthetic root.
    pub path: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub alt: Option<AltVariant>,
    pub is_file: bool,
    /// Ordered children; always empty for files.
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// Create a file leaf.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: Some(size),
            mime_type,
            alt: None,
            is_file: true,
            children: Vec::new(),
        }
    }

    /// Create an empty directory node.
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: None,
            mime_type: None,
            alt: None,
            is_file: false,
            children: Vec::new(),
        }
    }

    /// Attach an alt variant. Ignored for directories.
    pub fn with_alt(mut self, alt: AltVariant) -> Self {
        if self.is_file {
            self.alt = Some(alt);
        }
        self
    }

    /// Returns `true` for directory nodes.
    pub fn is_dir(&self) -> bool {
        !self.is_file
    }

    /// Look up a direct child by exact name.
    pub fn child(&self, name: &str) -> Option<&FileNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Check the node invariants, recursively.
    pub fn validate(&self) -> TypeResult<()> {
        if self.is_file {
            if !self.children.is_empty() {
                return Err(TypeError::FileWithChildren {
                    name: self.name.clone(),
                });
            }
        } else if self.size.is_some() || self.mime_type.is_some() || self.alt.is_some() {
            return Err(TypeError::DirectoryPayload {
                name: self.name.clone(),
            });
        }
        self.children.iter().try_for_each(FileNode::validate)
    }
}

impl From<FileRef> for FileNode {
    fn from(file_ref: FileRef) -> Self {
        Self {
            name: file_ref.name,
            path: file_ref.path,
            size: Some(file_ref.size),
            mime_type: file_ref.mime_type,
            alt: file_ref.alt,
            is_file: true,
            children: Vec::new(),
        }
    }
}

impl From<&FileRef> for FileNode {
    fn from(file_ref: &FileRef) -> Self {
        Self::from(file_ref.clone())
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Flat JSON form of a [`FileRef`].
#[derive(Serialize, Deserialize)]
struct FileRefRecord {
    name: String,
    path: String,
    size: u64,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    alt_name: Option<String>,
    #[serde(default)]
    alt_path: Option<String>,
    #[serde(default)]
    alt_size: Option<u64>,
    #[serde(default)]
    alt_mime_type: Option<String>,
}

/// Flat JSON form of a [`FileNode`]; this is the sidecar record.
#[derive(Serialize, Deserialize)]
struct FileNodeRecord {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    alt_name: Option<String>,
    #[serde(default)]
    alt_path: Option<String>,
    #[serde(default)]
    alt_size: Option<u64>,
    #[serde(default)]
    alt_mime_type: Option<String>,
    is_file: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    children: Vec<FileNodeRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FileNodeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FileNodeRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

type AltFields = (Option<String>, Option<String>, Option<u64>, Option<String>);

fn split_alt(alt: Option<AltVariant>) -> AltFields {
    match alt {
        Some(a) => (Some(a.name), Some(a.path), Some(a.size), Some(a.mime_type)),
        None => (None, None, None, None),
    }
}

fn join_alt(owner: &str, fields: AltFields) -> TypeResult<Option<AltVariant>> {
    match fields {
        (Some(name), Some(path), Some(size), Some(mime_type)) => Ok(Some(AltVariant {
            name,
            path,
            size,
            mime_type,
        })),
        (None, None, None, None) => Ok(None),
        _ => Err(TypeError::PartialAlt {
            name: owner.to_string(),
        }),
    }
}

impl From<FileRef> for FileRefRecord {
    fn from(r: FileRef) -> Self {
        let (alt_name, alt_path, alt_size, alt_mime_type) = split_alt(r.alt);
        Self {
            name: r.name,
            path: r.path,
            size: r.size,
            mime_type: r.mime_type,
            alt_name,
            alt_path,
            alt_size,
            alt_mime_type,
        }
    }
}

impl TryFrom<FileRefRecord> for FileRef {
    type Error = TypeError;

    fn try_from(rec: FileRefRecord) -> TypeResult<Self> {
        let alt = join_alt(
            &rec.name,
            (rec.alt_name, rec.alt_path, rec.alt_size, rec.alt_mime_type),
        )?;
        Ok(Self {
            name: rec.name,
            path: rec.path,
            size: rec.size,
            mime_type: rec.mime_type,
            alt,
        })
    }
}

impl From<FileNode> for FileNodeRecord {
    fn from(n: FileNode) -> Self {
        let (alt_name, alt_path, alt_size, alt_mime_type) = split_alt(n.alt);
        Self {
            name: n.name,
            path: Some(n.path),
            size: n.size,
            mime_type: n.mime_type,
            alt_name,
            alt_path,
            alt_size,
            alt_mime_type,
            is_file: n.is_file,
            children: n.children.into_iter().map(FileNodeRecord::from).collect(),
        }
    }
}

impl TryFrom<FileNodeRecord> for FileNode {
    type Error = TypeError;

    fn try_from(rec: FileNodeRecord) -> TypeResult<Self> {
        let alt = join_alt(
            &rec.name,
            (rec.alt_name, rec.alt_path, rec.alt_size, rec.alt_mime_type),
        )?;
        let children = rec
            .children
            .into_iter()
            .map(FileNode::try_from)
            .collect::<TypeResult<Vec<_>>>()?;
        let node = Self {
            name: rec.name,
            path: rec.path.unwrap_or_default(),
            size: rec.size,
            mime_type: rec.mime_type,
            alt,
            is_file: rec.is_file,
            children,
        };
        node.validate()?;
        Ok(node)
    }
}

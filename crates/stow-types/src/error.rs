use thiserror::Error;

/// Errors produced when a descriptor violates its structural invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Some but not all of the `alt_*` fields were present.
    #[error("alt fields of {name:?} must be all present or all absent")]
    PartialAlt { name: String },

    /// A directory node carried payload metadata.
    #[error("directory {name:?} must not carry size, mime type or alt fields")]
    DirectoryPayload { name: String },

    /// A file node carried children.
    #[error("file {name:?} must not have children")]
    FileWithChildren { name: String },
}

/// Result alias for type-level validation.
pub type TypeResult<T> = Result<T, TypeError>;

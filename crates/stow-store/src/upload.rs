//! Upload sources and read results.

use crate::error::{StoreError, StoreResult};

/// Default upload size limit: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// An in-memory payload handed to a store for writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied file name. Required by every backend.
    pub file_name: Option<String>,
    /// Declared content type, if the client sent one.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Upload {
    /// An upload with a file name and no declared content type.
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            data: data.into(),
        }
    }

    /// Declare a content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Payload bytes returned by a read, already decrypted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Rejects payloads above a size limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeLimit {
    max: u64,
}

impl SizeLimit {
    pub fn new(max: u64) -> Self {
        Self { max }
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn check(&self, size: u64) -> StoreResult<()> {
        if size > self.max {
            return Err(StoreError::FileTooLarge {
                size,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

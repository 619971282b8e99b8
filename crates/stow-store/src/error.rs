use stow_crypto::CryptoError;
use stow_types::TypeError;

/// Errors from file store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required input was missing or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The path contains an exact `..` segment.
    #[error("invalid path: '..' not allowed in {0:?}")]
    TraversalRejected(String),

    /// The path resolved outside the store root.
    #[error("path {0:?} is outside the base path")]
    PathOutsideRoot(String),

    /// The path or name failed the allow-list pattern.
    #[error("contains forbidden characters: {0:?}")]
    ForbiddenCharacters(String),

    /// A bare file name contained `/`.
    #[error("invalid file name: path separators not allowed in {0:?}")]
    PathSeparatorNotAllowed(String),

    /// A replacement allow-list pattern did not compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The referenced payload does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The listing target exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Ciphertext failed authentication or the key check.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Key setup or sealing failed.
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    /// An upload exceeded the configured size limit.
    #[error("file size {size} exceeds max size {max}")]
    FileTooLarge { size: u64, max: u64 },

    /// Sidecar record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The object store reported a failure.
    #[error("backend failure: {0}")]
    Backend(String),

    /// I/O error from the local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Errors raised by path and name validation, which are always surfaced.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::TraversalRejected(_)
                | Self::ForbiddenCharacters(_)
                | Self::PathSeparatorNotAllowed(_)
        )
    }
}

impl From<CryptoError> for StoreError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::DecryptionFailed(reason) => Self::DecryptionFailed(reason),
            other => Self::Crypto(other),
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

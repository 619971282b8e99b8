use thiserror::Error;

/// Errors from key handling and payload encryption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length or encoding.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The AEAD refused to seal the payload.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Ciphertext is truncated, of an unknown version, tampered with, or
    /// sealed under a different key.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

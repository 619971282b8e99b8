//! At-rest payload encryption for Stow.
//!
//! [`ContentCipher`] wraps raw payload bytes with XChaCha20-Poly1305 when a
//! [`CipherKey`] is configured and passes them through untouched otherwise.
//! Ciphertext is versioned and authenticated; tampered or mis-keyed input is
//! rejected with [`CryptoError::DecryptionFailed`].
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod cipher;
pub mod error;
pub mod key;

pub use cipher::{ContentCipher, FORMAT_VERSION, HEADER_LEN};
pub use error::{CryptoError, CryptoResult};
pub use key::{CipherKey, KEY_LEN};

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Length of a content key in bytes.
pub const KEY_LEN: usize = 32;

/// 256-bit symmetric content key, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Build a key from a slice that must be exactly [`KEY_LEN`] bytes.
    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                slice.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse a hex-encoded key (64 hex characters).
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let mut decoded =
            hex::decode(s.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Hex encoding of the key, for persisting it in configuration.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(CipherKey::generate().as_bytes(), CipherKey::generate().as_bytes());
    }

    #[test]
    fn hex_roundtrip() {
        let key = CipherKey::new([0xAB; KEY_LEN]);
        let parsed = CipherKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            CipherKey::from_slice(&[0u8; 16]),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            CipherKey::from_hex("abcd"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn bad_hex_rejected() {
        assert!(matches!(
            CipherKey::from_hex("zz"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_hides_material() {
        let key = CipherKey::new([0x11; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "CipherKey(..)");
    }
}

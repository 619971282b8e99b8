use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;

/// Version byte leading every sealed payload.
pub const FORMAT_VERSION: u8 = 1;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Bytes of framing before the ciphertext: version + nonce.
pub const HEADER_LEN: usize = 1 + NONCE_LEN;

/// Optional symmetric encryption around raw payload bytes.
///
/// Without a key both directions are the identity. With a key, `encrypt`
/// produces a versioned, authenticated blob:
///
/// ```text
/// [1 byte: format version]
/// [24 bytes: random XChaCha20 nonce]
/// [N bytes: ciphertext + 16-byte Poly1305 tag]
/// ```
///
/// A fresh random nonce per call makes encryption non-deterministic. The
/// cipher holds no mutable state, so one instance can be shared freely.
#[derive(Clone, Debug, Default)]
pub struct ContentCipher {
    key: Option<CipherKey>,
}

impl ContentCipher {
    /// A cipher that seals payloads under `key`.
    pub fn new(key: CipherKey) -> Self {
        Self { key: Some(key) }
    }

    /// The pass-through cipher.
    pub fn disabled() -> Self {
        Self { key: None }
    }

    /// Build from an optional key.
    pub fn from_key(key: Option<CipherKey>) -> Self {
        Self { key }
    }

    /// Build from an optional hex-encoded key.
    pub fn from_hex(key: Option<&str>) -> CryptoResult<Self> {
        key.map(CipherKey::from_hex).transpose().map(Self::from_key)
    }

    /// Whether a key is configured.
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Seal `plaintext`, or return it unchanged when no key is configured.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let Some(key) = &self.key else {
            return Ok(plaintext.to_vec());
        };
        let aead = XChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let sealed = aead
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open a sealed payload, or return it unchanged when no key is configured.
    pub fn decrypt(&self, blob: &[u8]) -> CryptoResult<Vec<u8>> {
        let Some(key) = &self.key else {
            return Ok(blob.to_vec());
        };
        if blob.len() < HEADER_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed(format!(
                "payload too short: {} bytes",
                blob.len()
            )));
        }
        if blob[0] != FORMAT_VERSION {
            return Err(CryptoError::DecryptionFailed(format!(
                "unsupported format version {}",
                blob[0]
            )));
        }
        let (nonce, sealed) = blob[1..].split_at(NONCE_LEN);
        let aead = XChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        aead.decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".into()))
    }

    /// Size of the sealed form of a `plaintext_len`-byte payload.
    pub fn sealed_len(&self, plaintext_len: usize) -> usize {
        if self.is_enabled() {
            HEADER_LEN + plaintext_len + TAG_LEN
        } else {
            plaintext_len
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enabled() -> ContentCipher {
        ContentCipher::new(CipherKey::generate())
    }

    #[test]
    fn disabled_is_identity() {
        let cipher = ContentCipher::disabled();
        assert!(!cipher.is_enabled());
        assert_eq!(cipher.encrypt(b"plain").unwrap(), b"plain");
        assert_eq!(cipher.decrypt(b"plain").unwrap(), b"plain");
    }

    #[test]
    fn roundtrip_with_key() {
        let cipher = enabled();
        let sealed = cipher.encrypt(b"secret").unwrap();
        assert_ne!(sealed, b"secret");
        assert_eq!(sealed.len(), cipher.sealed_len(6));
        assert_eq!(sealed[0], FORMAT_VERSION);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"secret");
    }

    #[test]
    fn encryption_is_not_deterministic() {
        let cipher = enabled();
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn empty_payload() {
        let cipher = enabled();
        let sealed = cipher.encrypt(b"").unwrap();
        assert!(sealed.len() > HEADER_LEN);
        assert!(cipher.decrypt(&sealed).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = enabled().encrypt(b"secret").unwrap();
        assert!(matches!(
            enabled().decrypt(&sealed),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = enabled();
        let mut sealed = cipher.encrypt(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(
            cipher.decrypt(&sealed),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn unknown_version_fails() {
        let cipher = enabled();
        let mut sealed = cipher.encrypt(b"secret").unwrap();
        sealed[0] = 9;
        let err = cipher.decrypt(&sealed).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn truncated_payload_fails() {
        assert!(matches!(
            enabled().decrypt(b"short"),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn from_hex_optional() {
        assert!(!ContentCipher::from_hex(None).unwrap().is_enabled());
        let hex_key = CipherKey::generate().to_hex();
        assert!(ContentCipher::from_hex(Some(&hex_key)).unwrap().is_enabled());
        assert!(ContentCipher::from_hex(Some("nope")).is_err());
    }

    #[test]
    fn large_payload() {
        let cipher = enabled();
        let data = vec![0xAB; 1_000_000];
        let sealed = cipher.encrypt(&data).unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), data);
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cipher = enabled();
            let sealed = cipher.encrypt(&data).unwrap();
            prop_assert_ne!(&sealed, &data);
            prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), data);
        }
    }
}

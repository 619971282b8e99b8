use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stow_crypto::ContentCipher;

use crate::error::{StoreError, StoreResult};
use crate::sanitize::{file_name_of, PathSanitizer, DEFAULT_PATTERN};
use crate::sidecar::{SidecarNaming, DEFAULT_SUFFIX};
use crate::upload::{SizeLimit, DEFAULT_MAX_FILE_SIZE};

/// Store configuration, usually loaded from a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory of the local backend.
    pub root: PathBuf,
    /// Key namespace of the S3 backend.
    pub prefix: String,
    /// Hex-encoded 32-byte key. Absent means payloads are stored as-is.
    pub encryption_key: Option<String>,
    /// Suffix appended to a payload path to name its sidecar.
    pub sidecar_suffix: String,
    /// Allow-list regex for paths and file names.
    pub path_pattern: String,
    /// Largest accepted upload, in bytes.
    pub max_file_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            prefix: String::new(),
            encryption_key: None,
            sidecar_suffix: DEFAULT_SUFFIX.to_string(),
            path_pattern: DEFAULT_PATTERN.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// The pieces every backend is composed from.
#[derive(Clone, Debug, Default)]
pub struct StoreParts {
    pub sanitizer: PathSanitizer,
    pub cipher: ContentCipher,
    pub naming: SidecarNaming,
    pub limit: SizeLimit,
}

impl StoreParts {
    /// Build the parts described by a configuration. Fails on an invalid
    /// key, pattern or suffix.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            sanitizer: PathSanitizer::with_pattern(&config.path_pattern)?,
            cipher: ContentCipher::from_hex(config.encryption_key.as_deref())?,
            naming: SidecarNaming::new(config.sidecar_suffix.clone())?,
            limit: SizeLimit::new(config.max_file_size),
        })
    }

    /// Replace the cipher.
    pub fn with_cipher(mut self, cipher: ContentCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Sanitize the name of a payload about to be written. The name must be
    /// present, non-empty and must not look like a sidecar.
    pub fn payload_name(&self, name: Option<&str>) -> StoreResult<String> {
        let name = self.sanitizer.sanitize_optional_file_name(name)?;
        if name.is_empty() {
            return Err(StoreError::InvalidInput("file name is empty".into()));
        }
        if self.naming.is_sidecar(&name) {
            return Err(StoreError::InvalidInput(format!(
                "file name {name:?} ends with the reserved suffix {:?}",
                self.naming.suffix()
            )));
        }
        Ok(name)
    }

    /// Sanitize the path of an existing payload. Sidecars are not
    /// addressable through payload operations.
    pub fn payload_path(&self, path: &str) -> StoreResult<String> {
        let path = self.sanitizer.sanitize_path(path)?;
        if self.naming.is_sidecar(file_name_of(&path)) {
            return Err(StoreError::InvalidInput(format!(
                "path {path:?} names a sidecar"
            )));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.root, PathBuf::from("."));
        assert_eq!(c.prefix, "");
        assert!(c.encryption_key.is_none());
        assert_eq!(c.sidecar_suffix, ".meta");
        assert_eq!(c.max_file_size, 100 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StoreConfig::from_toml_str(
            r#"
            prefix = "tenant-a"
            sidecar_suffix = ".meta.json"
            "#,
        )
        .unwrap();
        assert_eq!(c.prefix, "tenant-a");
        assert_eq!(c.sidecar_suffix, ".meta.json");
        assert_eq!(c.path_pattern, DEFAULT_PATTERN);
    }

    #[test]
    fn malformed_toml() {
        let err = StoreConfig::from_toml_str("max_file_size = \"big\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stow.toml");
        std::fs::write(&path, "root = \"/srv/files\"\nmax_file_size = 10\n").unwrap();
        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/files"));
        assert_eq!(c.max_file_size, 10);

        assert!(matches!(
            StoreConfig::load(dir.path().join("missing.toml")),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn parts_from_config() {
        let config = StoreConfig {
            encryption_key: Some("11".repeat(32)),
            max_file_size: 5,
            ..Default::default()
        };
        let parts = StoreParts::from_config(&config).unwrap();
        assert!(parts.cipher.is_enabled());
        assert_eq!(parts.limit.max(), 5);
        assert_eq!(parts.naming.suffix(), ".meta");
    }

    #[test]
    fn payload_names() {
        let parts = StoreParts::default();
        assert_eq!(parts.payload_name(Some("a.txt")).unwrap(), "a.txt");
        assert!(matches!(
            parts.payload_name(None),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            parts.payload_name(Some("\n")),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            parts.payload_name(Some("a.txt.meta")),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            parts.payload_name(Some("a/b")),
            Err(StoreError::PathSeparatorNotAllowed(_))
        ));
    }

    #[test]
    fn payload_paths() {
        let parts = StoreParts::default();
        assert_eq!(parts.payload_path("/docs/a.txt/").unwrap(), "docs/a.txt");
        assert_eq!(parts.payload_path("docs.meta/a.txt").unwrap(), "docs.meta/a.txt");
        assert_eq!(parts.payload_path("").unwrap(), "");
        assert!(matches!(
            parts.payload_path("docs/a.txt.meta"),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            parts.payload_path("/x.meta"),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            parts.payload_path("../x"),
            Err(StoreError::TraversalRejected(_))
        ));
    }

    #[test]
    fn parts_reject_bad_settings() {
        let bad_key = StoreConfig {
            encryption_key: Some("zz".into()),
            ..Default::default()
        };
        assert!(matches!(
            StoreParts::from_config(&bad_key),
            Err(StoreError::Crypto(_))
        ));

        let bad_pattern = StoreConfig {
            path_pattern: "([".into(),
            ..Default::default()
        };
        assert!(matches!(
            StoreParts::from_config(&bad_pattern),
            Err(StoreError::InvalidPattern { .. })
        ));

        let bad_suffix = StoreConfig {
            sidecar_suffix: String::new(),
            ..Default::default()
        };
        assert!(StoreParts::from_config(&bad_suffix).is_err());
    }
}

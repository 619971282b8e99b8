//! Path and file name validation.
//!
//! This is the only barrier between caller-supplied strings and backend keys
//! or filesystem paths. Every public store operation runs its inputs through
//! a [`PathSanitizer`] before touching a backend.
//!
//! Rules:
//! - `\n` and `\r` are stripped everywhere
//! - leading and trailing `/` are stripped from paths (not from names)
//! - a path segment that is exactly `..` rejects the whole input; `..` inside
//!   a longer segment (`..config`, `file..txt`) is fine
//! - a file name must not contain `/`
//! - whatever remains, if non-empty, must match the allow-list pattern
//!
//! The empty string is a valid result and denotes the root.

use regex::Regex;

use crate::error::{StoreError, StoreResult};

/// Default allow-list: letters and digits in any script, combining marks,
/// space, and `_ . / ( ) [ ] : ' -`.
pub const DEFAULT_PATTERN: &str = r"^[\p{L}\p{N}\p{M} _./()\[\]:'-]+$";

/// Narrow ASCII-only allow-list: `A-Z a-z 0-9 / _ . ( ) [ ] : -`.
pub const ASCII_PATTERN: &str = r"^[A-Za-z0-9/_.()\[\]:-]+$";

/// Validates and normalizes caller-supplied paths and file names.
#[derive(Clone, Debug)]
pub struct PathSanitizer {
    pattern: Regex,
}

impl PathSanitizer {
    /// A sanitizer using [`DEFAULT_PATTERN`].
    pub fn new() -> Self {
        Self {
            pattern: compile(DEFAULT_PATTERN).expect("default pattern compiles"),
        }
    }

    /// A sanitizer using a custom allow-list pattern.
    pub fn with_pattern(pattern: &str) -> StoreResult<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
        })
    }

    /// Replace the allow-list pattern. An invalid pattern is rejected and the
    /// current one is kept.
    pub fn set_pattern(&mut self, pattern: &str) -> StoreResult<()> {
        self.pattern = compile(pattern)?;
        Ok(())
    }

    /// The active allow-list pattern.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Sanitize a `/`-separated path.
    pub fn sanitize_path(&self, path: &str) -> StoreResult<String> {
        let cleaned = strip_line_breaks(path);
        let cleaned = cleaned.trim_matches('/');
        if cleaned.split('/').any(|segment| segment == "..") {
            return Err(StoreError::TraversalRejected(path.to_string()));
        }
        self.check_pattern(cleaned)?;
        Ok(cleaned.to_string())
    }

    /// Sanitize a bare file name, which must not carry a directory component.
    pub fn sanitize_file_name(&self, name: &str) -> StoreResult<String> {
        if name.contains('/') {
            return Err(StoreError::PathSeparatorNotAllowed(name.to_string()));
        }
        let cleaned = strip_line_breaks(name);
        if cleaned == ".." {
            return Err(StoreError::TraversalRejected(name.to_string()));
        }
        self.check_pattern(&cleaned)?;
        Ok(cleaned)
    }

    /// Sanitize an optional input; absence is an [`StoreError::InvalidInput`].
    pub fn sanitize_optional_path(&self, path: Option<&str>) -> StoreResult<String> {
        match path {
            Some(p) => self.sanitize_path(p),
            None => Err(StoreError::InvalidInput("path cannot be None".into())),
        }
    }

    /// Sanitize an optional file name; absence is an [`StoreError::InvalidInput`].
    pub fn sanitize_optional_file_name(&self, name: Option<&str>) -> StoreResult<String> {
        match name {
            Some(n) => self.sanitize_file_name(n),
            None => Err(StoreError::InvalidInput("file name cannot be None".into())),
        }
    }

    fn check_pattern(&self, cleaned: &str) -> StoreResult<()> {
        if !cleaned.is_empty() && !self.pattern.is_match(cleaned) {
            return Err(StoreError::ForbiddenCharacters(cleaned.to_string()));
        }
        Ok(())
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> StoreResult<Regex> {
    Regex::new(pattern).map_err(|e| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn strip_line_breaks(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

/// Join a sanitized folder and a sanitized name into a logical path.
pub fn join_path(folder: &str, name: &str) -> String {
    match (folder.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => folder.to_string(),
        _ => format!("{folder}/{name}"),
    }
}

/// Everything before the last segment of a logical path.
pub fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Last segment of a logical path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

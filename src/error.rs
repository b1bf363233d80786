// src/error.rs

//! Error types for the pack build pipeline
//!
//! Every failure carries a machine-checkable [`ErrorKind`] (via
//! [`Error::kind`]) plus a message naming the resource, path or key that
//! caused it.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by the build, pack and key subsystems
#[derive(Error, Debug)]
pub enum Error {
    /// A relative path tried to escape its base directory
    #[error("Path traversal detected: '{path}' escapes base directory {}", base.display())]
    PathTraversal { base: PathBuf, path: String },

    /// Malformed header, footer or resource table
    #[error("Corrupt pack {}: {reason}", path.display())]
    CorruptPack { path: PathBuf, reason: String },

    /// Key file exists but is not usable key material
    #[error("Invalid encryption key {}: {reason}", path.display())]
    InvalidKey { path: PathBuf, reason: String },

    /// Key file could not be found
    #[error("Encryption key not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Codec failure while compressing or decompressing a resource
    #[error("Compression failed for {resource}: {reason}")]
    Compression { resource: String, reason: String },

    /// Cipher failure while encrypting or decrypting a resource
    #[error("Encryption failed for {resource}: {reason}")]
    Encryption { resource: String, reason: String },

    /// Integrity check failed while reading a resource back
    #[error("Checksum mismatch for {resource}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        resource: String,
        expected: String,
        actual: String,
    },

    /// Filesystem access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Preflight validation found problems with the project layout
    #[error("Project validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Build configuration could not be loaded or is inconsistent
    #[error("Invalid build configuration: {0}")]
    Config(String),

    /// Two inputs normalized to the same virtual path
    #[error("Duplicate resource path: {0}")]
    DuplicateResource(String),

    /// Resource lookup by virtual path failed
    #[error("Resource not found in pack: {0}")]
    ResourceNotFound(String),

    /// Pack signing or signature verification failed
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Machine-checkable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathTraversal,
    CorruptPack,
    InvalidKey,
    NotFound,
    Compression,
    Encryption,
    Integrity,
    Io,
    Validation,
    Config,
    Signing,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::CorruptPack { .. } => ErrorKind::CorruptPack,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::KeyNotFound(_) | Self::ResourceNotFound(_) => ErrorKind::NotFound,
            Self::Compression { .. } => ErrorKind::Compression,
            Self::Encryption { .. } => ErrorKind::Encryption,
            Self::ChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::Io { .. } => ErrorKind::Io,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) | Self::DuplicateResource(_) => ErrorKind::Config,
            Self::Signing(_) => ErrorKind::Signing,
        }
    }

    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::CorruptPack {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_message_is_greppable() {
        let err = Error::PathTraversal {
            base: PathBuf::from("/out"),
            path: "../evil.txt".to_string(),
        };
        assert!(err.to_string().contains("Path traversal detected"));
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
    }

    #[test]
    fn test_io_wraps_path() {
        let err = Error::io(
            "/missing/file",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/missing/file"));
    }

    #[test]
    fn test_validation_joins_messages() {
        let err = Error::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Project validation failed: a; b");
    }
}

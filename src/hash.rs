// src/hash.rs

//! Integrity hashing for resources and whole packs
//!
//! Two primitives are used side by side:
//! - **CRC32**: cheap transport check over the stored body bytes
//! - **SHA-256**: cryptographic fingerprint of the raw resource content
//!
//! | Use | Algorithm | Covers |
//! |-----|-----------|--------|
//! | Resource body check | CRC32 | stored (compressed/encrypted) bytes |
//! | Resource identity | SHA-256 | raw bytes |
//! | Pack footer | CRC32 + truncated SHA-256 | everything before the footer |
//! | Manifest / signature | SHA-256 | everything before the footer |
//!
//! All functions are pure and deterministic, which reproducible builds rely on.

use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};

/// Length of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Raw SHA-256 digest
pub type Digest = [u8; DIGEST_LEN];

/// CRC32 (IEEE) of a byte slice. The empty slice hashes to `0`.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// SHA-256 of a byte slice
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex rendering of a digest
#[inline]
pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Parse a 64-character hex string back into a digest
pub fn from_hex(s: &str) -> Option<Digest> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// Incremental hasher feeding CRC32 and SHA-256 from the same stream
///
/// Used by the pack writer and reader to digest everything that precedes the
/// footer without buffering it twice.
pub struct PackHasher {
    crc: crc32fast::Hasher,
    sha: Sha256,
    len: u64,
}

impl PackHasher {
    pub fn new() -> Self {
        Self {
            crc: crc32fast::Hasher::new(),
            sha: Sha256::new(),
            len: 0,
        }
    }

    /// Feed more bytes into both digests
    pub fn update(&mut self, data: &[u8]) {
        self.crc.update(data);
        self.sha.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes hashed so far
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return `(crc32, sha256)`
    pub fn finalize(self) -> (u32, Digest) {
        (self.crc.finalize(), self.sha.finalize().into())
    }
}

impl Default for PackHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify raw resource bytes against an expected SHA-256
pub fn verify_sha256(resource: &str, data: &[u8], expected: &Digest) -> Result<()> {
    let actual = sha256(data);
    if &actual == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            resource: resource.to_string(),
            expected: to_hex(expected),
            actual: to_hex(&actual),
        })
    }
}

/// Verify stored body bytes against an expected CRC32
pub fn verify_crc32(resource: &str, data: &[u8], expected: u32) -> Result<()> {
    let actual = crc32(data);
    if actual == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            resource: resource.to_string(),
            expected: format!("{expected:08x}"),
            actual: format!("{actual:08x}"),
        })
    }
}

// src/crypto/cipher.rs
//! AES-256-GCM encryption of resource bodies
//!
//! The nonce is derived from the resource's virtual path and the SHA-256 of
//! its raw content, so encrypting the same resource twice yields the same
//! bytes and builds stay reproducible. A nonce only repeats for an identical
//! (path, content) pair, which encrypts to an identical body anyway.
//!
//! The virtual path is bound as associated data: a body moved to another
//! table entry fails authentication.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest as _, Sha256};

use crate::crypto::keys::KeyMaterial;
use crate::error::{Error, Result};
use crate::hash::Digest;

/// Length of the authentication tag appended to every encrypted body
pub const TAG_LEN: usize = 16;

const NONCE_LEN: usize = 12;
const NONCE_DOMAIN: &[u8] = b"nmpack/resource-nonce/v1";

/// Encrypts and decrypts resource bodies with one pack key
pub struct ResourceCipher {
    cipher: Aes256Gcm,
}

impl ResourceCipher {
    pub fn new(key: &KeyMaterial) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    fn nonce(path: &str, raw_digest: &Digest) -> [u8; NONCE_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(NONCE_DOMAIN);
        hasher.update((path.len() as u64).to_le_bytes());
        hasher.update(path.as_bytes());
        hasher.update(raw_digest);
        let full: [u8; 32] = hasher.finalize().into();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&full[..NONCE_LEN]);
        nonce
    }

    /// Encrypt a (possibly compressed) body for the resource at `path`
    pub fn encrypt(&self, path: &str, raw_digest: &Digest, body: &[u8]) -> Result<Vec<u8>> {
        let nonce = Self::nonce(path, raw_digest);
        self.cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: body,
                    aad: path.as_bytes(),
                },
            )
            .map_err(|e| Error::Encryption {
                resource: path.to_string(),
                reason: e.to_string(),
            })
    }

    /// Decrypt and authenticate a stored body
    pub fn decrypt(&self, path: &str, raw_digest: &Digest, stored: &[u8]) -> Result<Vec<u8>> {
        let nonce = Self::nonce(path, raw_digest);
        self.cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: stored,
                    aad: path.as_bytes(),
                },
            )
            .map_err(|_| Error::Encryption {
                resource: path.to_string(),
                reason: "authentication failed (wrong key or tampered body)".to_string(),
            })
    }
}

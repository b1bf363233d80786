// src/crypto/keys.rs
//! Symmetric key loading for encrypted packs
//!
//! A key file is exactly 32 raw bytes with no header. The bytes are the key;
//! there is no derivation, stretching or padding. Anything else is rejected
//! before it can become a live key.

use crate::error::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// Length of an AES-256 key in bytes
pub const KEY_LEN: usize = 32;

/// 32 bytes of validated key material
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial([u8; KEY_LEN]);

impl KeyMaterial {
    /// Wrap raw bytes, rejecting anything that is not exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }
}

// Never print key bytes
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Load a 32-byte key from a raw key file
///
/// A missing file is [`Error::KeyNotFound`]; a file of any other length is
/// [`Error::InvalidKey`].
pub fn load_key(path: &Path) -> Result<KeyMaterial> {
    let unreadable = |e: io::Error| match e.kind() {
        io::ErrorKind::NotFound => Error::KeyNotFound(path.to_path_buf()),
        _ => Error::InvalidKey {
            path: path.to_path_buf(),
            reason: format!("unreadable key file: {e}"),
        },
    };

    // One byte past the key length is enough to tell a long file apart
    let file = File::open(path).map_err(unreadable)?;
    let mut bytes = Vec::with_capacity(KEY_LEN + 1);
    file.take(KEY_LEN as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(unreadable)?;

    KeyMaterial::from_slice(&bytes).ok_or_else(|| Error::InvalidKey {
        path: path.to_path_buf(),
        reason: if bytes.len() > KEY_LEN {
            format!("expected {KEY_LEN} bytes, found more")
        } else {
            format!("expected {KEY_LEN} bytes, found {}", bytes.len())
        },
    })
}

/// Generate a new key and write it to `path`
///
/// Refuses to overwrite an existing file. On Unix the file is created with
/// mode 0600.
pub fn generate_key(path: &Path) -> Result<KeyMaterial> {
    if path.exists() {
        return Err(Error::InvalidKey {
            path: path.to_path_buf(),
            reason: "refusing to overwrite existing key file".to_string(),
        });
    }

    let key = KeyMaterial::generate();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, key.as_bytes()).map_err(|e| Error::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).map_err(|e| Error::io(path, e))?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))?;
    }

    Ok(key)
}

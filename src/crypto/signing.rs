// src/crypto/signing.rs
//! Pack signing
//!
//! Provides Ed25519 detached signatures over a pack's whole-file SHA-256.
//! Keys are stored as small TOML documents holding base64 key bytes.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::Digest;

const ALGORITHM: &str = "ed25519";

/// Detached signature document written next to a pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSignature {
    /// Signature algorithm (currently only "ed25519")
    pub algorithm: String,
    /// Base64-encoded signature over the pack digest
    pub signature: String,
    /// Base64-encoded public key
    pub public_key: String,
    #[serde(default)]
    pub key_id: Option<String>,
    /// Build timestamp at signing time (RFC 3339)
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A signing key pair for packs
pub struct SigningKeyPair {
    signing_key: SigningKey,
    key_id: Option<String>,
}

impl SigningKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            key_id: None,
        }
    }

    /// Set a human-readable key identifier
    pub fn with_key_id(mut self, id: &str) -> Self {
        self.key_id = Some(id.to_string());
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().as_bytes())
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Sign a pack digest
    ///
    /// `timestamp` is the build timestamp (seconds since epoch), so signing a
    /// deterministic build produces a deterministic document.
    pub fn sign(&self, digest: &Digest, timestamp: u64) -> PackSignature {
        let signature = self.signing_key.sign(digest);
        PackSignature {
            algorithm: ALGORITHM.to_string(),
            signature: BASE64.encode(signature.to_bytes()),
            public_key: self.public_key_base64(),
            key_id: self.key_id.clone(),
            timestamp: render_timestamp(timestamp),
        }
    }

    /// Save the key pair to files (private and public)
    pub fn save_to_files(&self, private_path: &Path, public_path: &Path) -> Result<()> {
        let private_data = KeyFile {
            algorithm: ALGORITHM.to_string(),
            key: BASE64.encode(self.signing_key.to_bytes()),
            key_id: self.key_id.clone(),
        };
        write_key_file(private_path, &private_data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(private_path)
                .map_err(|e| Error::io(private_path, e))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(private_path, perms).map_err(|e| Error::io(private_path, e))?;
        }

        let public_data = KeyFile {
            algorithm: ALGORITHM.to_string(),
            key: self.public_key_base64(),
            key_id: self.key_id.clone(),
        };
        write_key_file(public_path, &public_data)
    }

    /// Load a key pair from a private key file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let key_file = read_key_file(path)?;
        let key_array: [u8; 32] = decode_key(&key_file.key)?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_array),
            key_id: key_file.key_id,
        })
    }
}

/// Key file format
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    algorithm: String,
    key: String,
    #[serde(default)]
    key_id: Option<String>,
}

fn write_key_file(path: &Path, data: &KeyFile) -> Result<()> {
    let toml = toml::to_string_pretty(data)
        .map_err(|e| Error::Signing(format!("Failed to encode key file: {e}")))?;
    fs::write(path, toml).map_err(|e| Error::io(path, e))
}

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let key_file: KeyFile = toml::from_str(&content)
        .map_err(|e| Error::Signing(format!("Failed to parse key file {}: {e}", path.display())))?;

    if key_file.algorithm != ALGORITHM {
        return Err(Error::Signing(format!(
            "Unsupported key algorithm: {}",
            key_file.algorithm
        )));
    }
    Ok(key_file)
}

fn decode_key(encoded: &str) -> Result<[u8; 32]> {
    BASE64
        .decode(encoded)
        .map_err(|e| Error::Signing(format!("Invalid base64 in key: {e}")))?
        .try_into()
        .map_err(|_| Error::Signing("Invalid key length".to_string()))
}

fn render_timestamp(timestamp: u64) -> Option<String> {
    let secs = i64::try_from(timestamp).ok()?;
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}

/// Load a public key (base64) from a public key file
pub fn load_public_key(path: &Path) -> Result<String> {
    Ok(read_key_file(path)?.key)
}

/// Verify a detached signature against a pack digest
///
/// When `trusted_key` is given, the signature must also have been made by
/// that key.
pub fn verify_signature(
    digest: &Digest,
    signature: &PackSignature,
    trusted_key: Option<&str>,
) -> Result<()> {
    if signature.algorithm != ALGORITHM {
        return Err(Error::Signing(format!(
            "Unsupported signature algorithm: {}",
            signature.algorithm
        )));
    }

    if let Some(trusted) = trusted_key
        && trusted != signature.public_key
    {
        return Err(Error::Signing("Signature made by an untrusted key".to_string()));
    }

    let key_bytes = decode_key(&signature.public_key)?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| Error::Signing(format!("Invalid public key: {e}")))?;

    let sig_bytes = BASE64
        .decode(&signature.signature)
        .map_err(|e| Error::Signing(format!("Invalid base64 in signature: {e}")))?;
    let sig = Signature::from_slice(&sig_bytes)
        .map_err(|e| Error::Signing(format!("Invalid signature format: {e}")))?;

    verifying_key
        .verify(digest, &sig)
        .map_err(|e| Error::Signing(format!("Signature verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use tempfile::TempDir;

    #[test]
    fn test_sign_and_verify() {
        let keypair = SigningKeyPair::generate().with_key_id("release");
        let digest = sha256(b"pack bytes");

        let signature = keypair.sign(&digest, 1_704_067_200);
        assert_eq!(signature.algorithm, "ed25519");
        assert_eq!(signature.key_id.as_deref(), Some("release"));
        assert_eq!(signature.timestamp.as_deref(), Some("2024-01-01T00:00:00+00:00"));

        verify_signature(&digest, &signature, None).unwrap();
        verify_signature(&digest, &signature, Some(&keypair.public_key_base64())).unwrap();
    }

    #[test]
    fn test_signature_is_deterministic() {
        let keypair = SigningKeyPair::generate();
        let digest = sha256(b"pack bytes");
        assert_eq!(keypair.sign(&digest, 42), keypair.sign(&digest, 42));
    }

    #[test]
    fn test_verify_rejects_other_digest() {
        let keypair = SigningKeyPair::generate();
        let signature = keypair.sign(&sha256(b"one"), 0);
        assert!(verify_signature(&sha256(b"two"), &signature, None).is_err());
    }

    #[test]
    fn test_verify_rejects_untrusted_key() {
        let signer = SigningKeyPair::generate();
        let other = SigningKeyPair::generate();
        let digest = sha256(b"pack");
        let signature = signer.sign(&digest, 0);
        assert!(verify_signature(&digest, &signature, Some(&other.public_key_base64())).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let private_path = temp_dir.path().join("sign.private");
        let public_path = temp_dir.path().join("sign.public");

        let keypair = SigningKeyPair::generate().with_key_id("test-key");
        keypair.save_to_files(&private_path, &public_path).unwrap();

        let loaded = SigningKeyPair::load_from_file(&private_path).unwrap();
        assert_eq!(loaded.public_key_base64(), keypair.public_key_base64());
        assert_eq!(loaded.key_id(), Some("test-key"));
        assert_eq!(load_public_key(&public_path).unwrap(), keypair.public_key_base64());
    }
}

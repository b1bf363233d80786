// src/crypto/mod.rs
//! Key material, resource encryption and pack signing
//!
//! - [`keys`]: raw 32-byte key files
//! - [`cipher`]: AES-256-GCM for resource bodies
//! - [`signing`]: Ed25519 detached pack signatures

pub mod cipher;
pub mod keys;
pub mod signing;

pub use cipher::ResourceCipher;
pub use keys::{KeyMaterial, generate_key, load_key};
pub use signing::{PackSignature, SigningKeyPair, verify_signature};

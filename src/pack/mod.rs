// src/pack/mod.rs
//! Resource pack container
//!
//! A pack is a single `.nmres` file: fixed header, resource table,
//! concatenated bodies and a fixed 32-byte footer carrying the whole-pack
//! digest. See [`format`] for the byte layout.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{PackFooter, PackHeader, ResourceEntry};
pub use reader::{PackReader, VerifyReport};
pub use writer::{PackOptions, PackSummary, ResourceInput, ResourceSource, write_pack};

/// File extension used for packs
pub const PACK_EXTENSION: &str = "nmres";

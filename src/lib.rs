// src/lib.rs

//! nmpack: asset build and packaging for NovelMind projects
//!
//! Turns a project's loose assets into a deterministic, integrity-checked
//! resource pack (`.nmres`), optionally compressed, encrypted and signed.
//!
//! # Architecture
//!
//! - Deterministic: identical inputs and config give identical pack bytes
//! - Two anchors: fixed header and 32-byte footer validate a pack cheaply
//! - Safe paths: every virtual path is resolved against a base directory
//!   before bytes are staged or extracted
//! - Atomic output: packs are written to a temp file and renamed into place

pub mod build;
pub mod compression;
pub mod crypto;
mod error;
pub mod filesystem;
pub mod hash;
pub mod pack;
pub mod progress;
pub mod resource;

pub use build::{BuildConfig, BuildPlatform, BuildReport, BuildSystem, BuildType};
pub use compression::CompressionLevel;
pub use error::{Error, ErrorKind, Result};
pub use pack::{PackReader, PackSummary, ResourceInput};
pub use progress::{LogProgress, ProgressTracker, SilentProgress};
pub use resource::{ResourceType, classify};

// src/compression/mod.rs
//! Resource body compression
//!
//! Bodies are compressed with zstd at a level picked from the build's
//! [`CompressionLevel`]. The encoder runs single-threaded with no dictionary,
//! so identical input and level always produce identical bytes.
//!
//! `CompressionLevel::None` is the identity transform. A codec failure is
//! reported as an error and never falls back to storing raw bytes.

use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::str::FromStr;
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to compress with zstd level {level}: {source}")]
    Compression { level: i32, source: io::Error },

    #[error("Failed to decompress zstd data: {0}")]
    Decompression(io::Error),

    #[error("Decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Decompressed data exceeds the expected {expected} bytes")]
    Oversized { expected: u64 },

    #[error("Unknown compression level: {0}")]
    UnknownLevel(String),
}

/// Compression effort selected for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Store bodies verbatim
    None,
    /// Fastest zstd level
    Fast,
    #[default]
    Balanced,
    /// Smallest output, slowest
    Max,
}

impl CompressionLevel {
    /// zstd level for this setting, or `None` for the identity transform
    pub const fn zstd_level(&self) -> Option<i32> {
        match self {
            Self::None => None,
            Self::Fast => Some(1),
            Self::Balanced => Some(9),
            Self::Max => Some(19),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompressionLevel {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "store" => Ok(Self::None),
            "fast" => Ok(Self::Fast),
            "balanced" | "default" => Ok(Self::Balanced),
            "max" | "best" => Ok(Self::Max),
            _ => Err(CompressionError::UnknownLevel(s.to_string())),
        }
    }
}

/// Compress a buffer at the given level
///
/// # Example
/// ```
/// use nmpack::compression::{compress, CompressionLevel};
///
/// let data = vec![b'A'; 1024];
/// assert_eq!(compress(&data, CompressionLevel::None).unwrap(), data);
/// assert!(compress(&data, CompressionLevel::Max).unwrap().len() < data.len());
/// ```
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>, CompressionError> {
    match level.zstd_level() {
        None => Ok(data.to_vec()),
        Some(lvl) => zstd::stream::encode_all(data, lvl)
            .map_err(|source| CompressionError::Compression { level: lvl, source }),
    }
}

/// Decompress a zstd body and check it against the recorded raw length
///
/// Output is capped one byte past `expected_len`, so a body that inflates
/// beyond its recorded size is rejected without being fully decoded.
pub fn decompress(data: &[u8], expected_len: u64) -> Result<Vec<u8>, CompressionError> {
    let decoder =
        zstd::stream::read::Decoder::new(data).map_err(CompressionError::Decompression)?;
    let mut output = Vec::new();
    decoder
        .take(expected_len.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(CompressionError::Decompression)?;

    if output.len() as u64 > expected_len {
        return Err(CompressionError::Oversized {
            expected: expected_len,
        });
    }
    if output.len() as u64 != expected_len {
        return Err(CompressionError::SizeMismatch {
            expected: expected_len,
            actual: output.len() as u64,
        });
    }
    Ok(output)
}

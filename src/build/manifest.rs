// src/build/manifest.rs

//! Build manifest written next to each pack
//!
//! The pack itself carries no timestamp so that deterministic builds stay
//! byte-identical; the build time and configuration live here instead.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::config::{BuildConfig, BuildPlatform, BuildType};
use crate::compression::CompressionLevel;
use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use crate::hash::{self, Digest};
use crate::pack::PackSummary;

/// Manifest schema version
pub const MANIFEST_VERSION: u32 = 1;

/// JSON document describing one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub manifest_version: u32,
    pub version: String,
    pub build_number: u32,
    pub platform: BuildPlatform,
    pub build_type: BuildType,
    /// Seconds since epoch
    pub build_timestamp: u64,
    /// RFC 3339 rendering of `build_timestamp`
    pub build_time: String,
    pub compression: CompressionLevel,
    pub resource_count: usize,
    pub pack_size: u64,
    /// Hex SHA-256 over the pack bytes preceding the footer
    pub sha256: String,
    pub encrypted: bool,
    pub signed: bool,
}

impl BuildManifest {
    pub fn new(config: &BuildConfig, summary: &PackSummary, timestamp: u64, signed: bool) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION,
            version: config.version.clone(),
            build_number: config.build_number,
            platform: config.platform,
            build_type: config.build_type,
            build_timestamp: timestamp,
            build_time: render_time(timestamp),
            compression: config.compression,
            resource_count: summary.resource_count,
            pack_size: summary.pack_size,
            sha256: hash::to_hex(&summary.digest),
            encrypted: config.encrypt_assets,
            signed,
        }
    }

    /// Whole-pack digest recorded in the manifest
    pub fn digest(&self) -> Option<Digest> {
        hash::from_hex(&self.sha256)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to encode manifest: {e}")))?;
        write_atomic(path, &json)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_slice(&content)
            .map_err(|e| Error::Config(format!("Invalid manifest {}: {e}", path.display())))
    }
}

/// `<pack>.manifest.json`
pub fn manifest_path(pack: &Path) -> PathBuf {
    sidecar_path(pack, "manifest.json")
}

/// `<pack>.sig`
pub fn signature_path(pack: &Path) -> PathBuf {
    sidecar_path(pack, "sig")
}

fn sidecar_path(pack: &Path, suffix: &str) -> PathBuf {
    let mut name = pack.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    pack.with_file_name(name)
}

fn render_time(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

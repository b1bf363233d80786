// src/build/config.rs

//! Build configuration types

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::compression::CompressionLevel;
use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_filename;

/// Target platform for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildPlatform {
    #[default]
    Windows,
    Linux,
    MacOS,
    /// Browser (WebAssembly) builds
    Web,
    Android,
    IOS,
}

impl BuildPlatform {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "windows" | "win" | "win64" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" | "mac" | "osx" => Some(Self::MacOS),
            "web" | "wasm" => Some(Self::Web),
            "android" => Some(Self::Android),
            "ios" => Some(Self::IOS),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(super::utils::platform_name(*self))
    }
}

impl FromStr for BuildPlatform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown platform '{s}'"))
    }
}

/// Debug or release build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

impl std::fmt::Display for BuildType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "Debug"),
            Self::Release => write!(f, "Release"),
        }
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            _ => Err(format!("unknown build type '{s}'")),
        }
    }
}

/// Build configuration
///
/// Loaded from a TOML file or built in code, then handed to
/// [`BuildSystem::configure`](super::BuildSystem::configure). Missing keys
/// take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project root (contains project.json, scripts/, assets/)
    pub project_path: PathBuf,

    /// Directory receiving the pack, manifest and signature
    pub output_path: PathBuf,

    /// Semantic version string of the game build
    pub version: String,

    pub build_number: u32,

    pub platform: BuildPlatform,

    pub build_type: BuildType,

    /// Bundle assets into a pack (false stages loose files)
    pub pack_assets: bool,

    pub encrypt_assets: bool,

    pub compression: CompressionLevel,

    /// Make output bytes independent of when and where the build ran
    pub deterministic_build: bool,

    /// Fixed build timestamp in seconds since epoch (0 = wall clock)
    pub fixed_build_timestamp: u64,

    pub sign_packs: bool,

    /// Raw 32-byte key file used when `encrypt_assets` is set
    pub encryption_key_path: Option<PathBuf>,

    /// Ed25519 private key file used when `sign_packs` is set
    pub signing_key_path: Option<PathBuf>,

    /// Pack file stem (`<pack_name>.nmres`)
    pub pack_name: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from("."),
            output_path: PathBuf::from("build"),
            version: "1.0.0".to_string(),
            build_number: 1,
            platform: BuildPlatform::Windows,
            build_type: BuildType::Release,
            pack_assets: true,
            encrypt_assets: false,
            compression: CompressionLevel::Balanced,
            deterministic_build: true,
            fixed_build_timestamp: 0,
            sign_packs: false,
            encryption_key_path: None,
            signing_key_path: None,
            pack_name: "data".to_string(),
        }
    }
}

impl BuildConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project and output directories
    pub fn with_paths(mut self, project: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        self.project_path = project.into();
        self.output_path = output.into();
        self
    }

    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }

    /// Enable encryption with the given key file
    pub fn with_encryption_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.encrypt_assets = true;
        self.encryption_key_path = Some(path.into());
        self
    }

    /// Enable signing with the given private key file
    pub fn with_signing_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.sign_packs = true;
        self.signing_key_path = Some(path.into());
        self
    }

    pub fn with_fixed_timestamp(mut self, timestamp: u64) -> Self {
        self.deterministic_build = true;
        self.fixed_build_timestamp = timestamp;
        self
    }

    /// Load a config from a TOML file
    ///
    /// Relative project/output/key paths are resolved against the file's
    /// directory.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(dir) = path.parent() {
            config.project_path = dir.join(&config.project_path);
            config.output_path = dir.join(&config.output_path);
            config.encryption_key_path = config.encryption_key_path.map(|p| dir.join(p));
            config.signing_key_path = config.signing_key_path.map(|p| dir.join(p));
        }
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// File name of the pack this config produces
    ///
    /// `pack_name` must be a bare file name; anything with directory
    /// components is rejected.
    pub fn pack_file_name(&self) -> Result<String> {
        let name = sanitize_filename(&self.pack_name)?;
        Ok(format!("{name}.{}", crate::pack::PACK_EXTENSION))
    }
}

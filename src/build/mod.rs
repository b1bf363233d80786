// src/build/mod.rs

//! Build orchestration
//!
//! [`BuildSystem`] holds one [`BuildConfig`] and drives a build:
//!
//! 1. Validate the project layout
//! 2. Collect resources under `assets/` and `scripts/`
//! 3. Write `<output>/<pack_name>.nmres` (or stage loose files)
//! 4. Sign the pack and write the build manifest
//!
//! The build timestamp is fixed when the build is deterministic and a fixed
//! timestamp is configured; otherwise the wall clock is sampled once per
//! configuration so every consumer within one build sees the same value.

mod config;
mod manifest;
pub mod utils;
mod validate;

pub use config::{BuildConfig, BuildPlatform, BuildType};
pub use manifest::{BuildManifest, manifest_path, signature_path};
pub use validate::{PROJECT_FILE, REQUIRED_DIRS, validate_project};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::crypto::{self, PackSignature, ResourceCipher, SigningKeyPair};
use crate::error::{Error, Result};
use crate::filesystem::path::{normalize_vfs_path, sanitize_output_path};
use crate::filesystem::write_atomic;
use crate::hash::{self, Digest};
use crate::pack::{PackOptions, PackReader, PackSummary, ResourceInput, ResourceSource, write_pack};
use crate::progress::{BuildPhase, LogProgress, ProgressTracker, SilentProgress};

/// Outcome of [`BuildSystem::build`]
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Pack file, or the loose staging root when `pack_assets` is off
    pub output: PathBuf,
    pub packed: bool,
    pub resource_count: usize,
    pub raw_bytes: u64,
    pub stored_bytes: u64,
    /// Whole-pack digest (packed builds only)
    pub digest: Option<Digest>,
    pub timestamp: u64,
    pub manifest: Option<PathBuf>,
    pub signature: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Build orchestrator
#[derive(Debug, Default)]
pub struct BuildSystem {
    config: BuildConfig,
    wall_clock: OnceLock<u64>,
}

impl BuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration for subsequent builds
    pub fn configure(&mut self, config: BuildConfig) {
        self.config = config;
        self.wall_clock = OnceLock::new();
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Timestamp recorded for this build, in seconds since epoch
    pub fn get_build_timestamp(&self) -> u64 {
        if self.config.deterministic_build && self.config.fixed_build_timestamp != 0 {
            return self.config.fixed_build_timestamp;
        }
        *self
            .wall_clock
            .get_or_init(|| chrono::Utc::now().timestamp().max(0) as u64)
    }

    /// Check a project layout; see [`validate_project`]
    pub fn validate_project(&self, project: &Path) -> Result<Vec<String>> {
        validate_project(project)
    }

    /// Load the configured encryption key
    ///
    /// Asking for encryption without a usable key is an error, never a
    /// silent fallback to plaintext.
    pub fn load_cipher(&self) -> Result<ResourceCipher> {
        let path = self
            .config
            .encryption_key_path
            .as_deref()
            .ok_or_else(|| Error::InvalidKey {
                path: PathBuf::new(),
                reason: "encryption requested but no key file is configured".to_string(),
            })?;
        let key = crypto::load_key(path)?;
        debug!("Loaded encryption key from {}", path.display());
        Ok(ResourceCipher::new(&key))
    }

    fn load_signing_key(&self) -> Result<SigningKeyPair> {
        let path = self
            .config
            .signing_key_path
            .as_deref()
            .ok_or_else(|| {
                Error::Signing("signing requested but no signing key is configured".to_string())
            })?;
        SigningKeyPair::load_from_file(path)
    }

    /// Write a pack from an explicit resource list
    pub fn build_pack(
        &self,
        output: &Path,
        resources: &[ResourceInput],
        encrypt: bool,
        sign: bool,
    ) -> Result<PackSummary> {
        self.build_pack_with_progress(output, resources, encrypt, sign, &SilentProgress::new())
    }

    fn build_pack_with_progress(
        &self,
        output: &Path,
        resources: &[ResourceInput],
        encrypt: bool,
        sign: bool,
        progress: &dyn ProgressTracker,
    ) -> Result<PackSummary> {
        let cipher = if encrypt { Some(self.load_cipher()?) } else { None };
        // Load the signing key up front so a bad key fails before any work
        let signer = if sign { Some(self.load_signing_key()?) } else { None };

        let opts = PackOptions {
            compression: self.config.compression,
            cipher: cipher.as_ref(),
            staging_root: &self.config.output_path,
        };

        progress.set_phase(BuildPhase::Processing);
        let summary = write_pack(output, resources, &opts, progress)?;

        let sig_path = signature_path(output);
        if let Some(signer) = signer {
            progress.set_phase(BuildPhase::Signing);
            let signature = signer.sign(&summary.digest, self.get_build_timestamp());
            let json = serde_json::to_vec_pretty(&signature)
                .map_err(|e| Error::Signing(format!("Failed to encode signature: {e}")))?;
            write_atomic(&sig_path, &json)?;
            info!("Signed {} -> {}", output.display(), sig_path.display());
        } else {
            // A signature left by an earlier build no longer matches this pack
            match fs::remove_file(&sig_path) {
                Ok(()) => debug!("Removed stale signature {}", sig_path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&sig_path, e)),
            }
        }

        Ok(summary)
    }

    /// Gather every resource under the project's `assets/` and `scripts/`
    ///
    /// Hidden files and directories are skipped. The result is sorted by
    /// virtual path so the pack layout does not depend on directory order.
    pub fn collect_resources(&self) -> Result<Vec<ResourceInput>> {
        let root = &self.config.project_path;
        let mut resources = Vec::new();

        for dir in REQUIRED_DIRS {
            let base = root.join(dir);
            if !base.is_dir() {
                continue;
            }

            let walker = WalkDir::new(&base)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
            for entry in walker {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base.clone());
                    Error::io(path, e.into())
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let rel = entry.path().strip_prefix(root).map_err(|_| {
                    Error::Config(format!(
                        "{} is outside the project root",
                        entry.path().display()
                    ))
                })?;
                let vpath = normalize_vfs_path(&rel.to_string_lossy());
                resources.push(ResourceInput::from_file(vpath, entry.path()));
            }
        }

        resources.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Collected {} resources from {}", resources.len(), root.display());
        Ok(resources)
    }

    /// Copy resources to `<output>/<virtual path>` without packing
    fn stage_loose(&self, resources: &[ResourceInput], progress: &dyn ProgressTracker) -> Result<u64> {
        let mut total = 0u64;
        for input in resources {
            let target = sanitize_output_path(&self.config.output_path, &input.path)?;
            let data = match &input.source {
                ResourceSource::Memory(data) => data.clone(),
                ResourceSource::File(path) => fs::read(path).map_err(|e| Error::io(path, e))?,
            };
            write_atomic(&target, &data)?;
            total += data.len() as u64;
            progress.increment(1);
        }
        Ok(total)
    }

    /// Run the whole pipeline with progress logged through tracing
    pub fn build(&self) -> Result<BuildReport> {
        let progress = LogProgress::new("build");
        let result = self.build_with_progress(&progress);
        match &result {
            Ok(report) => progress.finish_with_message(&format!(
                "{} resources in {:.2?}",
                report.resource_count, report.elapsed
            )),
            Err(e) => progress.finish_with_error(&e.to_string()),
        }
        result
    }

    /// Run the whole pipeline, reporting to `progress`
    pub fn build_with_progress(&self, progress: &dyn ProgressTracker) -> Result<BuildReport> {
        let start = Instant::now();
        let config = &self.config;
        let timestamp = self.get_build_timestamp();

        progress.set_phase(BuildPhase::Validating);
        let errors = self.validate_project(&config.project_path)?;
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        progress.set_phase(BuildPhase::Collecting);
        let resources = self.collect_resources()?;
        progress.set_length(resources.len() as u64);
        if resources.is_empty() {
            warn!("No resources found in {}", config.project_path.display());
        }

        if !config.pack_assets {
            if config.encrypt_assets {
                return Err(Error::Config(
                    "encrypt_assets requires pack_assets".to_string(),
                ));
            }
            progress.set_phase(BuildPhase::Writing);
            let raw_bytes = self.stage_loose(&resources, progress)?;
            info!(
                "Staged {} loose resources in {}",
                resources.len(),
                config.output_path.display()
            );
            return Ok(BuildReport {
                output: config.output_path.clone(),
                packed: false,
                resource_count: resources.len(),
                raw_bytes,
                stored_bytes: raw_bytes,
                digest: None,
                timestamp,
                manifest: None,
                signature: None,
                elapsed: start.elapsed(),
            });
        }

        let pack_path = config.output_path.join(config.pack_file_name()?);
        let summary = self.build_pack_with_progress(
            &pack_path,
            &resources,
            config.encrypt_assets,
            config.sign_packs,
            progress,
        )?;

        let manifest = BuildManifest::new(config, &summary, timestamp, config.sign_packs);
        let manifest_file = manifest_path(&pack_path);
        manifest.write(&manifest_file)?;

        info!(
            "Built {} v{} ({}) for {}: {} resources, {} -> {}",
            pack_path.display(),
            config.version,
            config.build_number,
            config.platform,
            summary.resource_count,
            utils::format_file_size(summary.raw_bytes),
            utils::format_file_size(summary.pack_size)
        );

        Ok(BuildReport {
            output: pack_path.clone(),
            packed: true,
            resource_count: summary.resource_count,
            raw_bytes: summary.raw_bytes,
            stored_bytes: summary.stored_bytes,
            digest: Some(summary.digest),
            timestamp,
            manifest: Some(manifest_file),
            signature: config.sign_packs.then(|| signature_path(&pack_path)),
            elapsed: start.elapsed(),
        })
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Check a pack's detached signature against its recomputed digest
///
/// Returns the signature document on success.
pub fn verify_pack_signature(pack: &Path, trusted_key: Option<&str>) -> Result<PackSignature> {
    let sig_path = signature_path(pack);
    let content = fs::read(&sig_path).map_err(|e| Error::io(&sig_path, e))?;
    let signature: PackSignature = serde_json::from_slice(&content)
        .map_err(|e| Error::Signing(format!("Invalid signature file {}: {e}", sig_path.display())))?;

    let digest = PackReader::open(pack)?.pack_digest()?;
    crypto::verify_signature(&digest, &signature, trusted_key)?;
    debug!("Signature OK for {} (sha256 {})", pack.display(), hash::to_hex(&digest));
    Ok(signature)
}

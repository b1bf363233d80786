// src/pack/writer.rs
//! Pack writer
//!
//! Resources are prepared (classified, sanitized, compressed, hashed and
//! optionally encrypted) on the rayon pool, collected back in input order,
//! and then written by a single thread. The pack is streamed into a temporary
//! file next to the destination and renamed into place only after the footer
//! is written, so a failed build never leaves a partial pack behind.

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::compression::{self, CompressionLevel};
use crate::crypto::ResourceCipher;
use crate::error::{Error, Result};
use crate::filesystem::path::{normalize_vfs_path, sanitize_output_path};
use crate::hash::{self, Digest, PackHasher};
use crate::pack::format::{
    FLAG_COMPRESSED, FLAG_ENCRYPTED, FOOTER_LEN, HEADER_LEN, PackFooter, PackHeader,
    ResourceEntry,
};
use crate::progress::ProgressTracker;
use crate::resource::ResourceType;

/// Where a resource's bytes come from
#[derive(Debug, Clone)]
pub enum ResourceSource {
    /// Bytes already in memory
    Memory(Vec<u8>),
    /// Read from disk during preparation
    File(PathBuf),
}

/// One logical asset handed to the writer
#[derive(Debug, Clone)]
pub struct ResourceInput {
    /// Virtual path inside the pack (normalized by the writer)
    pub path: String,
    pub source: ResourceSource,
}

impl ResourceInput {
    pub fn from_bytes(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            source: ResourceSource::Memory(data.into()),
        }
    }

    pub fn from_file(path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: ResourceSource::File(file.into()),
        }
    }
}

/// Per-build settings for the writer
pub struct PackOptions<'a> {
    pub compression: CompressionLevel,
    /// Encrypt bodies when set
    pub cipher: Option<&'a ResourceCipher>,
    /// Directory resource paths must resolve under
    pub staging_root: &'a Path,
}

/// A resource ready to be written
#[derive(Debug)]
pub struct PreparedResource {
    pub entry: ResourceEntry,
    pub body: Vec<u8>,
}

/// Outcome of writing a pack
#[derive(Debug, Clone)]
pub struct PackSummary {
    pub path: PathBuf,
    pub resource_count: usize,
    /// Sum of raw resource sizes
    pub raw_bytes: u64,
    /// Sum of stored body sizes
    pub stored_bytes: u64,
    /// Size of the pack file
    pub pack_size: u64,
    /// SHA-256 of every byte before the footer
    pub digest: Digest,
}

/// Run the per-resource pipeline for one input
pub fn prepare_resource(input: &ResourceInput, opts: &PackOptions<'_>) -> Result<PreparedResource> {
    let path = normalize_vfs_path(&input.path);
    if path.is_empty() {
        return Err(Error::Config(format!(
            "resource path '{}' is empty after normalization",
            input.path
        )));
    }

    // Security gate: the virtual path must stay inside the staging root
    sanitize_output_path(opts.staging_root, &path)?;

    let resource_type = ResourceType::from_path(&path);

    let raw = match &input.source {
        ResourceSource::Memory(data) => data.clone(),
        ResourceSource::File(file) => fs::read(file).map_err(|e| Error::io(file, e))?,
    };
    let digest = hash::sha256(&raw);

    let mut flags = 0u8;
    let mut body = if opts.compression == CompressionLevel::None {
        raw.clone()
    } else {
        flags |= FLAG_COMPRESSED;
        compression::compress(&raw, opts.compression).map_err(|e| Error::Compression {
            resource: path.clone(),
            reason: e.to_string(),
        })?
    };

    if let Some(cipher) = opts.cipher {
        body = cipher.encrypt(&path, &digest, &body)?;
        flags |= FLAG_ENCRYPTED;
    }

    debug!(
        "prepared {} ({}, {} -> {} bytes)",
        path,
        resource_type,
        raw.len(),
        body.len()
    );

    Ok(PreparedResource {
        entry: ResourceEntry {
            path,
            resource_type,
            flags,
            raw_len: raw.len() as u64,
            stored_len: body.len() as u64,
            crc32: hash::crc32(&body),
            digest,
            offset: 0,
        },
        body,
    })
}

/// Prepare every input on the worker pool, preserving input order
pub fn prepare_all(
    inputs: &[ResourceInput],
    opts: &PackOptions<'_>,
    progress: &dyn ProgressTracker,
) -> Result<Vec<PreparedResource>> {
    let prepared: Vec<PreparedResource> = inputs
        .par_iter()
        .map(|input| {
            let result = prepare_resource(input, opts);
            progress.increment(1);
            result
        })
        .collect::<Result<_>>()?;

    let mut seen = HashSet::with_capacity(prepared.len());
    for p in &prepared {
        if !seen.insert(p.entry.path.as_str()) {
            return Err(Error::DuplicateResource(p.entry.path.clone()));
        }
    }

    Ok(prepared)
}

/// Assign body offsets and serialize header plus table
fn encode_preamble(resources: &mut [PreparedResource]) -> Result<Vec<u8>> {
    let count = u32::try_from(resources.len())
        .map_err(|_| Error::Config(format!("too many resources: {}", resources.len())))?;

    let table_len: usize = resources.iter().map(|r| r.entry.encoded_len()).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + table_len);
    out.extend_from_slice(&PackHeader::new(count).encode());

    let mut offset = 0u64;
    for r in resources.iter_mut() {
        r.entry.offset = offset;
        offset += r.entry.stored_len;
        r.entry.encode_into(&mut out).map_err(Error::Config)?;
    }
    Ok(out)
}

/// Write prepared resources to `output` atomically
pub fn write_prepared(output: &Path, mut resources: Vec<PreparedResource>) -> Result<PackSummary> {
    let preamble = encode_preamble(&mut resources)?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    let temp_path = temp.path().to_path_buf();
    let mut writer = BufWriter::new(temp);
    let mut hasher = PackHasher::new();

    let mut emit = |bytes: &[u8]| -> Result<()> {
        hasher.update(bytes);
        writer.write_all(bytes).map_err(|e| Error::io(&temp_path, e))
    };

    emit(&preamble)?;
    let mut raw_bytes = 0u64;
    let mut stored_bytes = 0u64;
    for r in &resources {
        emit(&r.body)?;
        raw_bytes += r.entry.raw_len;
        stored_bytes += r.entry.stored_len;
    }

    let pre_footer_len = hasher.len();
    let (crc, digest) = hasher.finalize();
    writer
        .write_all(&PackFooter::new(crc, &digest).encode())
        .map_err(|e| Error::io(&temp_path, e))?;

    let temp = writer
        .into_inner()
        .map_err(|e| Error::io(&temp_path, e.into_error()))?;
    temp.as_file().sync_all().map_err(|e| Error::io(&temp_path, e))?;
    temp.persist(output).map_err(|e| Error::io(output, e.error))?;

    let summary = PackSummary {
        path: output.to_path_buf(),
        resource_count: resources.len(),
        raw_bytes,
        stored_bytes,
        pack_size: pre_footer_len + FOOTER_LEN as u64,
        digest,
    };
    info!(
        "Wrote pack {} ({} resources, {} bytes, sha256 {})",
        output.display(),
        summary.resource_count,
        summary.pack_size,
        hash::to_hex(&summary.digest)
    );
    Ok(summary)
}

/// Prepare and write a pack in one call
pub fn write_pack(
    output: &Path,
    inputs: &[ResourceInput],
    opts: &PackOptions<'_>,
    progress: &dyn ProgressTracker,
) -> Result<PackSummary> {
    progress.set_length(inputs.len() as u64);
    let prepared = prepare_all(inputs, opts, progress)?;
    write_prepared(output, prepared)
}

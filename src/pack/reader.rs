// src/pack/reader.rs
//! Pack reader for inspection, verification and extraction
//!
//! Opening a pack validates both anchors (header and footer), parses the
//! whole resource table and checks that every body lies inside the body
//! region. Any failure is a [`Error::CorruptPack`] and nothing is returned;
//! there is no partially loaded state.
//!
//! Bodies are read on demand. [`PackReader::read`] undoes encryption and
//! compression and checks both the stored CRC32 and the raw SHA-256.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::compression;
use crate::crypto::ResourceCipher;
use crate::error::{Error, Result};
use crate::filesystem::path::{normalize_vfs_path, resolve_virtual_path, sanitize_output_path};
use crate::filesystem::write_atomic;
use crate::hash::{self, Digest, PackHasher};
use crate::pack::format::{
    ByteCursor, ENTRY_FIXED_LEN, ENTRY_PREFIX_LEN, FOOTER_LEN, HEADER_LEN, PackFooter, PackHeader,
    ResourceEntry,
};

/// Result of a full verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Resources whose raw content was fully checked
    pub verified: usize,
    /// Encrypted resources only CRC-checked because no key was supplied
    pub skipped_encrypted: usize,
}

/// An opened, structurally valid pack
#[derive(Debug)]
pub struct PackReader {
    path: PathBuf,
    file: File,
    header: PackHeader,
    footer: PackFooter,
    entries: Vec<ResourceEntry>,
    index: HashMap<String, usize>,
    body_start: u64,
    file_len: u64,
}

fn read_at<const N: usize>(file: &mut File, pos: SeekFrom, path: &Path) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    file.seek(pos).map_err(|e| Error::io(path, e))?;
    file.read_exact(&mut buf).map_err(|e| Error::io(path, e))?;
    Ok(buf)
}

/// Read and validate only the two anchors
fn read_anchors(file: &mut File, path: &Path) -> Result<(PackHeader, PackFooter, u64)> {
    let file_len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    if file_len < (HEADER_LEN + FOOTER_LEN) as u64 {
        return Err(Error::corrupt(path, format!("file too small ({file_len} bytes)")));
    }

    let header_bytes = read_at::<HEADER_LEN>(file, SeekFrom::Start(0), path)?;
    let header = PackHeader::decode(&header_bytes).map_err(|r| Error::corrupt(path, r))?;

    let footer_bytes = read_at::<FOOTER_LEN>(file, SeekFrom::End(-(FOOTER_LEN as i64)), path)?;
    let footer = PackFooter::decode(&footer_bytes).map_err(|r| Error::corrupt(path, r))?;

    Ok((header, footer, file_len))
}

fn fill(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::corrupt(path, "truncated resource table"),
        _ => Error::io(path, e),
    })
}

/// Read one table entry without reading past it
fn read_entry(reader: &mut impl Read, path: &Path) -> Result<(ResourceEntry, u64)> {
    let mut buf = vec![0u8; ENTRY_PREFIX_LEN];
    fill(reader, &mut buf, path)?;
    let path_len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    buf.resize(ENTRY_FIXED_LEN + path_len, 0);
    fill(reader, &mut buf[ENTRY_PREFIX_LEN..], path)?;

    let entry =
        ResourceEntry::decode(&mut ByteCursor::new(&buf)).map_err(|r| Error::corrupt(path, r))?;
    Ok((entry, buf.len() as u64))
}

/// Decode `count` table entries from the start of `reader`
///
/// Only the table itself is consumed; bodies stay on disk. Returns the
/// entries and the encoded table length.
fn read_table(
    reader: &mut impl Read,
    count: usize,
    region_len: u64,
    path: &Path,
) -> Result<(Vec<ResourceEntry>, u64)> {
    let min_entry = ENTRY_FIXED_LEN as u64;
    if count as u64 > region_len / min_entry {
        return Err(Error::corrupt(
            path,
            format!("resource count {count} does not fit in {region_len} bytes"),
        ));
    }

    let mut entries = Vec::with_capacity(count);
    let mut table_len = 0u64;
    for i in 0..count {
        let (entry, len) = read_entry(reader, path).map_err(|e| match e {
            Error::CorruptPack { reason, .. } => {
                Error::corrupt(path, format!("entry {i} of {count}: {reason}"))
            }
            other => other,
        })?;
        table_len += len;
        entries.push(entry);
    }
    Ok((entries, table_len))
}

impl PackReader {
    /// Cheap structural check: header magic/version and footer magic only
    pub fn probe(path: &Path) -> Result<PackHeader> {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        let (header, _, _) = read_anchors(&mut file, path)?;
        Ok(header)
    }

    /// Open a pack and parse its resource table
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        let (header, footer, file_len) = read_anchors(&mut file, path)?;

        let content_end = file_len - FOOTER_LEN as u64;
        let region_len = content_end - HEADER_LEN as u64;
        file.seek(SeekFrom::Start(HEADER_LEN as u64))
            .map_err(|e| Error::io(path, e))?;

        // The table cannot extend past the region between the anchors
        let count = header.resource_count as usize;
        let (entries, table_len) = {
            let mut table = BufReader::new((&mut file).take(region_len));
            read_table(&mut table, count, region_len, path)?
        };

        let body_start = HEADER_LEN as u64 + table_len;
        let body_len = content_end - body_start;

        let mut index = HashMap::with_capacity(entries.len());
        let mut expected_offset = 0u64;
        for (i, e) in entries.iter().enumerate() {
            resolve_virtual_path(&e.path)
                .map_err(|_| Error::corrupt(path, format!("unsafe resource path '{}'", e.path)))?;
            if e.offset != expected_offset {
                return Err(Error::corrupt(
                    path,
                    format!("body of '{}' is not contiguous", e.path),
                ));
            }
            expected_offset = e
                .offset
                .checked_add(e.stored_len)
                .filter(|end| *end <= body_len)
                .ok_or_else(|| {
                    Error::corrupt(path, format!("body of '{}' lies outside the pack", e.path))
                })?;
            if index.insert(e.path.clone(), i).is_some() {
                return Err(Error::corrupt(path, format!("duplicate resource '{}'", e.path)));
            }
        }

        if expected_offset != body_len {
            return Err(Error::corrupt(
                path,
                format!(
                    "resource count {count} does not match table: {} unaccounted bytes",
                    body_len - expected_offset
                ),
            ));
        }

        debug!(
            "Opened pack {} (v{}.{}, {} resources)",
            path.display(),
            header.version_major,
            header.version_minor,
            entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            footer,
            entries,
            index,
            body_start,
            file_len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PackHeader {
        &self.header
    }

    /// Resource table in pack order
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Absolute file offset of the first body byte
    pub fn body_start(&self) -> u64 {
        self.body_start
    }

    /// Look up an entry by virtual path (normalized before lookup)
    pub fn find(&self, vpath: &str) -> Option<&ResourceEntry> {
        let key = normalize_vfs_path(vpath);
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    /// Read a body exactly as stored
    pub fn read_stored(&mut self, entry: &ResourceEntry) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; entry.stored_len as usize];
        self.file
            .seek(SeekFrom::Start(self.body_start + entry.offset))
            .map_err(|e| Error::io(&self.path, e))?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(buf)
    }

    /// Read, decrypt, decompress and verify one resource
    pub fn read(
        &mut self,
        entry: &ResourceEntry,
        cipher: Option<&ResourceCipher>,
    ) -> Result<Vec<u8>> {
        let stored = self.read_stored(entry)?;
        hash::verify_crc32(&entry.path, &stored, entry.crc32)?;

        let body = if entry.is_encrypted() {
            let cipher = cipher.ok_or_else(|| Error::Encryption {
                resource: entry.path.clone(),
                reason: "resource is encrypted and no key was supplied".to_string(),
            })?;
            cipher.decrypt(&entry.path, &entry.digest, &stored)?
        } else {
            stored
        };

        let raw = if entry.is_compressed() {
            compression::decompress(&body, entry.raw_len).map_err(|e| Error::Compression {
                resource: entry.path.clone(),
                reason: e.to_string(),
            })?
        } else {
            body
        };

        if raw.len() as u64 != entry.raw_len {
            return Err(Error::corrupt(
                &self.path,
                format!("raw size mismatch for '{}'", entry.path),
            ));
        }
        hash::verify_sha256(&entry.path, &raw, &entry.digest)?;
        Ok(raw)
    }

    /// Read a resource by virtual path
    pub fn read_path(&mut self, vpath: &str, cipher: Option<&ResourceCipher>) -> Result<Vec<u8>> {
        let entry = self
            .find(vpath)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(vpath.to_string()))?;
        self.read(&entry, cipher)
    }

    /// Recompute the whole-pack digest and compare it to the footer
    pub fn pack_digest(&mut self) -> Result<Digest> {
        let content_len = self.file_len - FOOTER_LEN as u64;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(&self.path, e))?;

        let mut reader = BufReader::new((&mut self.file).take(content_len));
        let mut hasher = PackHasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf).map_err(|e| Error::io(&self.path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let (crc, digest) = hasher.finalize();
        if !self.footer.matches(crc, &digest) {
            return Err(Error::corrupt(&self.path, "whole-pack digest mismatch"));
        }
        Ok(digest)
    }

    /// Verify the footer digest and every resource
    ///
    /// Without a cipher, encrypted resources are only CRC-checked.
    pub fn verify(&mut self, cipher: Option<&ResourceCipher>) -> Result<VerifyReport> {
        self.pack_digest()?;

        let mut report = VerifyReport::default();
        let entries = self.entries.clone();
        for entry in &entries {
            if entry.is_encrypted() && cipher.is_none() {
                let stored = self.read_stored(entry)?;
                hash::verify_crc32(&entry.path, &stored, entry.crc32)?;
                report.skipped_encrypted += 1;
            } else {
                self.read(entry, cipher)?;
                report.verified += 1;
            }
        }

        if report.skipped_encrypted > 0 {
            warn!(
                "{} encrypted resources in {} were only CRC-checked (no key supplied)",
                report.skipped_encrypted,
                self.path.display()
            );
        }
        Ok(report)
    }

    /// Extract resources under `dest`, optionally filtered by substring
    ///
    /// Every table path is re-sanitized against `dest` before anything is
    /// written. Returns the number of files written.
    pub fn extract(
        &mut self,
        dest: &Path,
        filter: &[String],
        cipher: Option<&ResourceCipher>,
    ) -> Result<usize> {
        fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

        let entries = self.entries.clone();
        let mut written = 0;
        for entry in &entries {
            if !filter.is_empty() && !filter.iter().any(|f| entry.path.contains(f.as_str())) {
                continue;
            }

            let target = sanitize_output_path(dest, &entry.path)?;
            let raw = self.read(entry, cipher)?;
            write_atomic(&target, &raw)?;
            written += 1;
        }

        info!("Extracted {} resources to {}", written, dest.display());
        Ok(written)
    }
}

// src/filesystem/mod.rs

//! Filesystem helpers for the build pipeline
//!
//! - [`path`]: virtual path normalization and traversal-safe resolution
//! - [`write_atomic`]: write-then-rename so readers never observe partial files

pub mod path;

use crate::error::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Write `data` to `path` atomically
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `path`. Parent directories are created as needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    temp.write_all(data).map_err(|e| Error::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| Error::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

// src/filesystem/path.rs

//! Path normalization and sanitization for security
//!
//! Resource paths come from project directories and, on extraction, from pack
//! tables that may be untrusted. Every path that ends up on disk goes through
//! [`sanitize_output_path`], which resolves the path component by component
//! against its base directory and refuses anything that would escape it.
//!
//! Traversal detection works on logical components, not substrings, so mixed
//! separators (`..\\..\\evil`) and `..` buried mid-path
//! (`assets/../../../evil`) are caught the same way as a leading `../`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// One logical component of a relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Leading separator or drive prefix: the path is absolute
    Root,
    /// `.`
    Current,
    /// `..`
    Parent,
    Named(&'a str),
}

/// Split a path with either separator style into logical segments
fn segments(path: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();

    if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        out.push(Segment::Root);
    }

    for part in path.split(|c| c == '/' || c == '\\') {
        match part {
            "" => {}
            "." => out.push(Segment::Current),
            ".." => out.push(Segment::Parent),
            name => out.push(Segment::Named(name)),
        }
    }
    out
}

/// `C:` style prefixes would re-root the path on Windows
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Resolve segments against an initially empty stack of directory levels
///
/// Returns the surviving named components, or `None` if the path is rooted
/// or a `..` would pop past the base.
fn resolve<'a>(segments: &[Segment<'a>]) -> Option<Vec<&'a str>> {
    let mut stack: Vec<&'a str> = Vec::with_capacity(segments.len());
    for seg in segments.iter().copied() {
        match seg {
            Segment::Root => return None,
            Segment::Current => {}
            Segment::Parent => {
                stack.pop()?;
            }
            Segment::Named(name) => stack.push(name),
        }
    }
    Some(stack)
}

/// Normalize a virtual path for use as a pack key
///
/// Backslashes become forward slashes, the path is lowercased, and leading
/// and trailing slashes are stripped. An empty input stays empty.
///
/// # Examples
///
/// ```
/// use nmpack::filesystem::path::normalize_vfs_path;
///
/// assert_eq!(normalize_vfs_path("assets\\images\\bg.png"), "assets/images/bg.png");
/// assert_eq!(normalize_vfs_path("Assets/Images/BG.PNG"), "assets/images/bg.png");
/// assert_eq!(normalize_vfs_path("/assets/folder/"), "assets/folder");
/// ```
pub fn normalize_vfs_path(path: &str) -> String {
    path.replace('\\', "/")
        .to_lowercase()
        .trim_matches('/')
        .to_string()
}

/// Resolve `relative` under `base`, rejecting any path traversal
///
/// The result is always `base` (made absolute) joined with the resolved
/// components, and is checked to still have `base` as a structural prefix.
/// An empty relative path resolves to `base` itself.
///
/// # Examples
///
/// ```
/// use nmpack::filesystem::path::sanitize_output_path;
/// use std::path::Path;
///
/// let base = Path::new("/srv/build/output");
/// assert!(sanitize_output_path(base, "assets/images/bg.png").is_ok());
/// assert!(sanitize_output_path(base, "../evil.txt").is_err());
/// assert!(sanitize_output_path(base, "..\\..\\evil.txt").is_err());
/// ```
pub fn sanitize_output_path(base: impl AsRef<Path>, relative: &str) -> Result<PathBuf> {
    let base = base.as_ref();
    let traversal = || Error::PathTraversal {
        base: base.to_path_buf(),
        path: relative.to_string(),
    };

    let parts = resolve(&segments(relative)).ok_or_else(traversal)?;

    let root = std::path::absolute(base).map_err(|e| Error::io(base, e))?;
    let mut resolved = root.clone();
    for part in &parts {
        resolved.push(part);
    }

    if !resolved.starts_with(&root) {
        return Err(traversal());
    }

    Ok(resolved)
}

/// Check that a virtual path stays inside its root, returning the cleaned form
///
/// `.` segments are dropped and `..` segments are resolved; the output uses
/// forward slashes. Used to validate table paths before they are trusted.
pub fn resolve_virtual_path(path: &str) -> Result<String> {
    let parts = resolve(&segments(path)).ok_or_else(|| Error::PathTraversal {
        base: PathBuf::from("/"),
        path: path.to_string(),
    })?;
    Ok(parts.join("/"))
}

/// Sanitize a single file name (no directory components)
///
/// Used for names taken from configuration, such as the pack name.
///
/// # Examples
///
/// ```
/// use nmpack::filesystem::path::sanitize_filename;
///
/// assert_eq!(sanitize_filename("data").unwrap(), "data");
/// assert!(sanitize_filename("../data").is_err());
/// assert!(sanitize_filename("sub/data").is_err());
/// ```
pub fn sanitize_filename(name: &str) -> Result<String> {
    if name.contains('/') || name.contains('\\') || name == ".." || name == "." {
        return Err(Error::PathTraversal {
            base: PathBuf::from("."),
            path: name.to_string(),
        });
    }

    if name.is_empty() {
        return Err(Error::Config("empty file name".to_string()));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_traversal(result: Result<PathBuf>) -> bool {
        matches!(result, Err(Error::PathTraversal { .. }))
    }

    #[test]
    fn test_normalize_vfs_path() {
        assert_eq!(normalize_vfs_path("assets\\images\\bg.png"), "assets/images/bg.png");
        assert_eq!(normalize_vfs_path("Assets/Images/BG.PNG"), "assets/images/bg.png");
        assert_eq!(normalize_vfs_path("/assets/image.png"), "assets/image.png");
        assert_eq!(normalize_vfs_path("assets/folder/"), "assets/folder");
        assert_eq!(normalize_vfs_path(""), "");
        assert_eq!(normalize_vfs_path("///"), "");
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("a/./b\\..\\c"),
            vec![
                Segment::Named("a"),
                Segment::Current,
                Segment::Named("b"),
                Segment::Parent,
                Segment::Named("c"),
            ]
        );
        assert_eq!(segments("/etc")[0], Segment::Root);
        assert_eq!(segments("C:\\Windows")[0], Segment::Root);
        assert!(segments("").is_empty());
    }

    #[test]
    fn test_rejects_simple_parent() {
        assert!(is_traversal(sanitize_output_path("/tmp/out", "../evil.txt")));
    }

    #[test]
    fn test_rejects_deep_parent() {
        assert!(is_traversal(sanitize_output_path(
            "/tmp/out",
            "../../../../../../etc/passwd"
        )));
    }

    #[test]
    fn test_rejects_parent_mid_path() {
        assert!(is_traversal(sanitize_output_path("/tmp/out", "assets/../../../evil.exe")));
        assert!(is_traversal(sanitize_output_path("/tmp/out", "foo/../bar/../../../baz.dll")));
    }

    #[test]
    fn test_rejects_backslash_parent() {
        assert!(is_traversal(sanitize_output_path("/tmp/out", "..\\..\\evil.txt")));
        assert!(is_traversal(sanitize_output_path("/tmp/out", "assets\\..\\..\\evil.txt")));
    }

    #[test]
    fn test_rejects_absolute() {
        assert!(is_traversal(sanitize_output_path("/tmp/out", "/etc/passwd")));
        assert!(is_traversal(sanitize_output_path("/tmp/out", "\\evil.txt")));
        assert!(is_traversal(sanitize_output_path("/tmp/out", "C:\\evil.txt")));
    }

    #[test]
    fn test_accepts_valid_paths() {
        let base = Path::new("/tmp/out");
        for rel in [
            "assets/images/bg.png",
            "deep/nested/structure/file.dat",
            "version.1.2.3.txt",
            "file.txt",
            "assets\\images\\bg.png",
        ] {
            let resolved = sanitize_output_path(base, rel).unwrap();
            assert!(resolved.starts_with(base), "{rel}");
        }
    }

    #[test]
    fn test_inner_parent_stays_inside() {
        let resolved = sanitize_output_path("/tmp/out", "a/b/../c.png").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/out/a/c.png"));

        let resolved = sanitize_output_path("/tmp/out", "./x/./y").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/out/x/y"));
    }

    #[test]
    fn test_empty_resolves_to_base() {
        let resolved = sanitize_output_path("/tmp/out", "").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_encoded_dots_are_literal_names() {
        let resolved = sanitize_output_path("/tmp/out", "%2e%2e/evil.txt").unwrap();
        assert!(resolved.starts_with("/tmp/out"));
    }

    #[test]
    fn test_resolve_virtual_path() {
        assert_eq!(resolve_virtual_path("a/./b/../c").unwrap(), "a/c");
        assert_eq!(resolve_virtual_path("").unwrap(), "");
        assert!(resolve_virtual_path("../x").is_err());
        assert!(resolve_virtual_path("/x").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("data").unwrap(), "data");
        assert_eq!(sanitize_filename("game-1.0").unwrap(), "game-1.0");
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename(".").is_err());
        assert!(sanitize_filename("a/b").is_err());
        assert!(sanitize_filename("a\\b").is_err());
        assert!(sanitize_filename("").is_err());
    }
}

// src/build/validate.rs

//! Preflight project structure checks
//!
//! Only the directory layout is checked here; the contents of
//! `project.json` are owned by the editor.

use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Project descriptor expected at the project root
pub const PROJECT_FILE: &str = "project.json";

/// Directories every project must have
pub const REQUIRED_DIRS: [&str; 2] = ["scripts", "assets"];

/// Check a project root and return every problem found
///
/// An empty list means the project is buildable. Findings are never
/// returned as `Err`; a missing project root, or one that is not a
/// directory, is reported alone since nothing else can be checked.
pub fn validate_project(project: &Path) -> Result<Vec<String>> {
    let mut errors = Vec::new();

    if !project.exists() {
        errors.push(format!(
            "Project path does not exist: {}",
            project.display()
        ));
        return Ok(errors);
    }
    if !project.is_dir() {
        errors.push(format!(
            "Project path is not a directory: {}",
            project.display()
        ));
        return Ok(errors);
    }

    if !project.join(PROJECT_FILE).is_file() {
        errors.push(format!("Missing {PROJECT_FILE} in {}", project.display()));
    }

    for dir in REQUIRED_DIRS {
        if !project.join(dir).is_dir() {
            errors.push(format!("Missing required directory: {dir}"));
        }
    }

    debug!(
        "Validated project {} ({} problems)",
        project.display(),
        errors.len()
    );
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_project() {
        let dir = TempDir::new().unwrap();
        let errors = validate_project(&dir.path().join("nope")).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("does not exist"));
    }

    #[test]
    fn test_project_path_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("project.zip");
        fs::write(&file, "zip").unwrap();

        let errors = validate_project(&file).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is not a directory"));
        assert!(!errors[0].contains("does not exist"));
    }

    #[test]
    fn test_missing_everything() {
        let dir = TempDir::new().unwrap();
        let errors = validate_project(dir.path()).unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("project.json"));
        assert!(errors.iter().any(|e| e.contains("scripts")));
        assert!(errors.iter().any(|e| e.contains("assets")));
    }

    #[test]
    fn test_valid_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("project.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();

        assert!(validate_project(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_file_in_place_of_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("project.json"), "{}").unwrap();
        fs::write(dir.path().join("scripts"), "not a dir").unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();

        let errors = validate_project(dir.path()).unwrap();
        assert_eq!(errors, vec!["Missing required directory: scripts".to_string()]);
    }
}

// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use nmpack::{BuildConfig, BuildSystem};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixed timestamp used by deterministic builds in tests (2024-01-01)
pub const TEST_TIMESTAMP: u64 = 1704067200;

/// Create a small but complete project under `root`.
///
/// Layout:
/// - project.json
/// - scripts/main.nms, scripts/chapter1.nms
/// - assets/bg/forest.png, assets/music/theme.ogg, assets/data/chars.json
pub fn create_project(root: &Path) -> PathBuf {
    let project = root.join("game");
    fs::create_dir_all(project.join("scripts")).unwrap();
    fs::create_dir_all(project.join("assets/bg")).unwrap();
    fs::create_dir_all(project.join("assets/music")).unwrap();
    fs::create_dir_all(project.join("assets/data")).unwrap();

    fs::write(project.join("project.json"), r#"{"name":"demo"}"#).unwrap();
    fs::write(
        project.join("scripts/main.nms"),
        "scene main {\n  show background \"forest\"\n  say alice \"Hello\"\n}\n".repeat(10),
    )
    .unwrap();
    fs::write(project.join("scripts/chapter1.nms"), "scene chapter1 {}\n").unwrap();
    fs::write(project.join("assets/bg/forest.png"), (0u8..=255).collect::<Vec<_>>()).unwrap();
    fs::write(project.join("assets/music/theme.ogg"), vec![0x4fu8; 4096]).unwrap();
    fs::write(
        project.join("assets/data/chars.json"),
        r#"{"alice":{"color":"blue"}}"#,
    )
    .unwrap();
    project
}

/// Config for a deterministic build of `project` into `output`
pub fn deterministic_config(project: &Path, output: &Path) -> BuildConfig {
    BuildConfig::new()
        .with_paths(project, output)
        .with_fixed_timestamp(TEST_TIMESTAMP)
}

/// Temp dir with a project and a configured build system
pub fn setup_build() -> (TempDir, BuildSystem) {
    let temp_dir = TempDir::new().unwrap();
    let project = create_project(temp_dir.path());
    let mut system = BuildSystem::new();
    system.configure(deterministic_config(&project, &temp_dir.path().join("out")));
    (temp_dir, system)
}

// tests/build_system.rs

//! Integration tests for the build orchestrator and its helpers.

mod common;

use common::{TEST_TIMESTAMP, create_project, deterministic_config, setup_build};
use nmpack::build::utils::{executable_extension, format_file_size, platform_name};
use nmpack::build::{BuildManifest, verify_pack_signature};
use nmpack::compression::{CompressionLevel, compress, decompress};
use nmpack::crypto::{self, SigningKeyPair};
use nmpack::filesystem::path::{normalize_vfs_path, sanitize_output_path};
use nmpack::hash::{crc32, sha256};
use nmpack::{BuildConfig, BuildPlatform, BuildSystem, ErrorKind, ResourceType, classify};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_crc32_properties() {
    assert_eq!(crc32(&[]), 0);
    assert_ne!(crc32(&[0x42]), 0);
    assert_eq!(crc32(b"Hello, World!"), crc32(b"Hello, World!"));
    assert_ne!(crc32(b"Hello"), crc32(b"World"));
}

#[test]
fn test_sha256_properties() {
    assert_eq!(sha256(b"Test data").len(), 32);
    assert_eq!(sha256(b"Test data"), sha256(b"Test data"));
    assert_ne!(sha256(b"Input1"), sha256(b"Input2"));
}

#[test]
fn test_vfs_path_normalization() {
    assert_eq!(normalize_vfs_path("assets\\images\\bg.png"), "assets/images/bg.png");
    assert_eq!(normalize_vfs_path("Assets/Images/BG.PNG"), "assets/images/bg.png");
    assert_eq!(normalize_vfs_path("/assets/image.png"), "assets/image.png");
    assert_eq!(normalize_vfs_path("assets/folder/"), "assets/folder");
    assert_eq!(normalize_vfs_path(""), "");
}

#[test]
fn test_resource_type_detection() {
    for name in ["test.png", "test.jpg", "test.jpeg", "test.bmp", "test.webp"] {
        assert_eq!(classify(name), ResourceType::Texture, "{name}");
    }
    assert_eq!(classify("test.wav"), ResourceType::Audio);
    assert_eq!(classify("test.flac"), ResourceType::Audio);
    assert_eq!(classify("test.ogg"), ResourceType::Music);
    assert_eq!(classify("test.mp3"), ResourceType::Music);
    assert_eq!(classify("test.ttf"), ResourceType::Font);
    assert_eq!(classify("test.otf"), ResourceType::Font);
    assert_eq!(classify("test.nms"), ResourceType::Script);
    assert_eq!(classify("test.nmscript"), ResourceType::Script);
    assert_eq!(classify("test.json"), ResourceType::Data);
    assert_eq!(classify("test.xml"), ResourceType::Data);
    assert_eq!(classify("test.PNG"), ResourceType::Texture);
    assert_eq!(classify("test.OGG"), ResourceType::Music);
    assert_eq!(classify("readme"), ResourceType::Other);
}

#[test]
fn test_build_config_defaults() {
    let config = BuildConfig::default();
    assert_eq!(config.version, "1.0.0");
    assert_eq!(config.build_number, 1);
    assert_eq!(config.platform, BuildPlatform::Windows);
    assert!(config.pack_assets);
    assert!(!config.encrypt_assets);
    assert_eq!(config.compression, CompressionLevel::Balanced);
    assert!(config.deterministic_build);
    assert_eq!(config.fixed_build_timestamp, 0);
    assert!(!config.sign_packs);
}

#[test]
fn test_build_timestamp() {
    let mut system = BuildSystem::new();
    system.configure(BuildConfig::new().with_fixed_timestamp(TEST_TIMESTAMP));
    assert_eq!(system.get_build_timestamp(), TEST_TIMESTAMP);
    assert_eq!(system.get_build_timestamp(), system.get_build_timestamp());

    // Reconfiguring takes effect immediately
    system.configure(BuildConfig::new().with_fixed_timestamp(1234567890));
    assert_eq!(system.get_build_timestamp(), 1234567890);

    system.configure(BuildConfig::new());
    let now = chrono::Utc::now().timestamp() as u64;
    let ts = system.get_build_timestamp();
    assert!(ts >= now - 5);
    assert!(ts <= now + 5);
}

#[test]
fn test_encryption_key_loading() {
    let temp_dir = TempDir::new().unwrap();

    let good = temp_dir.path().join("test.key");
    fs::write(&good, [0xABu8; 32]).unwrap();
    let key = crypto::load_key(&good).unwrap();
    assert_eq!(key.as_bytes().len(), 32);
    assert_eq!(key.as_bytes()[0], 0xAB);

    let short = temp_dir.path().join("short.key");
    fs::write(&short, [0xABu8; 16]).unwrap();
    assert_eq!(crypto::load_key(&short).unwrap_err().kind(), ErrorKind::InvalidKey);

    let missing = temp_dir.path().join("missing.key");
    assert_eq!(crypto::load_key(&missing).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_compression() {
    let data = b"Test data for compression".to_vec();
    assert_eq!(compress(&data, CompressionLevel::None).unwrap(), data);

    let big = data.repeat(100);
    let packed = compress(&big, CompressionLevel::Balanced).unwrap();
    assert!(packed.len() < big.len());
    assert_eq!(decompress(&packed, big.len() as u64).unwrap(), big);
}

#[test]
fn test_build_utils() {
    assert_eq!(platform_name(BuildPlatform::Windows), "Windows");
    assert_eq!(platform_name(BuildPlatform::MacOS), "macOS");
    assert_eq!(platform_name(BuildPlatform::IOS), "iOS");
    assert_eq!(executable_extension(BuildPlatform::Windows), ".exe");
    assert_eq!(executable_extension(BuildPlatform::Linux), "");
    assert_eq!(format_file_size(0), "0 B");
    assert_eq!(format_file_size(512), "512 B");
    assert_eq!(format_file_size(1024), "1.00 KB");
    assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
    assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
}

#[test]
fn test_validate_project() {
    let temp_dir = TempDir::new().unwrap();
    let system = BuildSystem::new();

    let errors = system
        .validate_project(&temp_dir.path().join("nonexistent"))
        .unwrap();
    assert!(!errors.is_empty());
    assert!(errors[0].contains("does not exist"));

    let project = temp_dir.path().join("partial");
    fs::create_dir_all(&project).unwrap();
    let errors = system.validate_project(&project).unwrap();
    assert!(errors.iter().any(|e| e.contains("project.json")));
    assert!(errors.iter().any(|e| e.contains("scripts")));
    assert!(errors.iter().any(|e| e.contains("assets")));

    let project = create_project(temp_dir.path());
    assert!(system.validate_project(&project).unwrap().is_empty());
}

#[test]
fn test_path_traversal_protection() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    for bad in [
        "../etc/passwd",
        "../../../../../../etc/passwd",
        "assets/../../etc/passwd",
        "a/../b/../../c",
        "..\\..\\windows\\system32",
    ] {
        let err = sanitize_output_path(base, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal, "{bad}");
        assert!(err.to_string().contains("Path traversal detected"), "{bad}");
    }

    for good in [
        "assets/image.png",
        "assets/images/backgrounds/bg.png",
        "file.txt",
        "file.name.with.dots.txt",
        "",
    ] {
        let resolved = sanitize_output_path(base, good).unwrap();
        assert!(resolved.starts_with(std::path::absolute(base).unwrap()), "{good}");
    }
}

#[test]
fn test_build_rejects_traversal_resource() {
    let temp_dir = TempDir::new().unwrap();
    let mut system = BuildSystem::new();
    system.configure(BuildConfig::new().with_paths(temp_dir.path(), temp_dir.path().join("out")));

    let pack = temp_dir.path().join("out/data.nmres");
    let inputs = [
        nmpack::ResourceInput::from_bytes("assets/ok.png", b"ok".to_vec()),
        nmpack::ResourceInput::from_bytes("assets/../../escape.png", b"bad".to_vec()),
    ];
    let err = system.build_pack(&pack, &inputs, false, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathTraversal);
    assert!(!pack.exists());
}

#[test]
fn test_full_build_with_signing() {
    let temp_dir = TempDir::new().unwrap();
    let project = create_project(temp_dir.path());
    let key_path = temp_dir.path().join("release.key");
    let pub_path = temp_dir.path().join("release.pub");
    SigningKeyPair::generate()
        .with_key_id("release")
        .save_to_files(&key_path, &pub_path)
        .unwrap();

    let mut system = BuildSystem::new();
    system.configure(
        deterministic_config(&project, &temp_dir.path().join("out")).with_signing_key(&key_path),
    );
    let report = system.build().unwrap();
    assert_eq!(report.resource_count, 5);

    let manifest = BuildManifest::read(report.manifest.as_ref().unwrap()).unwrap();
    assert!(manifest.signed);
    assert_eq!(manifest.build_time, "2024-01-01T00:00:00+00:00");

    let signature = verify_pack_signature(&report.output, None).unwrap();
    assert_eq!(signature.timestamp.as_deref(), Some("2024-01-01T00:00:00+00:00"));

    // Any change to the pack invalidates the signature
    let mut bytes = fs::read(&report.output).unwrap();
    let len = bytes.len();
    bytes[len - 40] ^= 0xff;
    fs::write(&report.output, &bytes).unwrap();
    assert!(verify_pack_signature(&report.output, None).is_err());
}

#[test]
fn test_build_report_totals() {
    let (temp_dir, system) = setup_build();
    let report = system.build().unwrap();

    assert!(report.packed);
    assert_eq!(report.timestamp, TEST_TIMESTAMP);
    let source_bytes: u64 = walkdir::WalkDir::new(temp_dir.path().join("game"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() != "project.json")
        .map(|e| e.metadata().unwrap().len())
        .sum();
    assert_eq!(report.raw_bytes, source_bytes);
    assert!(report.stored_bytes < report.raw_bytes);
    assert!(report.signature.is_none());
}

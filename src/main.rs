// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nmpack::build::{self, utils::format_file_size};
use nmpack::crypto::{self, ResourceCipher, SigningKeyPair};
use nmpack::{BuildConfig, BuildPlatform, BuildSystem, BuildType, CompressionLevel, PackReader};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "nmpack")]
#[command(author, version, about = "Build, inspect and verify NovelMind resource packs", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project into a resource pack
    Build {
        /// Build configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Project root (overrides the config file)
        #[arg(short, long)]
        project: Option<PathBuf>,
        /// Output directory (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        platform: Option<BuildPlatform>,
        #[arg(long)]
        build_type: Option<BuildType>,
        /// none, fast, balanced or max
        #[arg(long)]
        compression: Option<CompressionLevel>,
        /// Encrypt resources with this 32-byte key file
        #[arg(long)]
        encrypt_key: Option<PathBuf>,
        /// Sign the pack with this Ed25519 key file
        #[arg(long)]
        sign_key: Option<PathBuf>,
        /// Fixed build timestamp (seconds since epoch)
        #[arg(long)]
        timestamp: Option<u64>,
        /// Stage loose files instead of writing a pack
        #[arg(long)]
        loose: bool,
    },
    /// Check a project's directory layout
    Validate {
        /// Project root
        #[arg(default_value = ".")]
        project: PathBuf,
    },
    /// List the resources in a pack
    List {
        pack: PathBuf,
    },
    /// Verify pack integrity and, if present, its signature
    Verify {
        pack: PathBuf,
        /// Key file for encrypted resources
        #[arg(long)]
        key: Option<PathBuf>,
        /// Public key file the signature must match
        #[arg(long)]
        trusted_key: Option<PathBuf>,
    },
    /// Extract resources from a pack
    Extract {
        pack: PathBuf,
        /// Destination directory
        dest: PathBuf,
        /// Key file for encrypted resources
        #[arg(long)]
        key: Option<PathBuf>,
        /// Only extract paths containing one of these substrings
        filter: Vec<String>,
    },
    /// Generate an encryption key or a signing key pair
    Keygen {
        /// Output path (signing: private key; public key gets a .pub suffix)
        path: PathBuf,
        /// Generate an Ed25519 signing key pair instead of an encryption key
        #[arg(long)]
        signing: bool,
        /// Key identifier recorded in signatures
        #[arg(long)]
        key_id: Option<String>,
    },
}

fn load_cipher(key: Option<&Path>) -> Result<Option<ResourceCipher>> {
    key.map(|path| {
        let key = crypto::load_key(path)
            .with_context(|| format!("Failed to load key {}", path.display()))?;
        Ok(ResourceCipher::new(&key))
    })
    .transpose()
}

#[allow(clippy::too_many_arguments)]
fn cmd_build(
    config_file: Option<PathBuf>,
    project: Option<PathBuf>,
    output: Option<PathBuf>,
    platform: Option<BuildPlatform>,
    build_type: Option<BuildType>,
    compression: Option<CompressionLevel>,
    encrypt_key: Option<PathBuf>,
    sign_key: Option<PathBuf>,
    timestamp: Option<u64>,
    loose: bool,
) -> Result<()> {
    let mut config = match &config_file {
        Some(path) => BuildConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BuildConfig::default(),
    };

    if let Some(p) = project {
        config.project_path = p;
    }
    if let Some(o) = output {
        config.output_path = o;
    }
    if let Some(p) = platform {
        config.platform = p;
    }
    if let Some(t) = build_type {
        config.build_type = t;
    }
    if let Some(c) = compression {
        config.compression = c;
    }
    if let Some(k) = encrypt_key {
        config = config.with_encryption_key(k);
    }
    if let Some(k) = sign_key {
        config = config.with_signing_key(k);
    }
    if let Some(ts) = timestamp {
        config = config.with_fixed_timestamp(ts);
    }
    if loose {
        config.pack_assets = false;
    }

    let mut system = BuildSystem::new();
    system.configure(config);
    let report = system.build().context("Build failed")?;

    println!("Built {}", report.output.display());
    println!("  Resources: {}", report.resource_count);
    println!(
        "  Size: {} -> {}",
        format_file_size(report.raw_bytes),
        format_file_size(report.stored_bytes)
    );
    if let Some(digest) = report.digest {
        println!("  SHA-256: {}", nmpack::hash::to_hex(&digest));
    }
    if let Some(sig) = &report.signature {
        println!("  Signature: {}", sig.display());
    }
    println!("  Time: {:.2?}", report.elapsed);
    Ok(())
}

fn cmd_validate(project: &Path) -> Result<()> {
    let errors = build::validate_project(project)?;
    if errors.is_empty() {
        println!("Project {} is valid", project.display());
        return Ok(());
    }
    for e in &errors {
        println!("  - {e}");
    }
    anyhow::bail!("{} problems found in {}", errors.len(), project.display())
}

fn cmd_list(pack: &Path) -> Result<()> {
    let reader = PackReader::open(pack)
        .with_context(|| format!("Failed to open pack {}", pack.display()))?;
    let header = reader.header();
    println!(
        "{} (format {}.{}, {} resources, {})",
        pack.display(),
        header.version_major,
        header.version_minor,
        reader.len(),
        format_file_size(reader.file_len())
    );

    for entry in reader.entries() {
        let mut flags = String::new();
        if entry.is_compressed() {
            flags.push('z');
        }
        if entry.is_encrypted() {
            flags.push('e');
        }
        println!(
            "  {:<8} {:>10} {:>10} {:<2} {}",
            entry.resource_type.as_str(),
            format_file_size(entry.raw_len),
            format_file_size(entry.stored_len),
            flags,
            entry.path
        );
    }
    Ok(())
}

fn cmd_verify(pack: &Path, key: Option<&Path>, trusted_key: Option<&Path>) -> Result<()> {
    let cipher = load_cipher(key)?;
    let mut reader = PackReader::open(pack)
        .with_context(|| format!("Failed to open pack {}", pack.display()))?;
    let report = reader.verify(cipher.as_ref())?;
    println!(
        "Integrity OK: {} verified, {} encrypted (CRC only)",
        report.verified, report.skipped_encrypted
    );

    let sig_path = build::signature_path(pack);
    if sig_path.exists() {
        let trusted = trusted_key
            .map(crypto::signing::load_public_key)
            .transpose()?;
        let signature = build::verify_pack_signature(pack, trusted.as_deref())?;
        println!(
            "Signature OK ({})",
            signature.key_id.as_deref().unwrap_or("no key id")
        );
    } else if trusted_key.is_some() {
        anyhow::bail!("No signature found at {}", sig_path.display());
    }
    Ok(())
}

fn cmd_extract(pack: &Path, dest: &Path, key: Option<&Path>, filter: &[String]) -> Result<()> {
    let cipher = load_cipher(key)?;
    let mut reader = PackReader::open(pack)
        .with_context(|| format!("Failed to open pack {}", pack.display()))?;
    let count = reader.extract(dest, filter, cipher.as_ref())?;
    println!("Extracted {} resources to {}", count, dest.display());
    Ok(())
}

fn cmd_keygen(path: &Path, signing: bool, key_id: Option<&str>) -> Result<()> {
    if !signing {
        crypto::generate_key(path)?;
        println!("Wrote encryption key to {}", path.display());
        return Ok(());
    }

    let mut pair = SigningKeyPair::generate();
    if let Some(id) = key_id {
        pair = pair.with_key_id(id);
    }
    let mut public = path.as_os_str().to_os_string();
    public.push(".pub");
    let public = PathBuf::from(public);
    pair.save_to_files(path, &public)?;
    println!("Wrote signing key to {}", path.display());
    println!("Wrote public key to {}", public.display());
    println!("Public key: {}", pair.public_key_base64());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Some(Commands::Build {
            config,
            project,
            output,
            platform,
            build_type,
            compression,
            encrypt_key,
            sign_key,
            timestamp,
            loose,
        }) => {
            info!("Starting build");
            cmd_build(
                config,
                project,
                output,
                platform,
                build_type,
                compression,
                encrypt_key,
                sign_key,
                timestamp,
                loose,
            )
        }
        Some(Commands::Validate { project }) => cmd_validate(&project),
        Some(Commands::List { pack }) => cmd_list(&pack),
        Some(Commands::Verify {
            pack,
            key,
            trusted_key,
        }) => cmd_verify(&pack, key.as_deref(), trusted_key.as_deref()),
        Some(Commands::Extract {
            pack,
            dest,
            key,
            filter,
        }) => cmd_extract(&pack, &dest, key.as_deref(), &filter),
        Some(Commands::Keygen {
            path,
            signing,
            key_id,
        }) => cmd_keygen(&path, signing, key_id.as_deref()),
        None => {
            println!("nmpack v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'nmpack --help' for usage information");
            Ok(())
        }
    }
}

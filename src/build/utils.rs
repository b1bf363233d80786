// src/build/utils.rs

//! Small helpers shared by the build pass and the CLI

use super::config::BuildPlatform;

/// Human-readable platform name
pub fn platform_name(platform: BuildPlatform) -> &'static str {
    match platform {
        BuildPlatform::Windows => "Windows",
        BuildPlatform::Linux => "Linux",
        BuildPlatform::MacOS => "macOS",
        BuildPlatform::Web => "Web",
        BuildPlatform::Android => "Android",
        BuildPlatform::IOS => "iOS",
    }
}

/// Executable file extension for a platform, including the dot
pub fn executable_extension(platform: BuildPlatform) -> &'static str {
    match platform {
        BuildPlatform::Windows => ".exe",
        _ => "",
    }
}

/// Format a byte count as B, KB, MB or GB
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_names() {
        assert_eq!(platform_name(BuildPlatform::Windows), "Windows");
        assert_eq!(platform_name(BuildPlatform::Linux), "Linux");
        assert_eq!(platform_name(BuildPlatform::MacOS), "macOS");
        assert_eq!(platform_name(BuildPlatform::Web), "Web");
        assert_eq!(platform_name(BuildPlatform::Android), "Android");
        assert_eq!(platform_name(BuildPlatform::IOS), "iOS");
    }

    #[test]
    fn test_executable_extension() {
        assert_eq!(executable_extension(BuildPlatform::Windows), ".exe");
        assert_eq!(executable_extension(BuildPlatform::Linux), "");
        assert_eq!(executable_extension(BuildPlatform::MacOS), "");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
    }
}

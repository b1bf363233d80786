// src/resource.rs

//! Resource classification by file extension
//!
//! Classification is a pure function of the extension, compared
//! case-insensitively. Unknown extensions fall into [`ResourceType::Other`];
//! classification never aborts a build.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resource categories stored in the pack table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Anything without a dedicated loader
    Other,
    /// Images (png, jpg, bmp, webp, ...)
    Texture,
    /// Short-form sound effects, fully decoded at load
    Audio,
    /// Long-form streamed audio
    Music,
    Font,
    /// NovelMind script source
    Script,
    /// Structured data (json, xml)
    Data,
}

impl ResourceType {
    /// Classify a file name or path by its extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "bmp" | "webp" | "tga" | "gif") => Self::Texture,
            Some("wav" | "flac") => Self::Audio,
            Some("ogg" | "mp3") => Self::Music,
            Some("ttf" | "otf") => Self::Font,
            Some("nms" | "nmscript") => Self::Script,
            Some("json" | "xml") => Self::Data,
            _ => Self::Other,
        }
    }

    /// One-byte tag written to the pack table
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Other => 0,
            Self::Texture => 1,
            Self::Audio => 2,
            Self::Music => 3,
            Self::Font => 4,
            Self::Script => 5,
            Self::Data => 6,
        }
    }

    /// Inverse of [`ResourceType::tag`]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Other),
            1 => Some(Self::Texture),
            2 => Some(Self::Audio),
            3 => Some(Self::Music),
            4 => Some(Self::Font),
            5 => Some(Self::Script),
            6 => Some(Self::Data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Texture => "texture",
            Self::Audio => "audio",
            Self::Music => "music",
            Self::Font => "font",
            Self::Script => "script",
            Self::Data => "data",
        }
    }

    /// Return all resource types
    pub fn all() -> &'static [ResourceType] {
        &[
            Self::Other,
            Self::Texture,
            Self::Audio,
            Self::Music,
            Self::Font,
            Self::Script,
            Self::Data,
        ]
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a file name by extension
#[inline]
pub fn classify(filename: &str) -> ResourceType {
    ResourceType::from_path(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_types() {
        for name in ["test.png", "test.jpg", "test.jpeg", "test.bmp", "test.webp"] {
            assert_eq!(classify(name), ResourceType::Texture, "{name}");
        }
    }

    #[test]
    fn test_audio_and_music_types() {
        assert_eq!(classify("test.wav"), ResourceType::Audio);
        assert_eq!(classify("test.flac"), ResourceType::Audio);
        assert_eq!(classify("test.ogg"), ResourceType::Music);
        assert_eq!(classify("test.mp3"), ResourceType::Music);
    }

    #[test]
    fn test_font_script_data_types() {
        assert_eq!(classify("test.ttf"), ResourceType::Font);
        assert_eq!(classify("test.otf"), ResourceType::Font);
        assert_eq!(classify("test.nms"), ResourceType::Script);
        assert_eq!(classify("test.nmscript"), ResourceType::Script);
        assert_eq!(classify("test.json"), ResourceType::Data);
        assert_eq!(classify("test.xml"), ResourceType::Data);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("test.PNG"), ResourceType::Texture);
        assert_eq!(classify("test.OGG"), ResourceType::Music);
        assert_eq!(classify("Scripts/Intro.NMS"), ResourceType::Script);
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(classify("readme.txt"), ResourceType::Other);
        assert_eq!(classify("Makefile"), ResourceType::Other);
        assert_eq!(classify(""), ResourceType::Other);
        assert_eq!(classify(".png"), ResourceType::Other);
    }

    #[test]
    fn test_tag_roundtrip() {
        for ty in ResourceType::all() {
            assert_eq!(ResourceType::from_tag(ty.tag()), Some(*ty));
        }
        assert_eq!(ResourceType::from_tag(200), None);
    }
}

// src/pack/format.rs
//! NMRS pack container layout
//!
//! All integers are little-endian.
//!
//! ```text
//! offset 0   magic "NMRS"                          4 bytes
//! offset 4   version major (u16), minor (u16)      4 bytes
//! offset 8   resource count (u32)                  4 bytes
//! offset 12  resource table, one entry per resource:
//!              type tag u8, flags u8,
//!              path length u16, UTF-8 path bytes,
//!              raw length u64, stored length u64,
//!              crc32 u32 (stored bytes), sha256 32 bytes (raw bytes),
//!              body offset u64 (relative to the body region)
//! ...        resource bodies, concatenated in table order
//! last 32    footer: magic "NMRF", crc32 u32, sha256[..24]
//!            (both digests cover every byte before the footer)
//! ```
//!
//! The header and the fixed-width footer are two independent anchors: a
//! reader can check that a file is a complete pack from its first 12 and
//! last 32 bytes without parsing the table.

use crate::hash::{DIGEST_LEN, Digest};
use crate::resource::ResourceType;

/// Header magic
pub const PACK_MAGIC: [u8; 4] = *b"NMRS";

/// Footer magic
pub const FOOTER_MAGIC: [u8; 4] = *b"NMRF";

pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

pub const HEADER_LEN: usize = 12;
pub const FOOTER_LEN: usize = 32;

/// Bytes of the whole-pack SHA-256 kept in the footer
pub const FOOTER_DIGEST_LEN: usize = FOOTER_LEN - FOOTER_MAGIC.len() - 4;

/// Body is zstd-compressed
pub const FLAG_COMPRESSED: u8 = 0x01;
/// Body is AES-256-GCM encrypted
pub const FLAG_ENCRYPTED: u8 = 0x02;

const KNOWN_FLAGS: u8 = FLAG_COMPRESSED | FLAG_ENCRYPTED;

/// Fixed part of a table entry (everything except the path bytes)
pub const ENTRY_FIXED_LEN: usize = 1 + 1 + 2 + 8 + 8 + 4 + DIGEST_LEN + 8;

/// Leading entry bytes up to and including the path length
pub const ENTRY_PREFIX_LEN: usize = 4;

/// Pack header as stored in the first 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version_major: u16,
    pub version_minor: u16,
    pub resource_count: u32,
}

impl PackHeader {
    pub fn new(resource_count: u32) -> Self {
        Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            resource_count,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&PACK_MAGIC);
        out[4..6].copy_from_slice(&self.version_major.to_le_bytes());
        out[6..8].copy_from_slice(&self.version_minor.to_le_bytes());
        out[8..12].copy_from_slice(&self.resource_count.to_le_bytes());
        out
    }

    /// Parse and validate magic and version
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, String> {
        if bytes[0..4] != PACK_MAGIC {
            return Err("bad header magic".to_string());
        }
        let version_major = u16::from_le_bytes([bytes[4], bytes[5]]);
        let version_minor = u16::from_le_bytes([bytes[6], bytes[7]]);
        if version_major != VERSION_MAJOR {
            return Err(format!(
                "unsupported pack version {version_major}.{version_minor}"
            ));
        }
        let resource_count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        Ok(Self {
            version_major,
            version_minor,
            resource_count,
        })
    }
}

/// Pack footer as stored in the last 32 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackFooter {
    pub crc32: u32,
    pub digest_prefix: [u8; FOOTER_DIGEST_LEN],
}

impl PackFooter {
    /// Build a footer from the digests of everything before it
    pub fn new(crc32: u32, digest: &Digest) -> Self {
        let mut digest_prefix = [0u8; FOOTER_DIGEST_LEN];
        digest_prefix.copy_from_slice(&digest[..FOOTER_DIGEST_LEN]);
        Self {
            crc32,
            digest_prefix,
        }
    }

    pub fn encode(&self) -> [u8; FOOTER_LEN] {
        let mut out = [0u8; FOOTER_LEN];
        out[0..4].copy_from_slice(&FOOTER_MAGIC);
        out[4..8].copy_from_slice(&self.crc32.to_le_bytes());
        out[8..].copy_from_slice(&self.digest_prefix);
        out
    }

    pub fn decode(bytes: &[u8; FOOTER_LEN]) -> Result<Self, String> {
        if bytes[0..4] != FOOTER_MAGIC {
            return Err("bad footer magic".to_string());
        }
        let crc32 = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut digest_prefix = [0u8; FOOTER_DIGEST_LEN];
        digest_prefix.copy_from_slice(&bytes[8..]);
        Ok(Self {
            crc32,
            digest_prefix,
        })
    }

    /// Whether the footer agrees with freshly computed digests
    pub fn matches(&self, crc32: u32, digest: &Digest) -> bool {
        self.crc32 == crc32 && self.digest_prefix[..] == digest[..FOOTER_DIGEST_LEN]
    }
}

/// One row of the resource table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Normalized virtual path
    pub path: String,
    pub resource_type: ResourceType,
    pub flags: u8,
    /// Length of the original content
    pub raw_len: u64,
    /// Length of the body as stored (after compression/encryption)
    pub stored_len: u64,
    /// CRC32 of the stored body
    pub crc32: u32,
    /// SHA-256 of the original content
    pub digest: Digest,
    /// Body offset relative to the start of the body region
    pub offset: u64,
}

impl ResourceEntry {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Encoded size of this entry in the table
    pub fn encoded_len(&self) -> usize {
        ENTRY_FIXED_LEN + self.path.len()
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), String> {
        let path = self.path.as_bytes();
        let path_len = u16::try_from(path.len())
            .map_err(|_| format!("path too long for pack table: {}", self.path))?;

        out.push(self.resource_type.tag());
        out.push(self.flags);
        out.extend_from_slice(&path_len.to_le_bytes());
        out.extend_from_slice(path);
        out.extend_from_slice(&self.raw_len.to_le_bytes());
        out.extend_from_slice(&self.stored_len.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.digest);
        out.extend_from_slice(&self.offset.to_le_bytes());
        Ok(())
    }

    /// Decode one entry from the front of `cursor`, advancing it
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, String> {
        let tag = cursor.u8()?;
        let resource_type =
            ResourceType::from_tag(tag).ok_or_else(|| format!("unknown resource type tag {tag}"))?;
        let flags = cursor.u8()?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(format!("unknown resource flags {flags:#04x}"));
        }

        let path_len = cursor.u16()? as usize;
        let path = std::str::from_utf8(cursor.take(path_len)?)
            .map_err(|_| "resource path is not UTF-8".to_string())?
            .to_string();

        Ok(Self {
            path,
            resource_type,
            flags,
            raw_len: cursor.u64()?,
            stored_len: cursor.u64()?,
            crc32: cursor.u32()?,
            digest: cursor.array::<DIGEST_LEN>()?,
            offset: cursor.u64()?,
        })
    }
}

/// Bounds-checked little-endian reader over a byte slice
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| "truncated resource table".to_string())?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, String> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, String> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, String> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, String> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

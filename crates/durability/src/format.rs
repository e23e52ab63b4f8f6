//! On-disk settings file format
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────┬───────────────┬─────────┐
//! │ "PRFS"   │ version  │ reserved │ payload len │ MessagePack   │ CRC32   │
//! │ 4 bytes  │ u16 LE   │ u16 LE   │ u32 LE      │ payload       │ u32 LE  │
//! └──────────┴──────────┴──────────┴─────────────┴───────────────┴─────────┘
//! ```
//!
//! The CRC covers every byte before it. The payload is a [`CacheSnapshot`]
//! serialized with named fields, so adding fields later stays readable.

use prefs_core::{Error, Result};
use prefs_storage::CacheSnapshot;

/// File magic
pub const SETTINGS_MAGIC: &[u8; 4] = b"PRFS";

/// Current frame format version
pub const SETTINGS_FORMAT_VERSION: u16 = 1;

/// Bytes before the payload
pub const HEADER_SIZE: usize = 12;

/// Bytes after the payload
pub const FOOTER_SIZE: usize = 4;

/// Fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsHeader {
    /// Frame format version
    pub format_version: u16,
    /// Payload length in bytes
    pub payload_len: u32,
}

impl SettingsHeader {
    /// Header for a payload of `payload_len` bytes at the current version
    pub fn new(payload_len: u32) -> Self {
        Self {
            format_version: SETTINGS_FORMAT_VERSION,
            payload_len,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(SETTINGS_MAGIC);
        buf[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        // bytes 6..8 reserved, zero
        buf[8..12].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Parse and validate magic and version
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corruption(format!(
                "settings file too short: {} bytes",
                data.len()
            )));
        }
        if &data[0..4] != SETTINGS_MAGIC {
            return Err(Error::corruption("invalid settings file magic"));
        }
        let format_version = u16::from_le_bytes([data[4], data[5]]);
        if format_version == 0 || format_version > SETTINGS_FORMAT_VERSION {
            return Err(Error::UnsupportedVersion {
                found: format_version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        let payload_len = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        Ok(Self {
            format_version,
            payload_len,
        })
    }
}

/// Encode a snapshot into a complete settings file image
pub fn encode(snapshot: &CacheSnapshot) -> Result<Vec<u8>> {
    let payload = rmp_serde::to_vec_named(snapshot)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| Error::Serialization("settings payload exceeds 4 GiB".to_string()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
    buf.extend_from_slice(&SettingsHeader::new(payload_len).to_bytes());
    buf.extend_from_slice(&payload);

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Decode a settings file image, validating framing and checksum
pub fn decode(data: &[u8]) -> Result<CacheSnapshot> {
    let header = SettingsHeader::from_bytes(data)?;
    let payload_end = HEADER_SIZE + header.payload_len as usize;
    let expected_len = payload_end + FOOTER_SIZE;
    if data.len() != expected_len {
        return Err(Error::corruption(format!(
            "settings file length mismatch: expected {}, got {}",
            expected_len,
            data.len()
        )));
    }

    let stored_crc = u32::from_le_bytes([
        data[payload_end],
        data[payload_end + 1],
        data[payload_end + 2],
        data[payload_end + 3],
    ]);
    let computed_crc = crc32fast::hash(&data[..payload_end]);
    if stored_crc != computed_crc {
        return Err(Error::corruption(format!(
            "settings checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, computed_crc
        )));
    }

    Ok(rmp_serde::from_slice(&data[HEADER_SIZE..payload_end])?)
}

//! Snapshot file format
//!
//! A snapshot is a single self-contained file, immutable once renamed into
//! place.
//!
//! # File Structure
//!
//! ```text
//! +------------------+ 0
//! | MAGIC "REDIS"    | 5 bytes
//! +------------------+ 5
//! | VERSION_AND_FLAGS| 4 bytes:
//! |                  |   byte 0: major version (currently 0x01)
//! |                  |   byte 1: flags (bit0=gzip, bit1=crc32)
//! |                  |   bytes 2-3: reserved, zero
//! +------------------+ 9
//! | PAYLOAD          | variable (gzip-compressed iff flag bit0)
//! +------------------+ end-4
//! | CRC32 (LE)       | 4 bytes, over [0 .. end-4), iff flag bit1
//! +------------------+
//! ```
//!
//! The payload, after decompression, is a sequence of entries:
//!
//! ```text
//! [value_tag: u8][key_len: varint][key: bytes][expiry_ms: i64 LE][value_body]
//! ```
//!
//! `expiry_ms` is absolute Unix milliseconds, `-1` meaning no expiry. The
//! per-variant body layouts live in the codec module.
//!
//! A predecessor format carried a fixed ASCII `"0001"` in the version slot
//! with no flags byte; it is accepted on read as major 1 with both flags set,
//! and never written.

use thiserror::Error;

/// Magic bytes at offset 0.
pub const SNAPSHOT_MAGIC: [u8; 5] = *b"REDIS";

/// Current major format version (byte 0 of the version field).
pub const FORMAT_VERSION: u8 = 0x01;

/// Fixed header size: magic + version-and-flags.
pub const HEADER_SIZE: usize = 9;

/// Trailing checksum size when flag bit1 is set.
pub const CHECKSUM_SIZE: usize = 4;

/// Flag bit 0: payload is gzip-compressed.
pub const FLAG_COMPRESSED: u8 = 0b0000_0001;
/// Flag bit 1: trailing CRC32 present.
pub const FLAG_CHECKSUMED: u8 = 0b0000_0010;

/// The predecessor format's fixed version field.
const LEGACY_VERSION_FIELD: [u8; 4] = *b"0001";

/// Parsed version-and-flags header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Major format version.
    pub version: u8,
    /// Payload is gzip-compressed.
    pub compressed: bool,
    /// Trailing CRC32 present.
    pub checksumed: bool,
}

impl SnapshotHeader {
    /// Header for a new snapshot in the current format.
    pub fn new(compressed: bool, checksumed: bool) -> Self {
        SnapshotHeader {
            version: FORMAT_VERSION,
            compressed,
            checksumed,
        }
    }

    /// Serialize magic + version-and-flags.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut flags = 0u8;
        if self.compressed {
            flags |= FLAG_COMPRESSED;
        }
        if self.checksumed {
            flags |= FLAG_CHECKSUMED;
        }

        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..5].copy_from_slice(&SNAPSHOT_MAGIC);
        bytes[5] = self.version;
        bytes[6] = flags;
        // bytes 7-8 reserved, zero
        bytes
    }

    /// Parse and validate the fixed header.
    ///
    /// Accepts the legacy ASCII `"0001"` version field as major 1 with both
    /// flags set. Unknown flag bits and non-zero reserved bytes are rejected
    /// as unsupported: a future writer set bits this reader cannot honor.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated { size: bytes.len() });
        }
        if bytes[0..5] != SNAPSHOT_MAGIC {
            let mut actual = [0u8; 5];
            actual.copy_from_slice(&bytes[0..5]);
            return Err(HeaderError::BadMagic { actual });
        }

        if bytes[5..9] == LEGACY_VERSION_FIELD {
            return Ok(SnapshotHeader {
                version: FORMAT_VERSION,
                compressed: true,
                checksumed: true,
            });
        }

        let version = bytes[5];
        let flags = bytes[6];
        if version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion { version });
        }
        if flags & !(FLAG_COMPRESSED | FLAG_CHECKSUMED) != 0 || bytes[7] != 0 || bytes[8] != 0 {
            return Err(HeaderError::UnsupportedFlags { flags });
        }

        Ok(SnapshotHeader {
            version,
            compressed: flags & FLAG_COMPRESSED != 0,
            checksumed: flags & FLAG_CHECKSUMED != 0,
        })
    }
}

/// Errors from parsing the fixed header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// File shorter than the fixed header
    #[error("snapshot file too small: {size} bytes")]
    Truncated {
        /// Actual file size
        size: usize,
    },
    /// Magic bytes do not spell "REDIS"
    #[error("bad magic bytes: expected \"REDIS\", got {actual:?}")]
    BadMagic {
        /// Magic bytes actually found
        actual: [u8; 5],
    },
    /// Major version this reader does not understand
    #[error("unsupported snapshot version {version}")]
    UnsupportedVersion {
        /// Version found in the file
        version: u8,
    },
    /// Flag bits or reserved bytes this reader cannot honor
    #[error("unsupported snapshot flags {flags:#04x}")]
    UnsupportedFlags {
        /// Flags byte found in the file
        flags: u8,
    },
}

/// Value type tags for snapshot entries
pub mod value_tags {
    /// Byte string
    pub const BYTES: u8 = 0x01;
    /// 64-bit signed integer
    pub const INT: u8 = 0x02;
    /// List of byte strings
    pub const LIST: u8 = 0x03;
    /// Set of byte strings
    pub const SET: u8 = 0x04;
    /// Field → value mapping
    pub const HASH: u8 = 0x05;
    /// Member → score mapping
    pub const ZSET: u8 = 0x06;

    /// Tag name for display
    pub fn tag_name(tag: u8) -> &'static str {
        match tag {
            BYTES => "bytes",
            INT => "int",
            LIST => "list",
            SET => "set",
            HASH => "hash",
            ZSET => "zset",
            _ => "unknown",
        }
    }
}

// ============================================================================
// Varint (LEB128) Codec
// ============================================================================

/// Encode a u64 as a variable-length integer (LEB128).
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a varint from a byte slice, returning (value, bytes_consumed).
///
/// Returns None on truncation or a varint longer than 10 bytes (the u64
/// maximum).
pub fn decode_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            return None;
        }
        value |= u64::from(byte & 0x7F).checked_shl(shift)?;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
    }
    None
}

//! Compression type tags shared with the on-disk block format.

use serde::{Deserialize, Serialize};

/// First tag that can be assigned to a user-registered codec.
pub const FIRST_CUSTOM_TYPE: u8 = 0x41;

/// Highest tag a codec can occupy. `0xFF` is the disabled sentinel and
/// never holds a codec.
pub const MAX_COMPRESSOR_TYPE: u8 = 0xFE;

/// On-disk compression type tag.
///
/// The numeric values of the historical built-ins are written into
/// stored blocks and must never change. Tags in
/// `FIRST_CUSTOM_TYPE..=MAX_COMPRESSOR_TYPE` are assigned dynamically
/// to user codecs and are collectively labelled [`CompressionType::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionType {
    /// Blocks are stored uncompressed.
    NoCompression = 0x00,
    /// Snappy block compression.
    Snappy = 0x01,
    /// Zlib (DEFLATE) stream compression.
    Zlib = 0x02,
    /// BZip2 stream compression.
    BZip2 = 0x03,
    /// LZ4 block compression.
    Lz4 = 0x04,
    /// LZ4 high-compression mode.
    Lz4hc = 0x05,
    /// Microsoft Xpress (Windows-only in practice).
    Xpress = 0x06,
    /// Zstandard.
    Zstd = 0x07,
    /// Experimental Zstandard variant kept for format compatibility.
    ZstdNotFinal = 0x40,
    /// Label for any tag in the custom range; never stored in a slot.
    Custom = 0xFE,
    /// Sentinel meaning "compression disabled" at the options layer and
    /// "failure" for registry insertions. Never stored in a slot.
    Disabled = 0xFF,
}

impl CompressionType {
    /// Returns the raw on-disk tag value.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the reserved variant for the given tag, or `None` for
    /// tags in the custom range.
    pub fn from_tag(tag: u8) -> Option<CompressionType> {
        match tag {
            0x00 => Some(CompressionType::NoCompression),
            0x01 => Some(CompressionType::Snappy),
            0x02 => Some(CompressionType::Zlib),
            0x03 => Some(CompressionType::BZip2),
            0x04 => Some(CompressionType::Lz4),
            0x05 => Some(CompressionType::Lz4hc),
            0x06 => Some(CompressionType::Xpress),
            0x07 => Some(CompressionType::Zstd),
            0x40 => Some(CompressionType::ZstdNotFinal),
            0xFE => Some(CompressionType::Custom),
            0xFF => Some(CompressionType::Disabled),
            _ => None,
        }
    }
}

/// Whether a tag is reserved and can never be assigned to a codec.
pub fn is_reserved_tag(tag: u8) -> bool {
    tag == CompressionType::NoCompression.tag()
        || tag == CompressionType::Custom.tag()
        || tag == CompressionType::Disabled.tag()
}

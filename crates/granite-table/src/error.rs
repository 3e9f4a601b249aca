//! Error types for the table layer.

use thiserror::Error;

use granite_compress::CompressionError;

/// Result type alias for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Error variants for table and database operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid table.
    #[error("Corruption: {reason}")]
    Corruption {
        /// Description of what failed to parse.
        reason: String,
    },

    /// A stored block failed its integrity check.
    #[error("Checksum mismatch: expected {expected:#x}, actual {actual:#x}")]
    ChecksumMismatch {
        /// The checksum stored with the block.
        expected: u32,
        /// The checksum computed over the block read back.
        actual: u32,
    },

    /// A stored block names a compression tag with no registered codec.
    #[error("No compressor registered for tag {tag:#04x}")]
    UnknownCompression {
        /// The offending tag.
        tag: u8,
    },

    /// The options string named a compressor the registry does not know.
    #[error("Unknown compressor name: '{name}'")]
    UnknownCompressorName {
        /// The name that failed to resolve.
        name: String,
    },

    /// A block or property section failed to (de)serialize.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The compression subsystem reported a failure.
    #[error(transparent)]
    Compression(#[from] CompressionError),
}

//! Error types for the compression subsystem.

use thiserror::Error;

/// Result type alias for compression operations.
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Error variants for compression operations.
///
/// Codecs surface only `Corruption` and `MemoryLimit`; the remaining
/// variants belong to the registry and plugin-loading layer.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The codec rejected the data.
    #[error("Corruption: {0}")]
    Corruption(String),

    /// The output allocator could not satisfy the request.
    #[error("Memory limit reached while allocating {requested} bytes")]
    MemoryLimit {
        /// Number of bytes that could not be allocated.
        requested: usize,
    },

    /// A plugin module could not be loaded or did not provide a codec.
    #[error("Plugin load failed for '{module}': {reason}")]
    PluginLoad {
        /// The module file name.
        module: String,
        /// Description of the failure.
        reason: String,
    },

    /// Wraps standard I/O errors from the environment layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressionError {
    /// Shorthand for a `Corruption` error with the given reason.
    pub fn corruption(reason: impl Into<String>) -> Self {
        CompressionError::Corruption(reason.into())
    }
}

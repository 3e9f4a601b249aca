//! Per-column-family compression options consumed by codecs.

use serde::{Deserialize, Serialize};

/// Tuning knobs for compression, configured per column family.
///
/// Each codec interprets the subset it understands and ignores the
/// rest. `level: None` means "use the codec's own default level".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Compression level; algorithm-specific meaning. `None` selects
    /// the codec default (e.g. 3 for Zstd, 6 for Zlib).
    pub level: Option<i32>,
    /// Zlib window size (negative for raw deflate). Accepted for
    /// compatibility; backends with a fixed window ignore it.
    pub window_bits: i32,
    /// Zlib strategy parameter.
    pub strategy: i32,
    /// Maximum bytes of a sampled dictionary handed to codecs.
    pub max_dict_bytes: u32,
    /// Number of threads a codec may use for one compress call.
    pub parallel_threads: u32,
    /// Whether compression is enabled for the owning column family.
    pub enabled: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: None,
            window_bits: -14,
            strategy: 0,
            max_dict_bytes: 0,
            parallel_threads: 1,
            enabled: true,
        }
    }
}

//! Microsoft Xpress placeholder.
//!
//! Xpress only exists as a system library on Windows and has no Rust
//! binding here. The codec keeps its format-mandated tag but reports
//! itself unsupported; the options layer refuses to select it.

use crate::allocator::{CacheAllocation, MemoryAllocator};
use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
use crate::error::{CompressionError, CompressionResult};

/// Xpress. `supported()` is false on every platform this crate builds
/// for; the tag is reserved so stored data from Windows builds keeps
/// its meaning.
#[derive(Debug, Default, Clone, Copy)]
pub struct XpressCompressor;

impl Compressor for XpressCompressor {
    fn name(&self) -> &'static str {
        "Xpress"
    }

    fn supported(&self) -> bool {
        false
    }

    fn compress(
        &self,
        _info: &CompressionInfo<'_>,
        _format_version: u32,
        _input: &[u8],
        _output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        Err(CompressionError::corruption(
            "Xpress compression is not available on this platform",
        ))
    }

    fn uncompress(
        &self,
        _info: &UncompressionInfo<'_>,
        _format_version: u32,
        _input: &[u8],
        _allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        Err(CompressionError::corruption(
            "Xpress decompression is not available on this platform",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CompressorRegistry;
    use crate::types::CompressionType;

    #[test]
    fn test_xpress_registered_but_unsupported() {
        let registry = CompressorRegistry::new();
        let codec = registry
            .get_compressor(CompressionType::Xpress.tag())
            .unwrap();
        assert_eq!(codec.name(), "Xpress");
        assert!(!codec.supported());
    }
}

//! BZip2 stream compression via the `bzip2` crate.

use std::io::{Read, Write};

use crate::allocator::{CacheAllocation, MemoryAllocator};
use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
use crate::error::{CompressionError, CompressionResult};

/// BZip2. The stream is self-describing, so `format_version` is
/// ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bzip2Compressor;

impl Compressor for Bzip2Compressor {
    fn name(&self) -> &'static str {
        "BZip2"
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let level = match info.options().level {
            Some(level) => bzip2::Compression::new(level.clamp(1, 9) as u32),
            None => bzip2::Compression::default(),
        };
        let mut encoder = bzip2::write::BzEncoder::new(&mut *output, level);
        encoder
            .write_all(input)
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
        Ok(())
    }

    fn uncompress(
        &self,
        _info: &UncompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let mut decoded = Vec::new();
        bzip2::read::BzDecoder::new(input)
            .read_to_end(&mut decoded)
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
        CacheAllocation::copy_from_slice(&decoded, allocator)
    }
}

#[cfg(test)]
mod tests {
    use crate::codecs::testutil::roundtrip;
    use crate::registry::CompressorRegistry;
    use crate::types::CompressionType;

    #[test]
    fn test_bzip2_roundtrip() {
        let registry = CompressorRegistry::new();
        let data = b"granite granite granite granite ".repeat(128);
        roundtrip(&registry, CompressionType::BZip2.tag(), 2, &data);
    }

    #[test]
    fn test_bzip2_binary_data() {
        let registry = CompressorRegistry::new();
        let data: Vec<u8> = (0..10_000).map(|i| (i * 31 % 251) as u8).collect();
        roundtrip(&registry, CompressionType::BZip2.tag(), 1, &data);
    }
}

//! Zlib (DEFLATE) stream compression via `flate2`.

use std::io::{Read, Write};

use crate::allocator::{CacheAllocation, MemoryAllocator};
use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
use crate::error::{CompressionError, CompressionResult};

const DEFAULT_LEVEL: i32 = 6;

/// Zlib. Level and strategy come from the compression options; the
/// zlib stream is self-describing, so `format_version` is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibCompressor;

impl ZlibCompressor {
    fn level(info: &CompressionInfo<'_>) -> flate2::Compression {
        let level = info.options().level.unwrap_or(DEFAULT_LEVEL).clamp(0, 9);
        flate2::Compression::new(level as u32)
    }
}

impl Compressor for ZlibCompressor {
    fn name(&self) -> &'static str {
        "Zlib"
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let mut encoder = flate2::write::ZlibEncoder::new(&mut *output, Self::level(info));
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
        flate2::read::ZlibDecoder::new(input)
            .read_to_end(&mut decoded)
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
        CacheAllocation::copy_from_slice(&decoded, allocator)
    }
}

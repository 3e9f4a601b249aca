//! LZ4 and LZ4HC block compression.
//!
//! The fast path uses `lz4_flex`; the high-compression variant goes
//! through the `lz4` bindings, which expose the HC entry points.
//!
//! Block layout depends on the format version: before
//! [`LENGTH_PREFIX_FORMAT_VERSION`] the payload is a self-describing
//! size-prepended block, from it onward an 8-byte little-endian
//! original-length prefix is followed by the raw block.

use crate::allocator::{allocate_output, CacheAllocation, MemoryAllocator};
use crate::codecs::{split_length_prefix, LENGTH_PREFIX_FORMAT_VERSION};
use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
use crate::error::{CompressionError, CompressionResult};

/// LZ4 fast mode, with raw-dictionary support.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "LZ4"
    }

    fn dict_compression_supported(&self) -> bool {
        true
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let dict = info.dict().raw_dict();
        if format_version >= LENGTH_PREFIX_FORMAT_VERSION {
            output.extend_from_slice(&(input.len() as u64).to_le_bytes());
            let block = if dict.is_empty() {
                lz4_flex::block::compress(input)
            } else {
                lz4_flex::block::compress_with_dict(input, dict)
            };
            output.extend_from_slice(&block);
        } else {
            let block = if dict.is_empty() {
                lz4_flex::block::compress_prepend_size(input)
            } else {
                lz4_flex::block::compress_prepend_size_with_dict(input, dict)
            };
            output.extend_from_slice(&block);
        }
        Ok(())
    }

    fn uncompress(
        &self,
        info: &UncompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let dict = info.dict().slice();
        if format_version >= LENGTH_PREFIX_FORMAT_VERSION {
            let (decoded_len, block) = split_length_prefix(input)
                .ok_or_else(|| CompressionError::corruption("truncated LZ4 length prefix"))?;
            let mut out = allocate_output(decoded_len as usize, allocator)?;
            let written = if dict.is_empty() {
                lz4_flex::block::decompress_into(block, out.as_mut_slice())
            } else {
                lz4_flex::block::decompress_into_with_dict(block, out.as_mut_slice(), dict)
            }
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
            out.set_len(written);
            Ok(out)
        } else {
            let decoded = if dict.is_empty() {
                lz4_flex::block::decompress_size_prepended(input)
            } else {
                lz4_flex::block::decompress_size_prepended_with_dict(input, dict)
            }
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
            CacheAllocation::copy_from_slice(&decoded, allocator)
        }
    }
}

/// LZ4 high-compression mode. Same block layouts as [`Lz4Compressor`];
/// no dictionary support in the HC entry points used here.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4hcCompressor;

const DEFAULT_HC_LEVEL: i32 = 9;

impl Compressor for Lz4hcCompressor {
    fn name(&self) -> &'static str {
        "LZ4HC"
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let level = info.options().level.unwrap_or(DEFAULT_HC_LEVEL).clamp(1, 12);
        let mode = lz4::block::CompressionMode::HIGHCOMPRESSION(level);
        if format_version >= LENGTH_PREFIX_FORMAT_VERSION {
            let block = lz4::block::compress(input, Some(mode), false)
                .map_err(|e| CompressionError::corruption(e.to_string()))?;
            output.extend_from_slice(&(input.len() as u64).to_le_bytes());
            output.extend_from_slice(&block);
        } else {
            let block = lz4::block::compress(input, Some(mode), true)
                .map_err(|e| CompressionError::corruption(e.to_string()))?;
            output.extend_from_slice(&block);
        }
        Ok(())
    }

    fn uncompress(
        &self,
        _info: &UncompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let decoded = if format_version >= LENGTH_PREFIX_FORMAT_VERSION {
            let (decoded_len, block) = split_length_prefix(input)
                .ok_or_else(|| CompressionError::corruption("truncated LZ4HC length prefix"))?;
            let decoded_len = i32::try_from(decoded_len)
                .map_err(|_| CompressionError::corruption("LZ4HC length prefix out of range"))?;
            lz4::block::decompress(block, Some(decoded_len))
        } else {
            lz4::block::decompress(input, None)
        }
        .map_err(|e| CompressionError::corruption(e.to_string()))?;
        CacheAllocation::copy_from_slice(&decoded, allocator)
    }
}

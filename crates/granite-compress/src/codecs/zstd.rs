//! Zstandard, the only built-in with the full dictionary and context
//! machinery.
//!
//! Digested dictionaries are Zstd `EncoderDictionary` /
//! `DecoderDictionary` values built once per column family; per-worker
//! bulk contexts amortise the cost of the underlying (de)compression
//! state across calls. The Zstd frame embeds the content size, so
//! `format_version` is ignored.

use std::cell::RefCell;

use crate::allocator::{allocate_output, CacheAllocation, MemoryAllocator};
use crate::compressor::{
    CodecContext, CompressionInfo, Compressor, DigestedDict, UncompressionInfo,
};
use crate::error::{CompressionError, CompressionResult};

/// Digested compression dictionary handle.
struct ZstdDigestedCompressionDict {
    cdict: zstd::dict::EncoderDictionary<'static>,
}

/// Digested uncompression dictionary handle.
struct ZstdDigestedUncompressionDict {
    ddict: zstd::dict::DecoderDictionary<'static>,
    // The safe API does not expose the digested size; the raw length
    // is the dominant term and serves as the reported approximation.
    raw_len: usize,
}

/// Per-worker compression scratch at the default level.
struct ZstdCompressionContext {
    cctx: RefCell<zstd::bulk::Compressor<'static>>,
}

/// Per-worker uncompression scratch.
struct ZstdUncompressionContext {
    dctx: RefCell<zstd::bulk::Decompressor<'static>>,
}

fn corruption(e: std::io::Error) -> CompressionError {
    CompressionError::corruption(e.to_string())
}

/// Zstandard.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdCompressor;

impl ZstdCompressor {
    fn compress_impl(
        &self,
        info: &CompressionInfo<'_>,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let level = info
            .options()
            .level
            .unwrap_or(zstd::DEFAULT_COMPRESSION_LEVEL);
        let start = output.len();
        output.resize(start + zstd::zstd_safe::compress_bound(input.len()), 0);

        let written = if let Some(dict) = info.dict().digested_as::<ZstdDigestedCompressionDict>() {
            // The digested dictionary carries its own level.
            zstd::bulk::Compressor::with_prepared_dictionary(&dict.cdict)
                .and_then(|mut c| c.compress_to_buffer(input, &mut output[start..]))
        } else if !info.dict().raw_dict().is_empty() {
            zstd::bulk::Compressor::with_dictionary(level, info.dict().raw_dict())
                .and_then(|mut c| c.compress_to_buffer(input, &mut output[start..]))
        } else if info.options().level.is_none() {
            match info.context().get::<ZstdCompressionContext>() {
                Some(ctx) => ctx
                    .cctx
                    .borrow_mut()
                    .compress_to_buffer(input, &mut output[start..]),
                None => zstd::bulk::Compressor::new(level)
                    .and_then(|mut c| c.compress_to_buffer(input, &mut output[start..])),
            }
        } else {
            // Pooled contexts are pinned to the default level; an
            // explicit level gets a one-shot compressor.
            zstd::bulk::Compressor::new(level)
                .and_then(|mut c| c.compress_to_buffer(input, &mut output[start..]))
        }
        .map_err(corruption)?;

        output.truncate(start + written);
        Ok(())
    }

    fn uncompress_impl(
        &self,
        info: &UncompressionInfo<'_>,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let content_size = zstd::zstd_safe::get_frame_content_size(input)
            .map_err(|_| CompressionError::corruption("bad zstd frame header"))?
            .ok_or_else(|| CompressionError::corruption("zstd frame without content size"))?;
        let content_size = usize::try_from(content_size)
            .map_err(|_| CompressionError::corruption("zstd content size out of range"))?;

        let mut out = allocate_output(content_size, allocator)?;
        let written =
            if let Some(dict) = info.dict().digested_as::<ZstdDigestedUncompressionDict>() {
                zstd::bulk::Decompressor::with_prepared_dictionary(&dict.ddict)
                    .and_then(|mut d| d.decompress_to_buffer(input, out.as_mut_slice()))
            } else if !info.dict().slice().is_empty() {
                zstd::bulk::Decompressor::with_dictionary(info.dict().slice())
                    .and_then(|mut d| d.decompress_to_buffer(input, out.as_mut_slice()))
            } else {
                match info.context().get::<ZstdUncompressionContext>() {
                    Some(ctx) => ctx
                        .dctx
                        .borrow_mut()
                        .decompress_to_buffer(input, out.as_mut_slice()),
                    None => zstd::bulk::Decompressor::new()
                        .and_then(|mut d| d.decompress_to_buffer(input, out.as_mut_slice())),
                }
            }
            .map_err(corruption)?;
        out.set_len(written);
        Ok(out)
    }

    fn process_compression_dict_impl(
        &self,
        dict: &[u8],
        level: Option<i32>,
    ) -> Option<DigestedDict> {
        if dict.is_empty() {
            return None;
        }
        let level = level.unwrap_or(zstd::DEFAULT_COMPRESSION_LEVEL);
        Some(Box::new(ZstdDigestedCompressionDict {
            cdict: zstd::dict::EncoderDictionary::copy(dict, level),
        }))
    }

    fn process_uncompression_dict_impl(&self, dict: &[u8]) -> Option<DigestedDict> {
        if dict.is_empty() {
            return None;
        }
        Some(Box::new(ZstdDigestedUncompressionDict {
            ddict: zstd::dict::DecoderDictionary::copy(dict),
            raw_len: dict.len(),
        }))
    }
}

impl Compressor for ZstdCompressor {
    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn dict_compression_supported(&self) -> bool {
        true
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        self.compress_impl(info, input, output)
    }

    fn uncompress(
        &self,
        info: &UncompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        self.uncompress_impl(info, input, allocator)
    }

    fn process_compression_dict(&self, dict: &[u8], level: Option<i32>) -> Option<DigestedDict> {
        self.process_compression_dict_impl(dict, level)
    }

    fn process_uncompression_dict(&self, dict: &[u8]) -> Option<DigestedDict> {
        self.process_uncompression_dict_impl(dict)
    }

    fn uncompression_dict_memory_usage(&self, dict: &DigestedDict) -> usize {
        match dict.downcast_ref::<ZstdDigestedUncompressionDict>() {
            Some(d) => std::mem::size_of::<ZstdDigestedUncompressionDict>() + d.raw_len,
            None => 0,
        }
    }

    fn create_compression_context(&self) -> Option<CodecContext> {
        let cctx = zstd::bulk::Compressor::new(zstd::DEFAULT_COMPRESSION_LEVEL).ok()?;
        Some(Box::new(ZstdCompressionContext {
            cctx: RefCell::new(cctx),
        }))
    }

    fn create_uncompression_context(&self) -> Option<CodecContext> {
        let dctx = zstd::bulk::Decompressor::new().ok()?;
        Some(Box::new(ZstdUncompressionContext {
            dctx: RefCell::new(dctx),
        }))
    }
}

/// The experimental Zstandard variant kept at tag `0x40` for format
/// compatibility. Same engine as [`ZstdCompressor`], distinct identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdNotFinalCompressor {
    inner: ZstdCompressor,
}

impl ZstdNotFinalCompressor {
    /// Creates the variant codec.
    pub fn new() -> Self {
        Self {
            inner: ZstdCompressor,
        }
    }
}

impl Compressor for ZstdNotFinalCompressor {
    fn name(&self) -> &'static str {
        "ZSTDNotFinal"
    }

    fn dict_compression_supported(&self) -> bool {
        self.inner.dict_compression_supported()
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        self.inner.compress(info, format_version, input, output)
    }

    fn uncompress(
        &self,
        info: &UncompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        self.inner.uncompress(info, format_version, input, allocator)
    }

    fn process_compression_dict(&self, dict: &[u8], level: Option<i32>) -> Option<DigestedDict> {
        self.inner.process_compression_dict(dict, level)
    }

    fn process_uncompression_dict(&self, dict: &[u8]) -> Option<DigestedDict> {
        self.inner.process_uncompression_dict(dict)
    }

    fn uncompression_dict_memory_usage(&self, dict: &DigestedDict) -> usize {
        self.inner.uncompression_dict_memory_usage(dict)
    }

    fn create_compression_context(&self) -> Option<CodecContext> {
        self.inner.create_compression_context()
    }

    fn create_uncompression_context(&self) -> Option<CodecContext> {
        self.inner.create_uncompression_context()
    }
}

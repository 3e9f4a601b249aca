//! Snappy block compression via the `snap` crate.

use std::cell::RefCell;

use crate::allocator::{allocate_output, CacheAllocation, MemoryAllocator};
use crate::compressor::{CodecContext, CompressionInfo, Compressor, UncompressionInfo};
use crate::error::{CompressionError, CompressionResult};

/// Per-worker Snappy encoder scratch.
struct SnappyCompressionContext {
    encoder: RefCell<snap::raw::Encoder>,
}

/// Per-worker Snappy decoder scratch.
struct SnappyUncompressionContext {
    decoder: RefCell<snap::raw::Decoder>,
}

/// Snappy. The block format embeds the decoded length, so
/// `format_version` is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn name(&self) -> &'static str {
        "Snappy"
    }

    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        let start = output.len();
        output.resize(start + snap::raw::max_compress_len(input.len()), 0);
        let written = match info.context().get::<SnappyCompressionContext>() {
            Some(ctx) => ctx.encoder.borrow_mut().compress(input, &mut output[start..]),
            None => snap::raw::Encoder::new().compress(input, &mut output[start..]),
        }
        .map_err(|e| CompressionError::corruption(e.to_string()))?;
        output.truncate(start + written);
        Ok(())
    }

    fn uncompress(
        &self,
        info: &UncompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let decoded_len = snap::raw::decompress_len(input)
            .map_err(|e| CompressionError::corruption(e.to_string()))?;
        let mut out = allocate_output(decoded_len, allocator)?;
        let written = match info.context().get::<SnappyUncompressionContext>() {
            Some(ctx) => ctx.decoder.borrow_mut().decompress(input, out.as_mut_slice()),
            None => snap::raw::Decoder::new().decompress(input, out.as_mut_slice()),
        }
        .map_err(|e| CompressionError::corruption(e.to_string()))?;
        out.set_len(written);
        Ok(out)
    }

    fn create_compression_context(&self) -> Option<CodecContext> {
        Some(Box::new(SnappyCompressionContext {
            encoder: RefCell::new(snap::raw::Encoder::new()),
        }))
    }

    fn create_uncompression_context(&self) -> Option<CodecContext> {
        Some(Box::new(SnappyUncompressionContext {
            decoder: RefCell::new(snap::raw::Decoder::new()),
        }))
    }
}

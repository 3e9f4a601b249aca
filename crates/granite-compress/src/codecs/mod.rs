//! Built-in codec implementations.
//!
//! Each codec is a thin adapter from the [`Compressor`] trait onto a
//! well-known library, plus whatever dictionary and context state that
//! library benefits from. The reference RLE codec lives here too as
//! the worked example for plugin authors.

pub mod bzip2;
pub mod lz4;
pub mod rle;
pub mod snappy;
pub mod xpress;
pub mod zlib;
pub mod zstd;

use std::sync::Arc;

use crate::compressor::Compressor;
use crate::types::CompressionType;

/// Compressed block layout version at which codecs switch from the
/// legacy self-describing payload to the explicit 8-byte
/// original-length prefix. Codecs whose formats embed the decoded size
/// (Snappy, Zlib, BZip2, Zstd) ignore it.
pub const LENGTH_PREFIX_FORMAT_VERSION: u32 = 2;

/// The built-in codecs at their format-mandated tags, in tag order.
pub(crate) fn builtin_compressors() -> [(u8, Arc<dyn Compressor>); 8] {
    [
        (
            CompressionType::Snappy.tag(),
            Arc::new(snappy::SnappyCompressor) as Arc<dyn Compressor>,
        ),
        (CompressionType::Zlib.tag(), Arc::new(zlib::ZlibCompressor)),
        (
            CompressionType::BZip2.tag(),
            Arc::new(bzip2::Bzip2Compressor),
        ),
        (CompressionType::Lz4.tag(), Arc::new(lz4::Lz4Compressor)),
        (CompressionType::Lz4hc.tag(), Arc::new(lz4::Lz4hcCompressor)),
        (
            CompressionType::Xpress.tag(),
            Arc::new(xpress::XpressCompressor),
        ),
        (CompressionType::Zstd.tag(), Arc::new(zstd::ZstdCompressor)),
        (
            CompressionType::ZstdNotFinal.tag(),
            Arc::new(zstd::ZstdNotFinalCompressor::new()),
        ),
    ]
}

/// Reads the 8-byte little-endian original-length prefix used by block
/// codecs at [`LENGTH_PREFIX_FORMAT_VERSION`] and later.
pub(crate) fn split_length_prefix(input: &[u8]) -> Option<(u64, &[u8])> {
    if input.len() < 8 {
        return None;
    }
    let (prefix, rest) = input.split_at(8);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(prefix);
    Some((u64::from_le_bytes(raw), rest))
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared scaffolding for codec round-trip tests.

    use crate::allocator::MemoryAllocator;
    use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
    use crate::context::{CompressionContext, UncompressionContext};
    use crate::dict::{CompressionDict, UncompressionDict};
    use crate::options::CompressionOptions;
    use crate::registry::CompressorRegistry;

    /// Compresses and uncompresses `input` through codec value objects
    /// built from `registry`, asserting the round trip.
    pub fn roundtrip(registry: &CompressorRegistry, tag: u8, format_version: u32, input: &[u8]) {
        roundtrip_with_dict(registry, tag, format_version, input, &[]);
    }

    /// Round trip with a shared dictionary on both sides.
    pub fn roundtrip_with_dict(
        registry: &CompressorRegistry,
        tag: u8,
        format_version: u32,
        input: &[u8],
        dict: &[u8],
    ) {
        let compressor = registry.get_compressor(tag).expect("codec registered");
        let opts = CompressionOptions::default();
        let cctx = CompressionContext::new(registry, tag);
        let cdict = CompressionDict::new(registry, dict.to_vec(), tag, None);
        let info = CompressionInfo::new(&opts, &cctx, &cdict, tag, 0);

        let mut compressed = Vec::new();
        compressor
            .compress(&info, format_version, input, &mut compressed)
            .expect("compress");

        let uctx = UncompressionContext::new(registry, tag);
        let udict = UncompressionDict::new(registry, dict.to_vec(), tag);
        let uinfo = UncompressionInfo::new(&uctx, &udict, tag);
        let output = compressor
            .uncompress(&uinfo, format_version, &compressed, None)
            .expect("uncompress");
        assert_eq!(output.as_slice(), input);
    }

    /// Round trip through a caller-supplied allocator.
    pub fn roundtrip_with_allocator(
        registry: &CompressorRegistry,
        tag: u8,
        input: &[u8],
        allocator: &dyn MemoryAllocator,
    ) {
        let compressor = registry.get_compressor(tag).expect("codec registered");
        let opts = CompressionOptions::default();
        let cctx = CompressionContext::new(registry, tag);
        let info = CompressionInfo::new(&opts, &cctx, CompressionDict::empty(), tag, 0);

        let mut compressed = Vec::new();
        compressor
            .compress(&info, 2, input, &mut compressed)
            .expect("compress");

        let uctx = UncompressionContext::new(registry, tag);
        let uinfo = UncompressionInfo::new(&uctx, UncompressionDict::empty(), tag);
        let output = compressor
            .uncompress(&uinfo, 2, &compressed, Some(allocator))
            .expect("uncompress");
        assert_eq!(output.as_slice(), input);
    }
}

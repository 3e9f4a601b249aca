//! The codec trait every compression algorithm implements.
//!
//! Algorithms come in very different shapes: Snappy is stateless, Zstd
//! keeps per-worker contexts and digested dictionaries, plugins may do
//! anything. The trait keeps that state opaque: codecs hand back
//! type-erased boxes and later downcast only their own types, so a
//! handle is always released by the drop glue of the codec that
//! produced it.

use std::any::Any;

use crate::allocator::{CacheAllocation, MemoryAllocator};
use crate::context::{CompressionContext, UncompressionContext};
use crate::dict::{CompressionDict, UncompressionDict};
use crate::error::CompressionResult;
use crate::options::CompressionOptions;

/// Codec-produced digested dictionary, stored inside a dictionary
/// value object. The concrete type is private to the codec.
pub type DigestedDict = Box<dyn Any + Send + Sync>;

/// Codec-produced per-worker scratch, stored inside a context value
/// object. The concrete type is private to the codec; interior
/// mutability lives inside the box, never in codec fields.
pub type CodecContext = Box<dyn Any + Send>;

/// Immutable view bundling everything one compress call needs.
///
/// Plain aggregate of borrows; its lifetime is a subset of every
/// referenced object's lifetime.
#[derive(Clone, Copy)]
pub struct CompressionInfo<'a> {
    opts: &'a CompressionOptions,
    context: &'a CompressionContext,
    dict: &'a CompressionDict,
    tag: u8,
    sample_for_compression: u64,
}

impl<'a> CompressionInfo<'a> {
    /// Bundles options, context and dictionary for one compress call.
    pub fn new(
        opts: &'a CompressionOptions,
        context: &'a CompressionContext,
        dict: &'a CompressionDict,
        tag: u8,
        sample_for_compression: u64,
    ) -> Self {
        Self {
            opts,
            context,
            dict,
            tag,
            sample_for_compression,
        }
    }

    /// The compression options.
    pub fn options(&self) -> &CompressionOptions {
        self.opts
    }

    /// The per-worker compression context.
    pub fn context(&self) -> &CompressionContext {
        self.context
    }

    /// The compression dictionary (possibly the empty singleton).
    pub fn dict(&self) -> &CompressionDict {
        self.dict
    }

    /// The on-disk tag this call compresses for.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Sampling threshold forwarded from the block builder.
    pub fn sample_for_compression(&self) -> u64 {
        self.sample_for_compression
    }
}

/// Immutable view bundling everything one uncompress call needs.
#[derive(Clone, Copy)]
pub struct UncompressionInfo<'a> {
    context: &'a UncompressionContext,
    dict: &'a UncompressionDict,
    tag: u8,
}

impl<'a> UncompressionInfo<'a> {
    /// Bundles context and dictionary for one uncompress call.
    pub fn new(context: &'a UncompressionContext, dict: &'a UncompressionDict, tag: u8) -> Self {
        Self { context, dict, tag }
    }

    /// The per-worker uncompression context.
    pub fn context(&self) -> &UncompressionContext {
        self.context
    }

    /// The uncompression dictionary (possibly the empty singleton).
    pub fn dict(&self) -> &UncompressionDict {
        self.dict
    }

    /// The on-disk tag the input was compressed with.
    pub fn tag(&self) -> u8 {
        self.tag
    }
}

/// Interface each compression algorithm implements.
///
/// A single codec instance serves concurrent compress and uncompress
/// calls from distinct threads, provided each call brings its own
/// dictionary and context value objects.
pub trait Compressor: Send + Sync {
    /// Unique, stable name. Used in the options string and for
    /// registry lookups.
    fn name(&self) -> &'static str;

    /// Whether the codec can run in this environment. Codecs whose
    /// backing library is conditionally compiled out return `false`.
    fn supported(&self) -> bool {
        true
    }

    /// Whether [`process_compression_dict`] and
    /// [`process_uncompression_dict`] produce anything useful.
    ///
    /// [`process_compression_dict`]: Compressor::process_compression_dict
    /// [`process_uncompression_dict`]: Compressor::process_uncompression_dict
    fn dict_compression_supported(&self) -> bool {
        false
    }

    /// Compress `input`, appending the result to `output`. Callers may
    /// pre-reserve capacity. `format_version` selects the compressed
    /// block layout and is interpreted by the codec alone.
    fn compress(
        &self,
        info: &CompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()>;

    /// Uncompress `input` into a buffer obtained from `allocator` (or
    /// the heap when absent). The returned allocation carries the
    /// decoded length and transfers ownership to the caller.
    fn uncompress(
        &self,
        info: &UncompressionInfo<'_>,
        format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation>;

    /// Pre-compute the digested form of a raw compression dictionary.
    /// Codecs without dictionary support return `None`.
    fn process_compression_dict(&self, dict: &[u8], level: Option<i32>) -> Option<DigestedDict> {
        let _ = (dict, level);
        None
    }

    /// Pre-compute the digested form of a raw uncompression dictionary.
    fn process_uncompression_dict(&self, dict: &[u8]) -> Option<DigestedDict> {
        let _ = dict;
        None
    }

    /// Memory consumed by a digested uncompression dictionary this
    /// codec produced earlier.
    fn uncompression_dict_memory_usage(&self, dict: &DigestedDict) -> usize {
        let _ = dict;
        0
    }

    /// Allocate per-worker compression scratch, if the codec needs any.
    fn create_compression_context(&self) -> Option<CodecContext> {
        None
    }

    /// Allocate per-worker uncompression scratch, if the codec needs any.
    fn create_uncompression_context(&self) -> Option<CodecContext> {
        None
    }
}

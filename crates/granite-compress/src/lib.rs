#![warn(missing_docs)]

//! Granite compression subsystem: pluggable block codecs, the
//! tag-numbered compressor registry, and the dynamic plugin loader.
//!
//! Write path: block builder -> registry lookup by tag -> codec.compress
//! Read path:  stored tag -> registry lookup -> codec.uncompress
//!
//! Built-in codecs occupy the tags the on-disk format reserves for
//! them; user codecs register at process start (in code) or are
//! discovered as dynamic modules in a plugins directory.

pub mod allocator;
pub mod codecs;
pub mod compressor;
pub mod context;
pub mod dict;
pub mod env;
pub mod error;
pub mod options;
pub mod registry;
pub mod types;

pub use allocator::{allocate_output, CacheAllocation, DefaultAllocator, MemoryAllocator};
pub use codecs::rle::SimpleRleCompressor;
pub use codecs::LENGTH_PREFIX_FORMAT_VERSION;
pub use compressor::{
    CodecContext, CompressionInfo, Compressor, DigestedDict, UncompressionInfo,
};
pub use context::{CompressionContext, UncompressionContext};
pub use dict::{CompressionDict, UncompressionDict};
pub use env::{CodeModule, CreateCompressorFn, DefaultEnv, Env, COMPRESSOR_FACTORY_SYMBOL};
pub use error::{CompressionError, CompressionResult};
pub use options::CompressionOptions;
pub use registry::{
    CompressorRegistry, DISABLE_OPTION_NAME, NO_COMPRESSION_NAME,
};
pub use types::{is_reserved_tag, CompressionType, FIRST_CUSTOM_TYPE, MAX_COMPRESSOR_TYPE};

//! Per-worker compression and uncompression contexts.
//!
//! A context owns whatever scratch the codec at a given tag wants to
//! reuse across calls (e.g. a Zstd compression context). The engine
//! keeps one per worker thread; two contexts built from the same codec
//! hold independent scratch, which is what makes lock-free concurrent
//! compression possible.

use std::any::Any;
use std::sync::Arc;

use crate::compressor::{CodecContext, Compressor};
use crate::registry::CompressorRegistry;

/// Scratch for one compressing worker. Not cloneable; released on drop.
pub struct CompressionContext {
    context: Option<CodecContext>,
    compressor: Option<Arc<dyn Compressor>>,
}

impl CompressionContext {
    /// Builds a context for the codec registered at `tag`. When no
    /// codec is registered, or the codec is stateless, the context is
    /// empty and construction still succeeds.
    pub fn new(registry: &CompressorRegistry, tag: u8) -> Self {
        let compressor = registry.get_compressor(tag);
        let context = compressor
            .as_ref()
            .and_then(|c| c.create_compression_context());
        Self {
            context,
            compressor,
        }
    }

    /// Downcasts the scratch to a codec's concrete context type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.context.as_ref().and_then(|c| c.downcast_ref::<T>())
    }

    /// The codec that produced this context.
    pub fn compressor(&self) -> Option<&Arc<dyn Compressor>> {
        self.compressor.as_ref()
    }
}

/// Scratch for one uncompressing worker. Not cloneable; released on drop.
pub struct UncompressionContext {
    context: Option<CodecContext>,
    compressor: Option<Arc<dyn Compressor>>,
}

impl UncompressionContext {
    /// Builds a context for the codec registered at `tag`; see
    /// [`CompressionContext::new`].
    pub fn new(registry: &CompressorRegistry, tag: u8) -> Self {
        let compressor = registry.get_compressor(tag);
        let context = compressor
            .as_ref()
            .and_then(|c| c.create_uncompression_context());
        Self {
            context,
            compressor,
        }
    }

    /// Downcasts the scratch to a codec's concrete context type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.context.as_ref().and_then(|c| c.downcast_ref::<T>())
    }

    /// The codec that produced this context.
    pub fn compressor(&self) -> Option<&Arc<dyn Compressor>> {
        self.compressor.as_ref()
    }
}

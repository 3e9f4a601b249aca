//! Dictionary value objects.
//!
//! A dictionary owns its raw bytes plus an optional codec-produced
//! digested form (e.g. Zstd's digested dictionaries). The producing
//! codec is retained alongside the digested handle so that teardown
//! order stays predictable even if the codec is later removed from the
//! registry; codecs never reference dictionaries, so no cycle exists.

use std::any::Any;
use std::sync::Arc;

use crate::allocator::CacheAllocation;
use crate::compressor::{Compressor, DigestedDict};
use crate::registry::CompressorRegistry;

/// Raw + digested dictionary used on the compression side.
///
/// Constructed once per column family and shared read-only between
/// block builders. Not cloneable: digested handles are not cheaply
/// duplicable.
pub struct CompressionDict {
    raw: Vec<u8>,
    digested: Option<DigestedDict>,
    compressor: Option<Arc<dyn Compressor>>,
}

impl CompressionDict {
    /// Builds a dictionary for the codec registered at `tag`.
    ///
    /// When no codec is registered at `tag`, or the codec does not
    /// support dictionaries, the raw bytes are kept and no digested
    /// form is produced. Construction never fails.
    pub fn new(
        registry: &CompressorRegistry,
        dict: Vec<u8>,
        tag: u8,
        level: Option<i32>,
    ) -> Self {
        let compressor = registry.get_compressor(tag);
        let digested = compressor
            .as_ref()
            .and_then(|c| c.process_compression_dict(&dict, level));
        Self {
            raw: dict,
            digested,
            compressor,
        }
    }

    /// The shared empty dictionary. No allocation, no digested form.
    pub fn empty() -> &'static CompressionDict {
        static EMPTY: CompressionDict = CompressionDict {
            raw: Vec::new(),
            digested: None,
            compressor: None,
        };
        &EMPTY
    }

    /// The raw dictionary bytes.
    pub fn raw_dict(&self) -> &[u8] {
        &self.raw
    }

    /// The digested form, if the codec produced one.
    pub fn digested(&self) -> Option<&DigestedDict> {
        self.digested.as_ref()
    }

    /// Downcasts the digested form to a codec's concrete type.
    pub fn digested_as<T: Any>(&self) -> Option<&T> {
        self.digested.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    /// The codec that produced the digested form.
    pub fn compressor(&self) -> Option<&Arc<dyn Compressor>> {
        self.compressor.as_ref()
    }
}

/// Backing storage for uncompression dictionary bytes.
///
/// Either a heap copy or a buffer handed out by the engine's block
/// cache allocator. Both variants own their bytes; a dictionary view
/// therefore always outlives its consumers.
enum DictBacking {
    Owned(Vec<u8>),
    Allocation(CacheAllocation),
}

/// Raw + digested dictionary used on the uncompression side.
///
/// Moveable (ownership transfer), not cloneable. Moving transfers the
/// backing bytes and the digested handle; the source releases nothing
/// on drop.
pub struct UncompressionDict {
    backing: DictBacking,
    digested: Option<DigestedDict>,
    compressor: Option<Arc<dyn Compressor>>,
}

impl UncompressionDict {
    /// Builds a dictionary from a heap copy of the bytes.
    pub fn new(registry: &CompressorRegistry, dict: Vec<u8>, tag: u8) -> Self {
        let compressor = registry.get_compressor(tag);
        let digested = compressor
            .as_ref()
            .and_then(|c| c.process_uncompression_dict(&dict));
        Self {
            backing: DictBacking::Owned(dict),
            digested,
            compressor,
        }
    }

    /// Builds a dictionary backed by a block-cache allocation, e.g.
    /// when the dictionary block was just read from disk into the
    /// cache.
    pub fn from_allocation(
        registry: &CompressorRegistry,
        allocation: CacheAllocation,
        tag: u8,
    ) -> Self {
        let compressor = registry.get_compressor(tag);
        let digested = compressor
            .as_ref()
            .and_then(|c| c.process_uncompression_dict(allocation.as_slice()));
        Self {
            backing: DictBacking::Allocation(allocation),
            digested,
            compressor,
        }
    }

    /// The shared empty dictionary.
    pub fn empty() -> &'static UncompressionDict {
        static EMPTY: UncompressionDict = UncompressionDict {
            backing: DictBacking::Owned(Vec::new()),
            digested: None,
            compressor: None,
        };
        &EMPTY
    }

    /// View of the live dictionary bytes, whichever backing is in use.
    pub fn slice(&self) -> &[u8] {
        match &self.backing {
            DictBacking::Owned(v) => v,
            DictBacking::Allocation(a) => a.as_slice(),
        }
    }

    /// Whether this object owns its bytes. Always true: both backing
    /// variants are owning.
    pub fn own_bytes(&self) -> bool {
        true
    }

    /// The digested form, if the codec produced one.
    pub fn digested(&self) -> Option<&DigestedDict> {
        self.digested.as_ref()
    }

    /// Downcasts the digested form to a codec's concrete type.
    pub fn digested_as<T: Any>(&self) -> Option<&T> {
        self.digested.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    /// The codec that produced the digested form.
    pub fn compressor(&self) -> Option<&Arc<dyn Compressor>> {
        self.compressor.as_ref()
    }

    /// Struct overhead + owned bytes + allocator-reported usable size
    /// + codec-reported size of the digested form.
    pub fn approximate_memory_usage(&self) -> usize {
        let mut usage = std::mem::size_of::<UncompressionDict>();
        usage += match &self.backing {
            DictBacking::Owned(v) => v.len(),
            DictBacking::Allocation(a) => a.usable_size(),
        };
        if let (Some(compressor), Some(digested)) = (&self.compressor, &self.digested) {
            usage += compressor.uncompression_dict_memory_usage(digested);
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CacheAllocation;
    use crate::types::CompressionType;

    #[test]
    fn test_empty_dicts_are_shared_and_empty() {
        assert!(CompressionDict::empty().raw_dict().is_empty());
        assert!(CompressionDict::empty().digested().is_none());
        assert!(UncompressionDict::empty().slice().is_empty());
        assert!(std::ptr::eq(CompressionDict::empty(), CompressionDict::empty()));
    }

    #[test]
    fn test_missing_codec_means_no_processing() {
        let registry = CompressorRegistry::new();
        // No codec lives at the first custom tag in a fresh registry.
        let dict = CompressionDict::new(&registry, b"samples".to_vec(), 0x41, None);
        assert_eq!(dict.raw_dict(), b"samples");
        assert!(dict.digested().is_none());
        assert!(dict.compressor().is_none());
    }

    #[test]
    fn test_zstd_dict_is_digested() {
        let registry = CompressorRegistry::new();
        let raw = b"granite dictionary sample granite dictionary sample".to_vec();
        let dict = CompressionDict::new(&registry, raw.clone(), CompressionType::Zstd.tag(), None);
        assert_eq!(dict.raw_dict(), raw.as_slice());
        assert!(dict.digested().is_some());
        assert_eq!(dict.compressor().unwrap().name(), "ZSTD");

        let udict = UncompressionDict::new(&registry, raw.clone(), CompressionType::Zstd.tag());
        assert!(udict.digested().is_some());
        assert!(udict.approximate_memory_usage() > raw.len());
    }

    #[test]
    fn test_allocation_backed_dict() {
        let registry = CompressorRegistry::new();
        let alloc = CacheAllocation::copy_from_slice(b"dict-bytes", None).unwrap();
        let dict = UncompressionDict::from_allocation(&registry, alloc, CompressionType::Lz4.tag());
        assert_eq!(dict.slice(), b"dict-bytes");
        assert!(dict.own_bytes());
    }

    #[test]
    fn test_move_transfers_ownership() {
        let registry = CompressorRegistry::new();
        let dict = UncompressionDict::new(&registry, b"abc".to_vec(), CompressionType::Zstd.tag());
        let moved = dict;
        assert_eq!(moved.slice(), b"abc");
    }
}

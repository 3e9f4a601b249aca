//! Output-buffer allocation for uncompression.
//!
//! Decompressed blocks usually land in the engine's block cache, so the
//! cache supplies the allocator and codecs write straight into the
//! buffer it hands out. Without an allocator the plain heap is used.

use std::fmt;

use crate::error::{CompressionError, CompressionResult};

/// Abstraction over the engine's block-buffer allocator.
///
/// Implementations may be backed by an arena, a size-class pool, or a
/// cache with a memory budget. Returning `None` from [`allocate`]
/// signals that the budget is exhausted and surfaces to callers as
/// [`CompressionError::MemoryLimit`].
///
/// [`allocate`]: MemoryAllocator::allocate
pub trait MemoryAllocator: Send + Sync + fmt::Debug {
    /// Allocate a zeroed buffer of `len` bytes, or `None` when the
    /// allocator's limit is reached.
    fn allocate(&self, len: usize) -> Option<Box<[u8]>>;

    /// The number of bytes actually consumed by an allocation of `len`
    /// bytes. Size-class allocators round up.
    fn usable_size(&self, len: usize) -> usize {
        len
    }

    /// Identifier for diagnostics.
    fn name(&self) -> &'static str;
}

/// Plain heap allocator used when the engine does not supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl MemoryAllocator for DefaultAllocator {
    fn allocate(&self, len: usize) -> Option<Box<[u8]>> {
        Some(vec![0u8; len].into_boxed_slice())
    }

    fn name(&self) -> &'static str {
        "DefaultAllocator"
    }
}

/// An output buffer produced by uncompression.
///
/// Owns the backing buffer, the decoded length (which may be shorter
/// than the buffer) and the allocator-reported usable size. Ownership
/// transfers to the caller; the buffer is released on drop.
pub struct CacheAllocation {
    buf: Box<[u8]>,
    len: usize,
    usable: usize,
}

impl CacheAllocation {
    /// Wraps a buffer allocated elsewhere.
    pub fn new(buf: Box<[u8]>, len: usize, usable: usize) -> Self {
        debug_assert!(len <= buf.len());
        Self { buf, len, usable }
    }

    /// Takes ownership of a heap vector; the decoded length is the
    /// vector length.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            buf: data.into_boxed_slice(),
            len,
            usable: len,
        }
    }

    /// Copies `data` into a fresh allocation from `allocator` (or the
    /// heap when absent).
    pub fn copy_from_slice(
        data: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<Self> {
        let mut out = allocate_output(data.len(), allocator)?;
        out.as_mut_slice()[..data.len()].copy_from_slice(data);
        Ok(out)
    }

    /// The decoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The whole backing buffer, for codecs that decode in place.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Decoded length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the decoded output is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shrinks the decoded length after an in-place decode.
    pub fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.buf.len());
        self.len = len.min(self.buf.len());
    }

    /// Allocator-reported bytes consumed by this buffer.
    pub fn usable_size(&self) -> usize {
        self.usable
    }

    /// Consumes the allocation, returning the decoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        let mut v = self.buf.into_vec();
        v.truncate(self.len);
        v
    }
}

impl fmt::Debug for CacheAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAllocation")
            .field("len", &self.len)
            .field("capacity", &self.buf.len())
            .field("usable", &self.usable)
            .finish()
    }
}

/// Allocates an output buffer of `len` bytes via `allocator`, falling
/// back to the heap when no allocator is supplied.
pub fn allocate_output(
    len: usize,
    allocator: Option<&dyn MemoryAllocator>,
) -> CompressionResult<CacheAllocation> {
    match allocator {
        Some(a) => {
            let buf = a
                .allocate(len)
                .ok_or(CompressionError::MemoryLimit { requested: len })?;
            Ok(CacheAllocation::new(buf, len, a.usable_size(len)))
        }
        None => Ok(CacheAllocation::from_vec(vec![0u8; len])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Allocator that refuses everything, for exercising the
    /// MemoryLimit path.
    #[derive(Debug)]
    struct ExhaustedAllocator;

    impl MemoryAllocator for ExhaustedAllocator {
        fn allocate(&self, _len: usize) -> Option<Box<[u8]>> {
            None
        }

        fn name(&self) -> &'static str {
            "ExhaustedAllocator"
        }
    }

    #[test]
    fn test_default_allocator_roundtrip() {
        let alloc = allocate_output(16, Some(&DefaultAllocator)).unwrap();
        assert_eq!(alloc.len(), 16);
        assert_eq!(alloc.usable_size(), 16);
        assert_eq!(alloc.as_slice(), &[0u8; 16]);
    }

    #[test]
    fn test_copy_from_slice() {
        let alloc = CacheAllocation::copy_from_slice(b"granite", None).unwrap();
        assert_eq!(alloc.as_slice(), b"granite");
        assert_eq!(alloc.into_vec(), b"granite".to_vec());
    }

    #[test]
    fn test_set_len_truncates_view() {
        let mut alloc = allocate_output(8, None).unwrap();
        alloc.as_mut_slice()[..3].copy_from_slice(b"abc");
        alloc.set_len(3);
        assert_eq!(alloc.as_slice(), b"abc");
    }

    #[test]
    fn test_exhausted_allocator_reports_memory_limit() {
        let err = allocate_output(64, Some(&ExhaustedAllocator)).unwrap_err();
        assert!(matches!(
            err,
            CompressionError::MemoryLimit { requested: 64 }
        ));
    }
}

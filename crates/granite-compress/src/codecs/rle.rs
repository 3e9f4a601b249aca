//! Reference run-length codec.
//!
//! Used by the test suite and as the worked example for the plugin
//! factory contract. It compresses long runs well enough to pass the
//! block builder's compression-ratio check, and counts its calls so
//! tests can assert the engine actually went through it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::allocator::{CacheAllocation, MemoryAllocator};
use crate::compressor::{CompressionInfo, Compressor, UncompressionInfo};
use crate::error::CompressionResult;

const DELIM: u8 = b'~';

/// Simple RLE codec.
///
/// A run of `N` copies of byte `B` becomes `DELIM, N, B` when long
/// enough to pay for the escape; short runs stay literal, with a
/// literal `DELIM` doubled so decoding stays unambiguous.
#[derive(Debug, Default)]
pub struct SimpleRleCompressor {
    num_compress_calls: AtomicU64,
    num_uncompress_calls: AtomicU64,
}

impl SimpleRleCompressor {
    /// Creates a codec with zeroed call counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compress calls served by this instance.
    pub fn num_compress_calls(&self) -> u64 {
        self.num_compress_calls.load(Ordering::Relaxed)
    }

    /// Number of uncompress calls served by this instance.
    pub fn num_uncompress_calls(&self) -> u64 {
        self.num_uncompress_calls.load(Ordering::Relaxed)
    }

    fn output_run(last: u8, run: u8, output: &mut Vec<u8>) {
        if last != DELIM {
            if run >= 4 {
                output.extend_from_slice(&[DELIM, run, last]);
            } else {
                output.extend(std::iter::repeat(last).take(run as usize));
            }
        } else if run >= 2 {
            output.extend_from_slice(&[DELIM, run, last]);
        } else {
            // Literal delimiters are doubled so the decoder can tell
            // them from escapes.
            output.extend(std::iter::repeat(DELIM).take(run as usize * 2));
        }
    }
}

impl Compressor for SimpleRleCompressor {
    fn name(&self) -> &'static str {
        "SimpleRLECompressor"
    }

    fn compress(
        &self,
        _info: &CompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> CompressionResult<()> {
        if let Some(&first) = input.first() {
            let mut last = first;
            let mut run: u8 = 0;
            for &byte in input {
                if byte == last && run < DELIM - 1 {
                    run += 1;
                } else {
                    Self::output_run(last, run, output);
                    run = 1;
                }
                last = byte;
            }
            Self::output_run(last, run, output);
        }
        self.num_compress_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn uncompress(
        &self,
        _info: &UncompressionInfo<'_>,
        _format_version: u32,
        input: &[u8],
        allocator: Option<&dyn MemoryAllocator>,
    ) -> CompressionResult<CacheAllocation> {
        let mut decoded = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < input.len() {
            if i + 1 < input.len() && input[i] == DELIM && input[i + 1] == DELIM {
                decoded.push(DELIM);
                i += 2;
            } else if i + 2 < input.len() && input[i] == DELIM {
                decoded.extend(std::iter::repeat(input[i + 2]).take(input[i + 1] as usize));
                i += 3;
            } else {
                decoded.push(input[i]);
                i += 1;
            }
        }
        let out = CacheAllocation::copy_from_slice(&decoded, allocator)?;
        self.num_uncompress_calls.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }
}

/// Plugin factory, exported under the name every plugin module must
/// provide. Building this crate as a dynamic module makes the RLE
/// codec loadable through the registry's plugin path.
#[allow(non_snake_case)]
#[no_mangle]
pub fn CreateCompressor() -> Box<dyn Compressor> {
    Box::new(SimpleRleCompressor::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{CompressionInfo, UncompressionInfo};
    use crate::context::{CompressionContext, UncompressionContext};
    use crate::dict::{CompressionDict, UncompressionDict};
    use crate::options::CompressionOptions;
    use crate::registry::CompressorRegistry;

    fn compress(codec: &SimpleRleCompressor, registry: &CompressorRegistry, input: &[u8]) -> Vec<u8> {
        let opts = CompressionOptions::default();
        let ctx = CompressionContext::new(registry, 0x41);
        let info = CompressionInfo::new(&opts, &ctx, CompressionDict::empty(), 0x41, 0);
        let mut out = Vec::new();
        codec.compress(&info, 2, input, &mut out).unwrap();
        out
    }

    fn uncompress(
        codec: &SimpleRleCompressor,
        registry: &CompressorRegistry,
        input: &[u8],
    ) -> Vec<u8> {
        let ctx = UncompressionContext::new(registry, 0x41);
        let info = UncompressionInfo::new(&ctx, UncompressionDict::empty(), 0x41);
        codec.uncompress(&info, 2, input, None).unwrap().into_vec()
    }

    #[test]
    fn test_rle_expected_encoding() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        let compressed = compress(&codec, &registry, b"aaaaaaaaaabbbbbbbbbb");
        assert_eq!(compressed, b"~\na~\nb");
        assert_eq!(codec.num_compress_calls(), 1);

        let decoded = uncompress(&codec, &registry, &compressed);
        assert_eq!(decoded, b"aaaaaaaaaabbbbbbbbbb");
        assert_eq!(codec.num_uncompress_calls(), 1);
    }

    #[test]
    fn test_rle_short_runs_stay_literal() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        let compressed = compress(&codec, &registry, b"abcabc");
        assert_eq!(compressed, b"abcabc");
        assert_eq!(uncompress(&codec, &registry, &compressed), b"abcabc");
    }

    #[test]
    fn test_rle_escapes_literal_delimiter() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        let compressed = compress(&codec, &registry, b"a~b");
        assert_eq!(compressed, b"a~~b");
        assert_eq!(uncompress(&codec, &registry, &compressed), b"a~b");
    }

    #[test]
    fn test_rle_delimiter_run() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        let compressed = compress(&codec, &registry, b"~~~~~");
        assert_eq!(compressed, &[DELIM, 5, DELIM]);
        assert_eq!(uncompress(&codec, &registry, &compressed), b"~~~~~");
    }

    #[test]
    fn test_rle_empty_input() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        assert!(compress(&codec, &registry, b"").is_empty());
        assert!(uncompress(&codec, &registry, b"").is_empty());
    }

    #[test]
    fn test_rle_long_run_splits_at_counter_limit() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        // Longer than the one-byte run counter can express.
        let input = vec![b'x'; 300];
        let compressed = compress(&codec, &registry, &input);
        assert!(compressed.len() < input.len());
        assert_eq!(uncompress(&codec, &registry, &compressed), input);
    }

    #[test]
    fn test_rle_ascii_roundtrip() {
        let registry = CompressorRegistry::new();
        let codec = SimpleRleCompressor::new();
        let input: Vec<u8> = (0u8..128).flat_map(|b| std::iter::repeat(b).take(7)).collect();
        let compressed = compress(&codec, &registry, &input);
        assert_eq!(uncompress(&codec, &registry, &compressed), input);
    }

    #[test]
    fn test_factory_contract() {
        let codec = CreateCompressor();
        assert_eq!(codec.name(), "SimpleRLECompressor");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_rle_roundtrip_ascii(data in prop::collection::vec(0u8..=127, 0..4096)) {
                let registry = CompressorRegistry::new();
                let codec = SimpleRleCompressor::new();
                let compressed = compress(&codec, &registry, &data);
                prop_assert_eq!(uncompress(&codec, &registry, &compressed), data);
            }
        }
    }
}

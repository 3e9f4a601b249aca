//! Single-file block-based table.
//!
//! Layout: data blocks, then a bincode-encoded properties section, a
//! bincode-encoded index, and a fixed-size footer. Each stored block is
//! `[payload][1-byte compression tag][4-byte CRC32]`; the tag is per
//! block because a block whose compressed form is no smaller than the
//! plain form falls back to being stored uncompressed.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use granite_compress::{
    CompressionContext, CompressionDict, CompressionInfo, CompressionOptions, CompressionType,
    CompressorRegistry, UncompressionContext, UncompressionDict, UncompressionInfo,
};

use crate::error::{TableError, TableResult};

/// Table file magic: "GRNTBL" packed into the footer.
pub const TABLE_MAGIC: u64 = 0x4752_4E54_424C_0001;

/// Current table format version, forwarded to codecs as the
/// compressed-block format version.
pub const TABLE_FORMAT_VERSION: u32 = 2;

/// Default uncompressed block size before a block is cut.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

const BLOCK_TRAILER_SIZE: u64 = 5;
const FOOTER_SIZE: u64 = 44;

/// Options for building a table.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Compression tag for data blocks; `0x00` stores blocks plain.
    pub compression: u8,
    /// Options handed to the codec on every compress call.
    pub compression_opts: CompressionOptions,
    /// Uncompressed bytes collected before a block is cut.
    pub block_size: usize,
    /// Sampling threshold forwarded in the compression info bundle.
    pub sample_for_compression: u64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::NoCompression.tag(),
            compression_opts: CompressionOptions::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            sample_for_compression: 0,
        }
    }
}

/// Properties stored with every table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProperties {
    /// Name of the codec the table was built with, resolved through
    /// the registry at build time. `"NoCompression"` when none.
    pub compression_name: String,
    /// Compression tag the table was built with.
    pub compression_tag: u8,
    /// Number of key-value entries.
    pub entry_count: u64,
    /// Number of data blocks.
    pub block_count: u64,
    /// Uncompressed data bytes.
    pub raw_data_bytes: u64,
    /// Stored (possibly compressed) data bytes, excluding trailers.
    pub stored_data_bytes: u64,
    /// Seconds since the epoch at which the table was finished.
    pub created_at_secs: u64,
}

/// Location of one data block inside the table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockHandle {
    offset: u64,
    /// Stored size including the block trailer.
    size: u64,
    /// First key in the block; handles are ordered by it.
    first_key: Vec<u8>,
}

/// Streaming builder for a table file. Keys must be added in sorted
/// order.
pub struct TableBuilder {
    file: File,
    options: TableOptions,
    registry: Arc<CompressorRegistry>,
    cctx: CompressionContext,
    offset: u64,
    index: Vec<BlockHandle>,
    pending: Vec<(Vec<u8>, Vec<u8>)>,
    pending_bytes: usize,
    properties: TableProperties,
}

impl TableBuilder {
    /// Creates a builder writing to `path`.
    pub fn new(
        path: &Path,
        options: TableOptions,
        registry: Arc<CompressorRegistry>,
    ) -> TableResult<Self> {
        let file = File::create(path)?;
        let compression_name = match registry.get_compressor(options.compression) {
            Some(c) => c.name().to_string(),
            None => granite_compress::NO_COMPRESSION_NAME.to_string(),
        };
        let cctx = CompressionContext::new(&registry, options.compression);
        let compression_tag = options.compression;
        Ok(Self {
            file,
            options,
            registry,
            cctx,
            offset: 0,
            index: Vec::new(),
            pending: Vec::new(),
            pending_bytes: 0,
            properties: TableProperties {
                compression_name,
                compression_tag,
                entry_count: 0,
                block_count: 0,
                raw_data_bytes: 0,
                stored_data_bytes: 0,
                created_at_secs: 0,
            },
        })
    }

    /// Adds an entry. Keys must arrive in ascending order.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> TableResult<()> {
        self.pending_bytes += key.len() + value.len();
        self.pending.push((key.to_vec(), value.to_vec()));
        self.properties.entry_count += 1;
        if self.pending_bytes >= self.options.block_size {
            self.emit_block()?;
        }
        Ok(())
    }

    /// Writes the final block, properties, index and footer, returning
    /// the table's properties.
    pub fn finish(mut self) -> TableResult<TableProperties> {
        if !self.pending.is_empty() {
            self.emit_block()?;
        }
        self.properties.created_at_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let props_bytes = bincode::serialize(&self.properties)
            .map_err(|e| TableError::Serialization(e.to_string()))?;
        let index_bytes = bincode::serialize(&self.index)
            .map_err(|e| TableError::Serialization(e.to_string()))?;

        let props_offset = self.offset;
        self.file.write_all(&props_bytes)?;
        let index_offset = props_offset + props_bytes.len() as u64;
        self.file.write_all(&index_bytes)?;

        let mut footer = Vec::with_capacity(FOOTER_SIZE as usize);
        footer.extend_from_slice(&props_offset.to_le_bytes());
        footer.extend_from_slice(&(props_bytes.len() as u64).to_le_bytes());
        footer.extend_from_slice(&index_offset.to_le_bytes());
        footer.extend_from_slice(&(index_bytes.len() as u64).to_le_bytes());
        footer.extend_from_slice(&TABLE_FORMAT_VERSION.to_le_bytes());
        footer.extend_from_slice(&TABLE_MAGIC.to_le_bytes());
        self.file.write_all(&footer)?;
        self.file.sync_all()?;

        debug!(
            entries = self.properties.entry_count,
            blocks = self.properties.block_count,
            compression = %self.properties.compression_name,
            "table finished"
        );
        Ok(self.properties)
    }

    fn emit_block(&mut self) -> TableResult<()> {
        let plain = bincode::serialize(&self.pending)
            .map_err(|e| TableError::Serialization(e.to_string()))?;
        let (payload, tag) = self.maybe_compress(&plain)?;

        let first_key = self.pending[0].0.clone();
        let mut stored = payload;
        stored.push(tag);
        let crc = crc32fast::hash(&stored);
        stored.extend_from_slice(&crc.to_le_bytes());

        self.file.write_all(&stored)?;
        self.index.push(BlockHandle {
            offset: self.offset,
            size: stored.len() as u64,
            first_key,
        });
        self.offset += stored.len() as u64;
        self.properties.block_count += 1;
        self.properties.raw_data_bytes += plain.len() as u64;
        self.properties.stored_data_bytes += stored.len() as u64 - BLOCK_TRAILER_SIZE;
        self.pending.clear();
        self.pending_bytes = 0;
        Ok(())
    }

    /// Compresses a block through the configured codec, falling back
    /// to plain storage when no codec is available, the codec fails,
    /// or compression does not shrink the block.
    fn maybe_compress(&self, plain: &[u8]) -> TableResult<(Vec<u8>, u8)> {
        let tag = self.options.compression;
        if tag == CompressionType::NoCompression.tag()
            || tag == CompressionType::Disabled.tag()
        {
            return Ok((plain.to_vec(), CompressionType::NoCompression.tag()));
        }
        let compressor = match self.registry.get_compressor(tag) {
            Some(c) if c.supported() => c,
            _ => {
                warn!(tag, "no usable compressor for tag, storing block plain");
                return Ok((plain.to_vec(), CompressionType::NoCompression.tag()));
            }
        };
        let info = CompressionInfo::new(
            &self.options.compression_opts,
            &self.cctx,
            CompressionDict::empty(),
            tag,
            self.options.sample_for_compression,
        );
        let mut compressed = Vec::with_capacity(plain.len() / 2);
        match compressor.compress(&info, TABLE_FORMAT_VERSION, plain, &mut compressed) {
            Ok(()) if compressed.len() < plain.len() => Ok((compressed, tag)),
            Ok(()) => Ok((plain.to_vec(), CompressionType::NoCompression.tag())),
            Err(e) => {
                warn!(tag, error = %e, "compression failed, storing block plain");
                Ok((plain.to_vec(), CompressionType::NoCompression.tag()))
            }
        }
    }
}

/// A read-only open table.
pub struct Table {
    file: File,
    properties: TableProperties,
    index: Vec<BlockHandle>,
    registry: Arc<CompressorRegistry>,
    uctx: UncompressionContext,
}

impl Table {
    /// Opens and validates the table at `path`.
    pub fn open(path: &Path, registry: Arc<CompressorRegistry>) -> TableResult<Table> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < FOOTER_SIZE {
            return Err(TableError::Corruption {
                reason: format!("file too small for footer: {file_len} bytes"),
            });
        }

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let magic = u64::from_le_bytes(footer[36..44].try_into().unwrap());
        if magic != TABLE_MAGIC {
            return Err(TableError::Corruption {
                reason: format!("bad magic {magic:#x}"),
            });
        }
        let props_offset = u64::from_le_bytes(footer[0..8].try_into().unwrap());
        let props_len = u64::from_le_bytes(footer[8..16].try_into().unwrap());
        let index_offset = u64::from_le_bytes(footer[16..24].try_into().unwrap());
        let index_len = u64::from_le_bytes(footer[24..32].try_into().unwrap());

        let read_section = |offset: u64, len: u64| -> TableResult<Vec<u8>> {
            if offset.checked_add(len).map_or(true, |end| end > file_len) {
                return Err(TableError::Corruption {
                    reason: "section extends past end of file".to_string(),
                });
            }
            let mut buf = vec![0u8; len as usize];
            file.read_exact_at(&mut buf, offset)?;
            Ok(buf)
        };
        let properties: TableProperties = bincode::deserialize(&read_section(
            props_offset,
            props_len,
        )?)
        .map_err(|e| TableError::Serialization(e.to_string()))?;
        let index: Vec<BlockHandle> = bincode::deserialize(&read_section(index_offset, index_len)?)
            .map_err(|e| TableError::Serialization(e.to_string()))?;

        let uctx = UncompressionContext::new(&registry, properties.compression_tag);
        Ok(Table {
            file,
            properties,
            index,
            registry,
            uctx,
        })
    }

    /// The properties stored with this table.
    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    /// Looks up `key`, reading and decoding the candidate block.
    pub fn get(&self, key: &[u8]) -> TableResult<Option<Vec<u8>>> {
        // Last block whose first key is <= key.
        let candidate = self
            .index
            .partition_point(|h| h.first_key.as_slice() <= key);
        if candidate == 0 {
            return Ok(None);
        }
        let handle = &self.index[candidate - 1];
        let entries = self.read_block(handle)?;
        Ok(entries
            .binary_search_by(|(k, _)| k.as_slice().cmp(key))
            .ok()
            .map(|i| entries[i].1.clone()))
    }

    fn read_block(&self, handle: &BlockHandle) -> TableResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if handle.size < BLOCK_TRAILER_SIZE {
            return Err(TableError::Corruption {
                reason: "block smaller than its trailer".to_string(),
            });
        }
        let mut stored = vec![0u8; handle.size as usize];
        self.file.read_exact_at(&mut stored, handle.offset)?;

        let crc_start = stored.len() - 4;
        let expected = u32::from_le_bytes(stored[crc_start..].try_into().unwrap());
        let actual = crc32fast::hash(&stored[..crc_start]);
        if expected != actual {
            return Err(TableError::ChecksumMismatch { expected, actual });
        }

        let tag = stored[crc_start - 1];
        let payload = &stored[..crc_start - 1];
        let plain = self.decode_payload(tag, payload)?;
        bincode::deserialize(&plain).map_err(|e| TableError::Serialization(e.to_string()))
    }

    fn decode_payload(&self, tag: u8, payload: &[u8]) -> TableResult<Vec<u8>> {
        if tag == CompressionType::NoCompression.tag() {
            return Ok(payload.to_vec());
        }
        let compressor = self
            .registry
            .get_compressor(tag)
            .ok_or(TableError::UnknownCompression { tag })?;
        // The pooled context matches the table-wide tag; blocks that
        // fell back to another tag get a one-shot context.
        let fallback_ctx;
        let uctx = if tag == self.properties.compression_tag {
            &self.uctx
        } else {
            fallback_ctx = UncompressionContext::new(&self.registry, tag);
            &fallback_ctx
        };
        let info = UncompressionInfo::new(uctx, UncompressionDict::empty(), tag);
        let decoded = compressor.uncompress(&info, TABLE_FORMAT_VERSION, payload, None)?;
        Ok(decoded.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granite_compress::SimpleRleCompressor;

    fn build_table(
        dir: &Path,
        options: TableOptions,
        registry: &Arc<CompressorRegistry>,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> TableProperties {
        let path = dir.join("000001.gtb");
        let mut builder = TableBuilder::new(&path, options, Arc::clone(registry)).unwrap();
        for (k, v) in entries {
            builder.add(k, v).unwrap();
        }
        builder.finish().unwrap()
    }

    fn sample_entries(n: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        (0..n)
            .map(|i| {
                (
                    format!("key{i:06}").into_bytes(),
                    format!("value-{i:06}-").repeat(4).into_bytes(),
                )
            })
            .collect()
    }

    #[test]
    fn test_table_roundtrip_uncompressed() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(CompressorRegistry::new());
        let entries = sample_entries(100);
        let props = build_table(dir.path(), TableOptions::default(), &registry, &entries);
        assert_eq!(props.entry_count, 100);
        assert_eq!(props.compression_name, "NoCompression");

        let table = Table::open(&dir.path().join("000001.gtb"), registry).unwrap();
        for (k, v) in &entries {
            assert_eq!(table.get(k).unwrap().as_deref(), Some(v.as_slice()));
        }
        assert!(table.get(b"missing").unwrap().is_none());
        assert!(table.get(b"zzzz").unwrap().is_none());
    }

    #[test]
    fn test_table_roundtrip_zstd() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(CompressorRegistry::new());
        let options = TableOptions {
            compression: CompressionType::Zstd.tag(),
            ..TableOptions::default()
        };
        let entries = sample_entries(500);
        let props = build_table(dir.path(), options, &registry, &entries);
        assert_eq!(props.compression_name, "ZSTD");
        assert!(props.stored_data_bytes < props.raw_data_bytes);

        let table = Table::open(&dir.path().join("000001.gtb"), registry).unwrap();
        for (k, v) in entries.iter().step_by(7) {
            assert_eq!(table.get(k).unwrap().as_deref(), Some(v.as_slice()));
        }
    }

    #[test]
    fn test_table_custom_codec() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(CompressorRegistry::new());
        let tag = registry.add_compressor(Arc::new(SimpleRleCompressor::new()));
        let options = TableOptions {
            compression: tag,
            ..TableOptions::default()
        };
        let entries: Vec<_> = (0..50)
            .map(|i| (format!("k{i:04}").into_bytes(), vec![b'r'; 64]))
            .collect();
        let props = build_table(dir.path(), options, &registry, &entries);
        assert_eq!(props.compression_name, "SimpleRLECompressor");

        let table = Table::open(&dir.path().join("000001.gtb"), registry).unwrap();
        assert_eq!(table.properties().compression_tag, tag);
        assert_eq!(table.get(b"k0031").unwrap().unwrap(), vec![b'r'; 64]);
    }

    #[test]
    fn test_table_unknown_tag_plain_fallback() {
        // Building with an unregistered tag stores plain blocks.
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(CompressorRegistry::new());
        let options = TableOptions {
            compression: 0x55,
            ..TableOptions::default()
        };
        let entries = sample_entries(10);
        let props = build_table(dir.path(), options, &registry, &entries);
        assert_eq!(props.compression_name, "NoCompression");

        let table = Table::open(&dir.path().join("000001.gtb"), registry).unwrap();
        assert_eq!(
            table.get(entries[3].0.as_slice()).unwrap().as_deref(),
            Some(entries[3].1.as_slice())
        );
    }

    #[test]
    fn test_table_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gtb");
        std::fs::write(&path, b"short").unwrap();
        let registry = Arc::new(CompressorRegistry::new());
        assert!(matches!(
            Table::open(&path, registry),
            Err(TableError::Corruption { .. })
        ));
    }
}

//! Tiny database facade over the block table.
//!
//! A memtable absorbs writes; `flush` turns it into an immutable table
//! file. Enough machinery to run the engine's compression path end to
//! end, nothing more.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use granite_compress::{CompressionType, CompressorRegistry, DISABLE_OPTION_NAME};

use crate::error::{TableError, TableResult};
use crate::table::{Table, TableBuilder, TableOptions, TableProperties};

const TABLE_EXTENSION: &str = "gtb";

/// Options for opening a database.
#[derive(Debug, Clone, Default)]
pub struct DbOptions {
    /// Table building options, including the compression tag.
    pub table: TableOptions,
}

impl DbOptions {
    /// Sets the compression tag directly.
    pub fn with_compression(mut self, tag: u8) -> Self {
        self.table.compression = tag;
        self
    }

    /// Resolves `compression=<name>` the way the options parser does:
    /// reserved names resolve directly, anything else must be a
    /// registered codec.
    pub fn with_compression_name(
        mut self,
        registry: &CompressorRegistry,
        name: &str,
    ) -> TableResult<Self> {
        let tag = registry.get_compressor_type(name);
        if tag == CompressionType::Disabled.tag() && name != DISABLE_OPTION_NAME {
            return Err(TableError::UnknownCompressorName {
                name: name.to_string(),
            });
        }
        self.table.compression = tag;
        Ok(self)
    }
}

/// Counters for database activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStats {
    /// Entries written to the memtable.
    pub puts: u64,
    /// Point lookups served.
    pub gets: u64,
    /// Memtable flushes performed.
    pub flushes: u64,
    /// Lookups answered from the memtable.
    pub memtable_hits: u64,
    /// Lookups answered from table files.
    pub table_hits: u64,
}

/// A minimal embedded key-value store.
pub struct Db {
    dir: PathBuf,
    options: DbOptions,
    registry: Arc<CompressorRegistry>,
    mem: BTreeMap<Vec<u8>, Vec<u8>>,
    tables: Vec<Table>,
    next_table_number: u64,
    stats: DbStats,
}

impl Db {
    /// Opens (or creates) a database in `dir`. Existing table files
    /// are loaded in creation order.
    pub fn open(
        dir: &Path,
        options: DbOptions,
        registry: Arc<CompressorRegistry>,
    ) -> TableResult<Db> {
        std::fs::create_dir_all(dir)?;
        let mut table_paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |e| e == TABLE_EXTENSION))
            .collect();
        table_paths.sort();

        let mut tables = Vec::with_capacity(table_paths.len());
        for path in &table_paths {
            tables.push(Table::open(path, Arc::clone(&registry))?);
        }
        let next_table_number = table_paths.len() as u64 + 1;
        info!(
            dir = %dir.display(),
            tables = tables.len(),
            compression = options.table.compression,
            "database opened"
        );
        Ok(Db {
            dir: dir.to_path_buf(),
            options,
            registry,
            mem: BTreeMap::new(),
            tables,
            next_table_number,
            stats: DbStats::default(),
        })
    }

    /// Buffers a write in the memtable.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.mem.insert(key.to_vec(), value.to_vec());
        self.stats.puts += 1;
    }

    /// Reads a key, checking the memtable first, then table files from
    /// newest to oldest.
    pub fn get(&mut self, key: &[u8]) -> TableResult<Option<Vec<u8>>> {
        self.stats.gets += 1;
        if let Some(value) = self.mem.get(key) {
            self.stats.memtable_hits += 1;
            return Ok(Some(value.clone()));
        }
        for table in self.tables.iter().rev() {
            if let Some(value) = table.get(key)? {
                self.stats.table_hits += 1;
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes the memtable out as a new table file. A no-op when the
    /// memtable is empty.
    pub fn flush(&mut self) -> TableResult<Option<TableProperties>> {
        if self.mem.is_empty() {
            return Ok(None);
        }
        let path = self
            .dir
            .join(format!("{:06}.{TABLE_EXTENSION}", self.next_table_number));
        let mut builder = TableBuilder::new(
            &path,
            self.options.table.clone(),
            Arc::clone(&self.registry),
        )?;
        for (key, value) in &self.mem {
            builder.add(key, value)?;
        }
        let properties = builder.finish()?;
        debug!(
            path = %path.display(),
            entries = properties.entry_count,
            "memtable flushed"
        );
        self.tables
            .push(Table::open(&path, Arc::clone(&self.registry))?);
        self.next_table_number += 1;
        self.mem.clear();
        self.stats.flushes += 1;
        Ok(Some(properties))
    }

    /// The open tables, oldest first.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Activity counters.
    pub fn stats(&self) -> &DbStats {
        &self.stats
    }
}

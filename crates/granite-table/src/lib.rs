#![warn(missing_docs)]

//! Granite table layer: a minimal block-based table format and a tiny
//! database facade wired through the pluggable compression subsystem.
//!
//! Write path: put -> memtable -> flush -> TableBuilder -> codec.compress
//! Read path:  get -> memtable / Table -> codec.uncompress

pub mod db;
pub mod error;
pub mod table;

pub use db::{Db, DbOptions, DbStats};
pub use error::{TableError, TableResult};
pub use table::{
    Table, TableBuilder, TableOptions, TableProperties, DEFAULT_BLOCK_SIZE, TABLE_FORMAT_VERSION,
    TABLE_MAGIC,
};

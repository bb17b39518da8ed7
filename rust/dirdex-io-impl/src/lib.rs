//! Common implementations of the `dirdex-io` table abstraction: the
//! log-structured file table and a read-caching wrapper.

use std::path::Path;

use dirdex_io::{MemoryTable, Table};

pub mod cached;
pub mod file_table;

pub use cached::CachedTable;
pub use file_table::FileTable;

pub fn create_in_memory() -> std::io::Result<Box<dyn Table>> {
    Ok(Box::new(MemoryTable::new()))
}

/// Opens (or creates) the file table at `path`, wrapped in a read cache of
/// `cache_size` values.
pub fn create_file_based(path: &Path, cache_size: usize) -> std::io::Result<Box<dyn Table>> {
    Ok(Box::new(CachedTable::new(FileTable::open(path)?, cache_size)))
}

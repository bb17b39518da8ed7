//! Storage abstraction underneath the index layer: `Table`, an ordered
//! byte-key to byte-value table with point operations, an in-order cursor,
//! and explicit `sync`/`close`.
//!
//! Provides the memory-based table; file-based tables live in `dirdex-io-impl`.

use dirdex_common::Cursor;

pub mod file;
pub mod memory;
pub mod table_cursor;
pub mod utils;

pub use memory::MemoryTable;
pub use table_cursor::KeyRangeCursor;

/// A key/value pair produced by a table cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Tuple {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Tuple {
        Tuple {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A tuple with an empty value, for cursor positioning. Only the key
    /// takes part in comparisons.
    pub fn key_only(key: impl Into<Vec<u8>>) -> Tuple {
        Tuple::new(key, Vec::new())
    }
}

/// Ordered table of byte keys to byte values.
///
/// Keys are ordered lexicographically by their unsigned bytes. Values are
/// returned exactly as stored. Every operation fails once the table has been
/// closed.
pub trait Table: Send {
    /// Returns the value stored under `key`.
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()>;

    /// Removes `key`, returning `true` if it was present.
    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool>;

    /// Number of keys in the table.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a cursor over the table's tuples in key order, positioned
    /// before the first tuple. Cursor positioning calls compare keys only.
    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>>;

    /// Makes all previous mutations durable.
    fn sync(&mut self) -> std::io::Result<()>;

    /// Syncs and releases the table. Idempotent.
    fn close(&mut self) -> std::io::Result<()>;
}

impl<T: Table + ?Sized> Table for Box<T> {
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        self.as_mut().get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
        self.as_mut().put(key, value)
    }

    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool> {
        self.as_mut().remove(key)
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }

    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>> {
        self.as_mut().cursor()
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.as_mut().sync()
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.as_mut().close()
    }
}

use std::collections::BTreeMap;

use dirdex_common::Cursor;

use crate::{KeyRangeCursor, Table, Tuple, utils::table_closed};

/// `BTreeMap`-backed table. Nothing survives the process; `sync` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryTable {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    closed: bool,
}

impl MemoryTable {
    pub fn new() -> MemoryTable {
        MemoryTable::default()
    }

    fn ensure_open(&self) -> std::io::Result<()> {
        if self.closed {
            return Err(table_closed("memory"));
        }
        Ok(())
    }
}

impl Table for MemoryTable {
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
        self.ensure_open()?;
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool> {
        self.ensure_open()?;
        Ok(self.entries.remove(key).is_some())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>> {
        self.ensure_open()?;
        Ok(Box::new(KeyRangeCursor::new(
            &self.entries,
            |_: &[u8], value: &Vec<u8>| Ok(value.clone()),
        )))
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.ensure_open()
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

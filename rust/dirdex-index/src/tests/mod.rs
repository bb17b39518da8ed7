use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dirdex_common::Cursor;
use dirdex_io::{MemoryTable, Table, Tuple};

use crate::{IdCursor, IndexConfig, IndexTable, StringMarshaller};


fn open_index(duplicate_limit: usize) -> IndexTable<String, StringMarshaller> {
    let config = IndexConfig::new("ou")
        .with_duplicate_limit(duplicate_limit)
        .with_cache_size(8);
    IndexTable::open(config, StringMarshaller).unwrap()
}

fn collect_ids(mut cursor: IdCursor) -> Vec<u64> {
    cursor.iter().collect::<dirdex_common::Result<Vec<_>>>().unwrap()
}

fn lookup_ids(index: &mut IndexTable<String, StringMarshaller>, value: &str) -> Vec<u64> {
    collect_ids(index.lookup(&value.to_string()).unwrap())
}

/// Switches shared with a [`FaultyTable`]; while one is on, the matching
/// operation fails with an I/O error.
#[derive(Clone, Default)]
struct Faults {
    gets: Arc<AtomicBool>,
    puts: Arc<AtomicBool>,
    removes: Arc<AtomicBool>,
    syncs: Arc<AtomicBool>,
}

impl Faults {
    fn fail_gets(&self, on: bool) {
        self.gets.store(on, Ordering::SeqCst);
    }

    fn fail_puts(&self, on: bool) {
        self.puts.store(on, Ordering::SeqCst);
    }

    fn fail_removes(&self, on: bool) {
        self.removes.store(on, Ordering::SeqCst);
    }

    fn fail_syncs(&self, on: bool) {
        self.syncs.store(on, Ordering::SeqCst);
    }
}

fn check(flag: &AtomicBool, op: &str) -> std::io::Result<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(std::io::Error::other(format!("{op} failed: disk full")));
    }
    Ok(())
}

/// In-memory table whose operations fail on demand.
struct FaultyTable {
    inner: MemoryTable,
    faults: Faults,
}

fn faulty_table() -> (Box<dyn Table>, Faults) {
    let faults = Faults::default();
    let table = FaultyTable {
        inner: MemoryTable::new(),
        faults: faults.clone(),
    };
    (Box::new(table), faults)
}

impl Table for FaultyTable {
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        check(&self.faults.gets, "get")?;
        self.inner.get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
        check(&self.faults.puts, "put")?;
        self.inner.put(key, value)
    }

    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool> {
        check(&self.faults.removes, "remove")?;
        self.inner.remove(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>> {
        self.inner.cursor()
    }

    fn sync(&mut self) -> std::io::Result<()> {
        check(&self.faults.syncs, "sync")?;
        self.inner.sync()
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.inner.close()
    }
}

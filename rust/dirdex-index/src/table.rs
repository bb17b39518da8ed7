use std::{marker::PhantomData, path::Path, sync::Arc};

use dirdex_avl::{AvlTree, AvlTreeCursor};
use dirdex_common::{Result, error::Error};
use dirdex_io::Table;

use crate::{
    config::IndexConfig,
    duplicates::DuplicateTable,
    marshaller::{BytesMarshaller, Marshaller, U64Marshaller},
};

/// Cursor over the ids recorded for one value, in ascending order.
pub type IdCursor = AvlTreeCursor<Arc<AvlTree<u64>>>;

/// One (value, id) pair of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry<V> {
    pub value: V,
    pub id: u64,
}

/// The four backing tables of an index.
pub struct IndexTables {
    pub forward: Box<dyn Table>,
    pub forward_overflow: Box<dyn Table>,
    pub reverse: Box<dyn Table>,
    pub reverse_overflow: Box<dyn Table>,
}

impl IndexTables {
    pub fn in_memory() -> std::io::Result<IndexTables> {
        Ok(IndexTables {
            forward: dirdex_io_impl::create_in_memory()?,
            forward_overflow: dirdex_io_impl::create_in_memory()?,
            reverse: dirdex_io_impl::create_in_memory()?,
            reverse_overflow: dirdex_io_impl::create_in_memory()?,
        })
    }

    /// Opens (or creates) cached file tables inside `dir`.
    pub fn file_based(dir: &Path, cache_size: usize) -> std::io::Result<IndexTables> {
        std::fs::create_dir_all(dir)?;
        let open = |name: &str| dirdex_io_impl::create_file_based(&dir.join(name), cache_size);
        Ok(IndexTables {
            forward: open("forward.tbl")?,
            forward_overflow: open("forward-overflow.tbl")?,
            reverse: open("reverse.tbl")?,
            reverse_overflow: open("reverse-overflow.tbl")?,
        })
    }
}

/// Attribute index mapping values to entry ids (forward) and ids back to
/// values (reverse).
///
/// Values are keyed by their serialized form, so the order of ids within a
/// value is numeric and the order of values is the byte order of
/// `M::serialize`. Both directions store duplicate sets with the same
/// inline/overflow policy; see [`DuplicateTable`].
pub struct IndexTable<V, M> {
    config: IndexConfig,
    marshaller: M,
    forward: DuplicateTable<u64, U64Marshaller>,
    reverse: DuplicateTable<Vec<u8>, BytesMarshaller>,
    closed: bool,
    _value: PhantomData<fn() -> V>,
}

impl<V, M: Marshaller<V>> IndexTable<V, M> {
    /// Opens the index described by `config`: in memory without a working
    /// directory, otherwise file-backed under
    /// `<working_directory>/<attribute_id>/`.
    ///
    /// # Errors
    ///
    /// `Configuration` for invalid settings, before any storage is touched;
    /// `Io` if the tables cannot be opened.
    pub fn open(config: IndexConfig, marshaller: M) -> Result<IndexTable<V, M>> {
        config.validate()?;
        let tables = match config.index_directory() {
            None => IndexTables::in_memory()
                .map_err(|e| Error::io(format!("index '{}'", config.attribute_id), e))?,
            Some(dir) => IndexTables::file_based(&dir, config.cache_size)
                .map_err(|e| Error::io(dir.display().to_string(), e))?,
        };
        IndexTable::with_tables(config, marshaller, tables)
    }

    /// Opens an index over caller-provided tables.
    pub fn with_tables(
        config: IndexConfig,
        marshaller: M,
        tables: IndexTables,
    ) -> Result<IndexTable<V, M>> {
        config.validate()?;
        let forward = DuplicateTable::open(
            format!("{}.forward", config.attribute_id),
            tables.forward,
            tables.forward_overflow,
            U64Marshaller,
            config.duplicate_limit,
            config.cache_size,
        )?;
        let reverse = DuplicateTable::open(
            format!("{}.reverse", config.attribute_id),
            tables.reverse,
            tables.reverse_overflow,
            BytesMarshaller,
            config.duplicate_limit,
            config.cache_size,
        )?;
        Ok(IndexTable {
            config,
            marshaller,
            forward,
            reverse,
            closed: false,
            _value: PhantomData,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Records that entry `id` holds `value`. Returns `false` if the pair
    /// was already present.
    pub fn add(&mut self, value: &V, id: u64) -> Result<bool> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        let added = self.forward.put(&key, id)?;
        if let Err(e) = self.reverse.put(&id.to_be_bytes(), key.clone()) {
            if added {
                if let Err(undo) = self.forward.remove(&key, &id) {
                    log::error!(
                        "index '{}': failed to undo add of entry {id}: {undo}",
                        self.config.attribute_id
                    );
                }
            }
            return Err(e);
        }
        Ok(added)
    }

    /// Cursor over the ids recorded for `value`; empty if there are none.
    ///
    /// The cursor works on a snapshot: later changes to the index are not
    /// visible through it.
    pub fn lookup(&mut self, value: &V) -> Result<IdCursor> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        let ids = self
            .forward
            .duplicates(&key)?
            .unwrap_or_else(|| Arc::new(AvlTree::new()));
        Ok(AvlTreeCursor::new(ids))
    }

    /// The value recorded for `id`; the smallest one if there are several.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is recorded for `id`.
    pub fn reverse_lookup(&mut self, id: u64) -> Result<V> {
        self.ensure_open()?;
        let key = self
            .reverse
            .first_duplicate(&id.to_be_bytes())?
            .ok_or_else(|| Error::not_found(format!("{} of entry {id}", self.config.attribute_id)))?;
        self.marshaller.deserialize(&key)
    }

    /// Every value recorded for `id`, in index order.
    pub fn reverse_values(&mut self, id: u64) -> Result<Vec<V>> {
        self.ensure_open()?;
        let Some(keys) = self.reverse.duplicates(&id.to_be_bytes())? else {
            return Ok(Vec::new());
        };
        keys.iter()
            .map(|key| self.marshaller.deserialize(key))
            .collect()
    }

    /// Removes the pair from both directions. Returns `false` if it was not
    /// present.
    pub fn remove(&mut self, value: &V, id: u64) -> Result<bool> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        let removed = self.forward.remove(&key, &id)?;
        if let Err(e) = self.reverse.remove(&id.to_be_bytes(), &key) {
            if removed {
                self.restore_forward([&key], id);
            }
            return Err(e);
        }
        Ok(removed)
    }

    /// Removes every value recorded for `id`, returning how many there were.
    pub fn drop_entry(&mut self, id: u64) -> Result<usize> {
        self.ensure_open()?;
        let Some(keys) = self.reverse.duplicates(&id.to_be_bytes())? else {
            return Ok(0);
        };
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys.iter() {
            match self.forward.remove(key, &id) {
                Ok(true) => removed.push(key),
                Ok(false) => {}
                Err(e) => {
                    self.restore_forward(removed, id);
                    return Err(e);
                }
            }
        }
        if let Err(e) = self.reverse.take(&id.to_be_bytes()) {
            self.restore_forward(removed, id);
            return Err(e);
        }
        Ok(keys.len())
    }

    pub fn has(&mut self, value: &V, id: u64) -> Result<bool> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        self.forward.contains(&key, &id)
    }

    /// Total number of (value, id) pairs.
    pub fn count(&self) -> u64 {
        self.forward.count()
    }

    /// Number of ids recorded for `value`.
    pub fn count_of(&mut self, value: &V) -> Result<usize> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        self.forward.count_of(&key)
    }

    /// Stored bytes of the forward slot of `value`: an inline id set or a
    /// redirect marker.
    pub fn raw_forward_slot(&mut self, value: &V) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        let key = self.marshaller.serialize(value)?;
        self.forward.raw_slot(&key)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.forward.sync()?;
        self.reverse.sync()
    }

    /// Flushes and releases the backing tables. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.forward.close()?;
        self.reverse.close()?;
        self.closed = true;
        log::debug!("closed index '{}'", self.config.attribute_id);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::closed(format!("index '{}'", self.config.attribute_id)));
        }
        Ok(())
    }

    /// Puts back forward pairs removed by an operation that failed halfway.
    fn restore_forward<'a>(&mut self, keys: impl IntoIterator<Item = &'a Vec<u8>>, id: u64) {
        for key in keys {
            if let Err(e) = self.forward.put(key, id) {
                log::error!(
                    "index '{}': failed to restore entry {id}: {e}",
                    self.config.attribute_id
                );
            }
        }
    }
}

impl<V: Clone, M: Marshaller<V>> IndexTable<V, M> {
    /// Every (value, id) pair in index order.
    pub fn entries(&mut self) -> Result<Vec<IndexEntry<V>>> {
        self.ensure_open()?;
        let mut entries = Vec::with_capacity(self.count() as usize);
        for (key, ids) in self.forward.slots()? {
            let value = self.marshaller.deserialize(&key)?;
            entries.extend(ids.iter().map(|&id| IndexEntry {
                value: value.clone(),
                id,
            }));
        }
        Ok(entries)
    }
}

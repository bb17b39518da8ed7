//! Tables mapping a key to a sorted set of duplicates.
//!
//! A set small enough is stored inline in the key's slot of the primary
//! table, serialized by [`AvlTreeMarshaller`]. Once it grows past the
//! duplicate limit it moves to its own record in the overflow table and the
//! slot is overwritten with a [`Redirect`] to that record.
//!
//! Overflow sets are decoded once and kept in a write-back LRU cache; a
//! modified set is written back before it is evicted, and on `sync`/`close`.
//! A failed operation leaves every stored set as it was.
//! Readers receive `Arc` snapshots and writers go through `Arc::make_mut`,
//! so a snapshot held by an open cursor is never modified underneath it.

use std::{num::NonZeroUsize, sync::Arc};

use ahash::RandomState;
use byteorder::{BigEndian, ByteOrder};
use dirdex_avl::AvlTree;
use dirdex_common::{Cursor, Result, error::Error, verify_arg, verify_data};
use dirdex_io::Table;
use lru::LruCache;

use crate::{
    marshaller::{AvlTreeMarshaller, Marshaller},
    redirect::{Redirect, is_not_redirect},
};

/// Overflow record 0 holds the next record id, `u64` BE.
const HEADER_RECORD: u64 = 0;

struct CachedSet<D> {
    tree: Arc<AvlTree<D>>,
    dirty: bool,
}

enum Slot<D> {
    Inline(AvlTree<D>),
    Overflow(Redirect),
}

pub struct DuplicateTable<D, M> {
    name: String,
    primary: Box<dyn Table>,
    overflow: Box<dyn Table>,
    marshaller: AvlTreeMarshaller<M>,
    duplicate_limit: usize,
    sets: LruCache<u64, CachedSet<D>, RandomState>,
    next_record_id: u64,
    count: u64,
    header_dirty: bool,
    closed: bool,
}

impl<D, M> DuplicateTable<D, M>
where
    D: Ord + Clone,
    M: Marshaller<D>,
{
    /// Opens a duplicate table over the given primary and overflow tables.
    ///
    /// The element count is recomputed from the stored sets, so it is exact
    /// even if the previous owner never synced.
    pub fn open(
        name: impl Into<String>,
        mut primary: Box<dyn Table>,
        mut overflow: Box<dyn Table>,
        marshaller: M,
        duplicate_limit: usize,
        cache_size: usize,
    ) -> Result<DuplicateTable<D, M>> {
        verify_arg!(duplicate_limit, duplicate_limit > 0);
        let Some(capacity) = NonZeroUsize::new(cache_size) else {
            return Err(Error::invalid_arg("cache_size", "cache_size > 0"));
        };
        let name = name.into();
        let mut next_record_id =
            match overflow.get(&HEADER_RECORD.to_be_bytes()).map_err(|e| Error::io(&name, e))? {
                Some(header) => {
                    verify_data!(header, header.len() == 8);
                    BigEndian::read_u64(&header)
                }
                None => HEADER_RECORD + 1,
            };
        // Records allocated after the last header write are still in the
        // table; never hand their ids out again.
        if let Some(last) = last_record_id(overflow.as_mut()).map_err(|e| Error::io(&name, e))? {
            next_record_id = next_record_id.max(last + 1);
        }
        let count = stored_count(primary.as_mut(), overflow.as_mut(), &name)?;
        Ok(DuplicateTable {
            name,
            primary,
            overflow,
            marshaller: AvlTreeMarshaller::new(marshaller),
            duplicate_limit,
            sets: LruCache::with_hasher(capacity, RandomState::new()),
            next_record_id,
            count,
            header_dirty: false,
            closed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of (key, duplicate) pairs.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of keys with a non-empty set.
    pub fn key_count(&self) -> usize {
        self.primary.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Adds `duplicate` to the set of `key`. Returns `false` if it was
    /// already present.
    pub fn put(&mut self, key: &[u8], duplicate: D) -> Result<bool> {
        self.ensure_open()?;
        match self.read_slot(key)? {
            None => {
                let mut tree = AvlTree::new();
                tree.insert(duplicate);
                self.write_inline(key, &tree)?;
            }
            Some(Slot::Inline(mut tree)) => {
                if !tree.insert(duplicate) {
                    return Ok(false);
                }
                if tree.len() > self.duplicate_limit {
                    self.migrate(key, tree)?;
                } else {
                    self.write_inline(key, &tree)?;
                }
            }
            Some(Slot::Overflow(redirect)) => {
                let set = self.overflow_set_mut(redirect.record_id())?;
                if !Arc::make_mut(&mut set.tree).insert(duplicate) {
                    return Ok(false);
                }
                set.dirty = true;
            }
        }
        self.count += 1;
        Ok(true)
    }

    /// Removes `duplicate` from the set of `key`. An emptied set releases
    /// the key's slot and its overflow record.
    pub fn remove(&mut self, key: &[u8], duplicate: &D) -> Result<bool> {
        self.ensure_open()?;
        match self.read_slot(key)? {
            None => return Ok(false),
            Some(Slot::Inline(mut tree)) => {
                if !tree.remove(duplicate) {
                    return Ok(false);
                }
                if tree.is_empty() {
                    self.primary
                        .remove(key)
                        .map_err(|e| Error::io(&self.name, e))?;
                } else {
                    self.write_inline(key, &tree)?;
                }
            }
            Some(Slot::Overflow(redirect)) => {
                let id = redirect.record_id();
                let set = self.overflow_set_mut(id)?;
                if !set.tree.contains(duplicate) {
                    return Ok(false);
                }
                if set.tree.len() == 1 {
                    self.release(key, id)?;
                } else {
                    Arc::make_mut(&mut set.tree).remove(duplicate);
                    set.dirty = true;
                }
            }
        }
        self.count -= 1;
        Ok(true)
    }

    /// Removes the whole set of `key`, returning it.
    pub fn take(&mut self, key: &[u8]) -> Result<Option<Arc<AvlTree<D>>>> {
        self.ensure_open()?;
        let set = match self.read_slot(key)? {
            None => return Ok(None),
            Some(Slot::Inline(tree)) => {
                self.primary
                    .remove(key)
                    .map_err(|e| Error::io(&self.name, e))?;
                Arc::new(tree)
            }
            Some(Slot::Overflow(redirect)) => {
                let id = redirect.record_id();
                let tree = Arc::clone(&self.overflow_set_mut(id)?.tree);
                self.release(key, id)?;
                tree
            }
        };
        self.count -= set.len() as u64;
        Ok(Some(set))
    }

    pub fn contains(&mut self, key: &[u8], duplicate: &D) -> Result<bool> {
        Ok(self
            .duplicates(key)?
            .is_some_and(|set| set.contains(duplicate)))
    }

    /// Size of the set of `key`; zero when absent.
    pub fn count_of(&mut self, key: &[u8]) -> Result<usize> {
        Ok(self.duplicates(key)?.map_or(0, |set| set.len()))
    }

    /// Snapshot of the set of `key`.
    pub fn duplicates(&mut self, key: &[u8]) -> Result<Option<Arc<AvlTree<D>>>> {
        self.ensure_open()?;
        match self.read_slot(key)? {
            None => Ok(None),
            Some(Slot::Inline(tree)) => Ok(Some(Arc::new(tree))),
            Some(Slot::Overflow(redirect)) => {
                let set = self.overflow_set_mut(redirect.record_id())?;
                Ok(Some(Arc::clone(&set.tree)))
            }
        }
    }

    /// Smallest duplicate of `key`.
    pub fn first_duplicate(&mut self, key: &[u8]) -> Result<Option<D>> {
        Ok(self
            .duplicates(key)?
            .and_then(|set| set.first().cloned()))
    }

    /// Stored bytes of the slot of `key`: a serialized set or a redirect.
    pub fn raw_slot(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.primary.get(key).map_err(|e| Error::io(&self.name, e))
    }

    /// Every non-empty set with its key, in key order.
    pub fn slots(&mut self) -> Result<Vec<(Vec<u8>, Arc<AvlTree<D>>)>> {
        self.ensure_open()?;
        let keys = {
            let mut cursor = self
                .primary
                .cursor()
                .map_err(|e| Error::io(&self.name, e))?;
            let mut keys = Vec::new();
            while cursor.next()? {
                keys.push(cursor.get()?.key.clone());
            }
            keys
        };
        let mut slots = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(set) = self.duplicates(&key)? {
                slots.push((key, set));
            }
        }
        Ok(slots)
    }

    /// Writes back modified overflow sets and the header, then syncs both
    /// tables.
    pub fn sync(&mut self) -> Result<()> {
        self.ensure_open()?;
        for (id, set) in self.sets.iter_mut() {
            if set.dirty {
                let bytes = self.marshaller.serialize(&*set.tree)?;
                self.overflow
                    .put(&id.to_be_bytes(), &bytes)
                    .map_err(|e| Error::io(&self.name, e))?;
                set.dirty = false;
            }
        }
        if self.header_dirty {
            self.overflow
                .put(&HEADER_RECORD.to_be_bytes(), &self.next_record_id.to_be_bytes())
                .map_err(|e| Error::io(&self.name, e))?;
            self.header_dirty = false;
        }
        self.primary.sync().map_err(|e| Error::io(&self.name, e))?;
        self.overflow.sync().map_err(|e| Error::io(&self.name, e))?;
        Ok(())
    }

    /// Syncs and closes both tables. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.sync()?;
        self.sets.clear();
        self.primary.close().map_err(|e| Error::io(&self.name, e))?;
        self.overflow.close().map_err(|e| Error::io(&self.name, e))?;
        self.closed = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::closed(&self.name));
        }
        Ok(())
    }

    fn read_slot(&mut self, key: &[u8]) -> Result<Option<Slot<D>>> {
        let Some(bytes) = self
            .primary
            .get(key)
            .map_err(|e| Error::io(&self.name, e))?
        else {
            return Ok(None);
        };
        if is_not_redirect(Some(&bytes)) {
            Ok(Some(Slot::Inline(self.marshaller.deserialize(&bytes)?)))
        } else {
            Ok(Some(Slot::Overflow(Redirect::from_bytes(&bytes)?)))
        }
    }

    fn write_inline(&mut self, key: &[u8], tree: &AvlTree<D>) -> Result<()> {
        let bytes = self.marshaller.serialize(tree)?;
        self.primary
            .put(key, &bytes)
            .map_err(|e| Error::io(&self.name, e))
    }

    /// Moves an inline set that outgrew the limit into a fresh overflow
    /// record and points the slot at it.
    fn migrate(&mut self, key: &[u8], tree: AvlTree<D>) -> Result<()> {
        self.make_room()?;
        let id = self.next_record_id;
        let bytes = self.marshaller.serialize(&tree)?;
        self.overflow
            .put(&id.to_be_bytes(), &bytes)
            .map_err(|e| Error::io(&self.name, e))?;
        self.next_record_id += 1;
        self.header_dirty = true;
        if let Err(e) = self.primary.put(key, &Redirect::new(id).to_bytes()) {
            if let Err(undo) = self.overflow.remove(&id.to_be_bytes()) {
                log::error!("{}: failed to drop orphaned overflow record {id}: {undo}", self.name);
            }
            return Err(Error::io(&self.name, e));
        }
        log::debug!(
            "{}: moved set of {} duplicates to overflow record {id}",
            self.name,
            tree.len()
        );
        self.sets.push(
            id,
            CachedSet {
                tree: Arc::new(tree),
                dirty: false,
            },
        );
        Ok(())
    }

    /// Drops the overflow record `id` together with the slot of `key`.
    ///
    /// The record goes first; if the slot cannot be removed afterwards, the
    /// cached set is marked dirty so the record is written again.
    fn release(&mut self, key: &[u8], id: u64) -> Result<()> {
        self.overflow
            .remove(&id.to_be_bytes())
            .map_err(|e| Error::io(&self.name, e))?;
        if let Err(e) = self.primary.remove(key) {
            if let Some(set) = self.sets.peek_mut(&id) {
                set.dirty = true;
            }
            return Err(Error::io(&self.name, e));
        }
        self.sets.pop(&id);
        log::debug!("{}: released overflow record {id}", self.name);
        Ok(())
    }

    fn overflow_set_mut(&mut self, id: u64) -> Result<&mut CachedSet<D>> {
        if !self.sets.contains(&id) {
            let bytes = self
                .overflow
                .get(&id.to_be_bytes())
                .map_err(|e| Error::io(&self.name, e))?
                .ok_or_else(|| Error::not_found(format!("{} overflow record {id}", self.name)))?;
            let tree: AvlTree<D> = self.marshaller.deserialize(&bytes)?;
            self.make_room()?;
            self.sets.push(
                id,
                CachedSet {
                    tree: Arc::new(tree),
                    dirty: false,
                },
            );
        }
        self.sets
            .get_mut(&id)
            .ok_or_else(|| Error::invalid_operation("overflow set cache"))
    }

    /// Evicts the least recently used set if the cache is full, writing it
    /// back first when modified. On a failed write-back the set stays cached.
    fn make_room(&mut self) -> Result<()> {
        if self.sets.len() < self.sets.cap().get() {
            return Ok(());
        }
        let Some((evicted_id, evicted)) = self.sets.pop_lru() else {
            return Ok(());
        };
        if !evicted.dirty {
            return Ok(());
        }
        log::trace!("{}: writing back evicted overflow record {evicted_id}", self.name);
        let written = self.marshaller.serialize(&*evicted.tree).and_then(|bytes| {
            self.overflow
                .put(&evicted_id.to_be_bytes(), &bytes)
                .map_err(|e| Error::io(&self.name, e))
        });
        if let Err(e) = written {
            self.sets.push(evicted_id, evicted);
            return Err(e);
        }
        Ok(())
    }
}

fn last_record_id(overflow: &mut dyn Table) -> std::io::Result<Option<u64>> {
    let mut cursor = overflow.cursor()?;
    let last = cursor.last().map_err(std::io::Error::other)?;
    if !last {
        return Ok(None);
    }
    let key = &cursor.get().map_err(std::io::Error::other)?.key;
    let id = <[u8; 8]>::try_from(key.as_slice())
        .map(u64::from_be_bytes)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "overflow record key"))?;
    Ok(Some(id))
}

/// Sums the element counts of every stored set. Both inline sets and
/// overflow records start with their `u32` BE element count, and every
/// element carries a `u32` length. Unreadable slots are skipped; they fail
/// when their key is accessed.
fn stored_count(primary: &mut dyn Table, overflow: &mut dyn Table, name: &str) -> Result<u64> {
    let mut cursor = primary.cursor().map_err(|e| Error::io(name, e))?;
    let mut count = 0u64;
    while cursor.next()? {
        let slot = cursor.get()?;
        let set = if is_not_redirect(Some(&slot.value)) {
            Some(slot.value.clone())
        } else {
            let id = Redirect::from_bytes(&slot.value)?.record_id();
            overflow
                .get(&id.to_be_bytes())
                .map_err(|e| Error::io(name, e))?
        };
        match set.as_deref().and_then(set_len) {
            Some(len) => count += len,
            None => log::warn!("{name}: skipping unreadable set in slot {:?}", slot.key),
        }
    }
    Ok(count)
}

fn set_len(set: &[u8]) -> Option<u64> {
    let len = u64::from(BigEndian::read_u32(set.get(..4)?));
    (4 + 4 * len <= set.len() as u64).then_some(len)
}

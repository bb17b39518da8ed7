use std::num::NonZeroUsize;

use ahash::RandomState;
use dirdex_common::Cursor;
use dirdex_io::{Table, Tuple};
use lru::LruCache;

/// Write-through read cache over another table.
///
/// Point lookups are served from an LRU cache of recently read or written
/// values; mutations go to the inner table first and then update the cache.
/// Cursors bypass the cache.
pub struct CachedTable<T> {
    inner: T,
    cache: LruCache<Vec<u8>, Vec<u8>, RandomState>,
    hits: u64,
    misses: u64,
}

impl<T: Table> CachedTable<T> {
    /// Wraps `inner` with a cache of `cache_size` values (at least one).
    pub fn new(inner: T, cache_size: usize) -> CachedTable<T> {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        CachedTable {
            inner,
            cache: LruCache::with_hasher(capacity, RandomState::new()),
            hits: 0,
            misses: 0,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        // Writes through this handle would bypass the cache.
        self.cache.clear();
        &mut self.inner
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of lookups forwarded to the inner table.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl<T: Table> Table for CachedTable<T> {
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        if let Some(value) = self.cache.get(key) {
            self.hits += 1;
            return Ok(Some(value.clone()));
        }
        self.misses += 1;
        let value = self.inner.get(key)?;
        if let Some(value) = &value {
            self.cache.put(key.to_vec(), value.clone());
        }
        Ok(value)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
        self.inner.put(key, value)?;
        self.cache.put(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool> {
        self.cache.pop(key);
        self.inner.remove(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>> {
        self.inner.cursor()
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.inner.sync()
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.cache.clear();
        self.inner.close()
    }
}

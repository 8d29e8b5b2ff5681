//! Per-peer filter of inventory the remote is known to have.

use colx_wire::InvVect;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded, recency-evicting set of inventory vectors.
pub struct KnownInventory {
    cache: LruCache<InvVect, ()>,
}

impl KnownInventory {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn contains(&self, iv: &InvVect) -> bool {
        self.cache.contains(iv)
    }

    /// Record `iv`, evicting the least recently added vector when full.
    pub fn insert(&mut self, iv: InvVect) {
        self.cache.put(iv, ());
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

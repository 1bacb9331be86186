// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Keyed store of accumulated page state
//!
//! The map itself sits behind a `RwLock` that is only taken for writing when an
//! identity is created or dropped. Each entry has its own `Mutex`, so writers to
//! one identity are serialized while different identities proceed independently.
//! The map is never handed out; callers only see clones or closures.

use super::entry::{CacheEntry, FetchToken};
use crate::error::{ListError, Result};
use crate::query::{Cursor, IdentityFilter, PageEnvelope, QueryIdentity};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type EntrySlot<T> = Arc<Mutex<CacheEntry<T>>>;

/// Counters describing store traffic
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub appends: u64,
    pub duplicate_cursors: u64,
    pub out_of_order_cursors: u64,
    pub transforms: u64,
    pub removals: u64,
    pub evictions: u64,
}

impl StoreStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Process-wide page cache, one instance per application root
pub struct CacheStore<T> {
    entries: RwLock<HashMap<QueryIdentity, EntrySlot<T>>>,
    stats: Mutex<StoreStats>,
}

impl<T> CacheStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
        }
    }

    /// Snapshot of the entry for `identity`
    pub fn get(&self, identity: &QueryIdentity) -> Option<CacheEntry<T>>
    where
        T: Clone,
    {
        let snapshot = self.read(identity, CacheEntry::clone);
        let mut stats = self.stats.lock();
        if snapshot.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        snapshot
    }

    /// Borrow the entry for `identity` without cloning it
    pub fn read<R>(&self, identity: &QueryIdentity, f: impl FnOnce(&CacheEntry<T>) -> R) -> Option<R> {
        let entries = self.entries.read();
        let slot = entries.get(identity)?;
        let entry = slot.lock();
        Some(f(&entry))
    }

    pub fn contains(&self, identity: &QueryIdentity) -> bool {
        self.entries.read().contains_key(identity)
    }

    /// Append a fetched page, creating the entry if absent.
    ///
    /// Fails with [`ListError::DuplicateCursor`] if the entry already holds a page
    /// for `cursor`, and with [`ListError::OutOfOrderCursor`] unless `cursor`
    /// directly follows the last cached one. The entry is left untouched on error.
    pub fn append_page(
        &self,
        identity: &QueryIdentity,
        cursor: Cursor,
        page: PageEnvelope<T>,
        token: FetchToken,
    ) -> Result<()> {
        {
            let entries = self.entries.read();
            if let Some(slot) = entries.get(identity) {
                let mut entry = slot.lock();
                return self.push_checked(identity, &mut entry, cursor, page, token);
            }
        }

        let mut entries = self.entries.write();
        if let Some(slot) = entries.get(identity) {
            let mut entry = slot.lock();
            return self.push_checked(identity, &mut entry, cursor, page, token);
        }

        // Only a valid first page creates the entry
        let mut entry = CacheEntry::new();
        self.push_checked(identity, &mut entry, cursor, page, token)?;
        entries.insert(identity.clone(), Arc::new(Mutex::new(entry)));
        Ok(())
    }

    /// Run `f` against the entry in place. Writers to the same identity are
    /// serialized; the closure only sees methods that keep pages and cursors paired.
    pub fn transform<R>(
        &self,
        identity: &QueryIdentity,
        f: impl FnOnce(&mut CacheEntry<T>) -> R,
    ) -> Result<R> {
        let entries = self.entries.read();
        let slot = entries
            .get(identity)
            .ok_or_else(|| ListError::UnknownIdentity(identity.clone()))?;
        let mut entry = slot.lock();
        let result = f(&mut entry);
        debug_assert!(entry.is_consistent(), "transform broke page/cursor pairing");
        self.stats.lock().transforms += 1;
        Ok(result)
    }

    /// Delete the entry, returning what it held
    pub fn remove(&self, identity: &QueryIdentity) -> Option<CacheEntry<T>> {
        let slot = self.entries.write().remove(identity)?;
        self.stats.lock().removals += 1;
        let mut entry = slot.lock();
        Some(std::mem::take(&mut *entry))
    }

    /// Put a whole entry back, replacing whatever is cached for `identity`
    pub fn restore(&self, identity: &QueryIdentity, entry: CacheEntry<T>) {
        debug_assert!(entry.is_consistent());
        self.entries
            .write()
            .insert(identity.clone(), Arc::new(Mutex::new(entry)));
    }

    pub fn identities(&self) -> Vec<QueryIdentity> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn identities_matching(&self, filter: &IdentityFilter) -> Vec<QueryIdentity> {
        self.entries
            .read()
            .keys()
            .filter(|identity| filter.matches(identity))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        self.stats.lock().removals += dropped as u64;
        dropped
    }

    /// Evict least recently updated entries until at most `max_entries` remain.
    /// Identities for which `protected` returns true are never evicted.
    pub fn evict_excess(
        &self,
        max_entries: usize,
        protected: impl Fn(&QueryIdentity) -> bool,
    ) -> Vec<QueryIdentity> {
        let mut entries = self.entries.write();
        if entries.len() <= max_entries {
            return Vec::new();
        }

        let mut candidates: Vec<_> = entries
            .iter()
            .filter(|(identity, _)| !protected(identity))
            .map(|(identity, slot)| (slot.lock().updated_at(), identity.clone()))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let excess = entries.len() - max_entries;
        let evicted: Vec<QueryIdentity> = candidates
            .into_iter()
            .take(excess)
            .map(|(_, identity)| identity)
            .collect();
        for identity in &evicted {
            entries.remove(identity);
            log::debug!("Evicted cache entry {}", identity);
        }
        self.stats.lock().evictions += evicted.len() as u64;
        evicted
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = self.stats.lock().clone();
        stats.entries = self.len();
        stats
    }

    fn push_checked(
        &self,
        identity: &QueryIdentity,
        entry: &mut CacheEntry<T>,
        cursor: Cursor,
        page: PageEnvelope<T>,
        token: FetchToken,
    ) -> Result<()> {
        let mut stats = self.stats.lock();
        if entry.has_cursor(cursor) {
            stats.duplicate_cursors += 1;
            return Err(ListError::DuplicateCursor {
                identity: identity.clone(),
                cursor,
            });
        }
        let expected = Cursor::after(entry.page_count());
        if cursor != expected {
            stats.out_of_order_cursors += 1;
            return Err(ListError::OutOfOrderCursor {
                identity: identity.clone(),
                cursor,
                expected,
            });
        }
        entry.push_page(cursor, page, token);
        stats.appends += 1;
        Ok(())
    }
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Client: one instance per application root
//!
//! Owns the shared cache store, the in-flight guard and the flag side-table, and
//! hands out list controllers and the mutation synchronizer wired to them. The
//! entry map is never exposed; everything goes through the store's operations.

use crate::cache::{CacheEntry, CacheStore, FetchSlots, FlagTable, StoreStats};
use crate::config::ListConfig;
use crate::controller::InfiniteList;
use crate::error::{ListError, Result};
use crate::fetcher::PageFetcher;
use crate::mutation::MutationSynchronizer;
use crate::query::{ListItem, QueryIdentity};
use std::sync::Arc;

/// Entry point for creating lists and applying mutations
pub struct ListClient<T: ListItem> {
    config: ListConfig,
    store: Arc<CacheStore<T>>,
    slots: Arc<FetchSlots>,
    flags: Arc<FlagTable<T::Id>>,
}

impl<T: ListItem> Clone for ListClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            slots: Arc::clone(&self.slots),
            flags: Arc::clone(&self.flags),
        }
    }
}

/// Snapshot of client-wide counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub store: StoreStats,
    pub in_flight: usize,
    pub flags: usize,
}

impl<T: ListItem> ListClient<T> {
    /// Create a client; fails if the configuration does not validate
    pub fn new(config: ListConfig) -> Result<Self> {
        config.validate().map_err(ListError::Config)?;
        Ok(Self {
            config,
            store: Arc::new(CacheStore::new()),
            slots: Arc::new(FetchSlots::new()),
            flags: Arc::new(FlagTable::new()),
        })
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// Controller for `identity`. Controllers for the same identity share cached
    /// pages and the in-flight guard, whichever fetcher they were given.
    pub fn list(&self, identity: QueryIdentity, fetcher: Arc<dyn PageFetcher<T>>) -> InfiniteList<T> {
        InfiniteList::new(
            identity,
            Arc::clone(&self.store),
            Arc::clone(&self.slots),
            Arc::clone(&self.flags),
            fetcher,
            self.config.clone(),
        )
    }

    pub fn mutations(&self) -> MutationSynchronizer<T> {
        MutationSynchronizer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.slots),
            Arc::clone(&self.flags),
            self.config.clear_mode,
        )
    }

    /// Snapshot of the cached entry for `identity`
    pub fn entry(&self, identity: &QueryIdentity) -> Option<CacheEntry<T>> {
        self.store.get(identity)
    }

    pub fn flag(&self, id: &T::Id) -> Option<bool> {
        self.flags.get(id)
    }

    /// Forget an identity, e.g. after its parameters changed and the old list is
    /// gone from screen. A fetch still in flight for it is discarded.
    pub fn evict(&self, identity: &QueryIdentity) -> bool {
        self.slots.bump_generation(identity);
        self.store.remove(identity).is_some()
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            store: self.store.stats(),
            in_flight: self.slots.in_flight(),
            flags: self.flags.len(),
        }
    }
}

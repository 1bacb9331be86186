// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Optimistic mutations applied straight into the cache
//!
//! Every mutation is two-phase: applying it returns a [`PendingMutation`] holding
//! the snapshot needed to undo it. Once the server answers, the pending mutation
//! is either committed or handed back to [`MutationSynchronizer::rollback`].
//!
//! ```text
//! apply_*() ──▶ Pending(snapshot) ──server ok──▶ Committed
//!                       │
//!                       └──server rejects──▶ RolledBack(snapshot)
//! ```

use crate::cache::{CacheEntry, CacheStore, FetchSlots, FlagTable, RemovedRow};
use crate::config::ClearMode;
use crate::error::{ListError, Result};
use crate::query::{IdentityFilter, ListItem, QueryIdentity};
use async_trait::async_trait;
use std::sync::Arc;

/// Server side of the mutations
#[async_trait]
pub trait MutationBackend<Id: Sync>: Send + Sync {
    async fn remove(&self, id: &Id) -> Result<()>;

    /// Clear a list, optionally only the part matching `filter_type`
    async fn clear(&self, filter_type: Option<&str>) -> Result<()>;

    async fn set_flag(&self, id: &Id, value: bool) -> Result<()>;
}

/// Rows removed from one cache entry
#[derive(Debug, Clone)]
pub struct EntryRemoval<T> {
    pub identity: QueryIdentity,
    pub rows: Vec<RemovedRow<T>>,
    /// `(page index, amount)` actually subtracted from page totals
    pub total_decrements: Vec<(usize, u64)>,
    /// Generation of the identity when the rows were taken out; a rollback
    /// only puts them back while it is unchanged
    pub generation: u64,
}

/// What is needed to undo one optimistic mutation
#[derive(Debug, Clone)]
pub enum MutationSnapshot<T: ListItem> {
    Removed(Vec<EntryRemoval<T>>),
    Cleared(Vec<(QueryIdentity, CacheEntry<T>)>),
    Flag {
        id: T::Id,
        value: bool,
        previous: Option<bool>,
    },
}

/// An applied but unconfirmed mutation
#[derive(Debug)]
#[must_use = "a pending mutation must be committed or rolled back"]
pub struct PendingMutation<T: ListItem> {
    snapshot: MutationSnapshot<T>,
}

/// Final phase of a mutation
#[derive(Debug)]
pub enum MutationOutcome<T: ListItem> {
    Committed,
    RolledBack(MutationSnapshot<T>),
}

impl<T: ListItem> PendingMutation<T> {
    pub fn snapshot(&self) -> &MutationSnapshot<T> {
        &self.snapshot
    }

    /// Rows taken out of cached pages, counted once per entry they appeared in
    pub fn removed_rows(&self) -> usize {
        match &self.snapshot {
            MutationSnapshot::Removed(removals) => removals.iter().map(|r| r.rows.len()).sum(),
            _ => 0,
        }
    }

    /// Identities whose entries this mutation touched
    pub fn touched(&self) -> Vec<&QueryIdentity> {
        match &self.snapshot {
            MutationSnapshot::Removed(removals) => removals.iter().map(|r| &r.identity).collect(),
            MutationSnapshot::Cleared(entries) => entries.iter().map(|(id, _)| id).collect(),
            MutationSnapshot::Flag { .. } => Vec::new(),
        }
    }

    /// The server confirmed the change; the snapshot is no longer needed
    pub fn commit(self) -> MutationOutcome<T> {
        MutationOutcome::Committed
    }
}

/// Applies optimistic edits to every matching cache entry without a refetch
pub struct MutationSynchronizer<T: ListItem> {
    store: Arc<CacheStore<T>>,
    slots: Arc<FetchSlots>,
    flags: Arc<FlagTable<T::Id>>,
    clear_mode: ClearMode,
}

impl<T: ListItem> MutationSynchronizer<T> {
    pub(crate) fn new(
        store: Arc<CacheStore<T>>,
        slots: Arc<FetchSlots>,
        flags: Arc<FlagTable<T::Id>>,
        clear_mode: ClearMode,
    ) -> Self {
        Self {
            store,
            slots,
            flags,
            clear_mode,
        }
    }

    /// Remove the item with `id` from every entry matching `filter`
    pub fn apply_remove(&self, filter: &IdentityFilter, id: &T::Id) -> PendingMutation<T> {
        self.apply_remove_where(filter, |row| row.item_id() == *id)
    }

    /// Remove every row matching `item_match` from every entry matching `filter`,
    /// decrementing touched pages' totals (never below zero)
    pub fn apply_remove_where(
        &self,
        filter: &IdentityFilter,
        item_match: impl Fn(&T) -> bool,
    ) -> PendingMutation<T> {
        let mut removals = Vec::new();
        for identity in self.store.identities_matching(filter) {
            let generation = self.slots.generation(&identity);
            let transformed = self.store.transform(&identity, |entry| {
                let before: Vec<Option<u64>> = entry.pages().iter().map(|p| p.total).collect();
                let rows = entry.remove_rows(&item_match);
                let total_decrements = before
                    .iter()
                    .zip(entry.pages())
                    .enumerate()
                    .filter_map(|(index, (before, page))| match (before, page.total) {
                        (Some(before), Some(after)) if *before > after => Some((index, before - after)),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                (rows, total_decrements)
            });

            match transformed {
                Ok((rows, total_decrements)) if !rows.is_empty() => {
                    log::debug!("Optimistically removed {} rows from {}", rows.len(), identity);
                    removals.push(EntryRemoval {
                        identity,
                        rows,
                        total_decrements,
                        generation,
                    });
                }
                Ok(_) => {}
                // Dropped between listing and transforming
                Err(_) => {}
            }
        }
        PendingMutation {
            snapshot: MutationSnapshot::Removed(removals),
        }
    }

    /// Clear every entry matching `filter` using the configured clear mode
    pub fn apply_clear(&self, filter: &IdentityFilter) -> PendingMutation<T> {
        self.apply_clear_with(filter, self.clear_mode)
    }

    /// Clear every entry matching `filter`. Either way, readers afterwards see an
    /// empty list that is not loading and has no more pages; fetches in flight
    /// for those identities are discarded when they land.
    pub fn apply_clear_with(&self, filter: &IdentityFilter, mode: ClearMode) -> PendingMutation<T> {
        let mut cleared = Vec::new();
        for identity in self.store.identities_matching(filter) {
            let previous = match mode {
                ClearMode::Reset => self
                    .store
                    .transform(&identity, |entry| {
                        let previous = std::mem::take(entry);
                        entry.reset();
                        previous
                    })
                    .ok(),
                ClearMode::Remove => self.store.remove(&identity),
            };
            self.slots.bump_generation(&identity);
            if let Some(previous) = previous {
                cleared.push((identity, previous));
            }
        }
        log::debug!("Cleared {} cache entries ({:?})", cleared.len(), mode);
        PendingMutation {
            snapshot: MutationSnapshot::Cleared(cleared),
        }
    }

    /// Record a flag (favorite / follow) for `id` in the side-table
    pub fn apply_upsert_flag(&self, id: T::Id, value: bool) -> PendingMutation<T> {
        let previous = self.flags.set(id.clone(), value);
        PendingMutation {
            snapshot: MutationSnapshot::Flag {
                id,
                value,
                previous,
            },
        }
    }

    /// Current side-table flag for `id`, if any
    pub fn flag(&self, id: &T::Id) -> Option<bool> {
        self.flags.get(id)
    }

    /// Undo a pending mutation
    pub fn rollback(&self, pending: PendingMutation<T>) -> MutationOutcome<T> {
        let snapshot = pending.snapshot;
        match &snapshot {
            MutationSnapshot::Removed(removals) => {
                for removal in removals {
                    // Cleared, refreshed or evicted since: those pages are gone
                    if self.slots.generation(&removal.identity) != removal.generation {
                        log::debug!(
                            "Rollback skipped {}: list was reset after the removal",
                            removal.identity
                        );
                        continue;
                    }
                    let restored = self.store.transform(&removal.identity, |entry| {
                        entry.reinsert_rows(removal.rows.clone(), &removal.total_decrements)
                    });
                    match restored {
                        Ok(unplaced) if !unplaced.is_empty() => log::warn!(
                            "Rollback could not place {} rows back into {}",
                            unplaced.len(),
                            removal.identity
                        ),
                        Ok(_) => {}
                        Err(_) => log::debug!(
                            "Rollback skipped {}: entry no longer cached",
                            removal.identity
                        ),
                    }
                }
            }
            MutationSnapshot::Cleared(entries) => {
                for (identity, entry) in entries {
                    self.slots.bump_generation(identity);
                    self.store.restore(identity, entry.clone());
                }
            }
            MutationSnapshot::Flag { id, previous, .. } => {
                self.flags.restore(id, *previous);
            }
        }
        MutationOutcome::RolledBack(snapshot)
    }

    /// Remove `id` locally right away, then confirm with the server. On
    /// rejection the rows are put back before the error is returned.
    pub async fn remove(
        &self,
        backend: &dyn MutationBackend<T::Id>,
        filter: &IdentityFilter,
        id: &T::Id,
    ) -> Result<()> {
        let pending = self.apply_remove(filter, id);
        let confirmed = backend.remove(id).await;
        self.settle(pending, confirmed)
    }

    /// Clear matching lists locally right away, then confirm with the server
    pub async fn clear(
        &self,
        backend: &dyn MutationBackend<T::Id>,
        filter: &IdentityFilter,
        filter_type: Option<&str>,
    ) -> Result<()> {
        let pending = self.apply_clear(filter);
        let confirmed = backend.clear(filter_type).await;
        self.settle(pending, confirmed)
    }

    /// Flip the favorite flag of `id`. `embedded` is the flag carried by the row
    /// on screen, used when the side-table has no value yet. Returns the new value.
    pub async fn toggle_favorite(
        &self,
        backend: &dyn MutationBackend<T::Id>,
        id: &T::Id,
        embedded: bool,
    ) -> Result<bool> {
        let (value, previous) = self.flags.toggle(id.clone(), embedded);
        let pending = PendingMutation {
            snapshot: MutationSnapshot::Flag {
                id: id.clone(),
                value,
                previous,
            },
        };
        let confirmed = backend.set_flag(id, value).await;
        self.settle(pending, confirmed).map(|()| value)
    }

    fn settle(&self, pending: PendingMutation<T>, confirmed: Result<()>) -> Result<()> {
        match confirmed {
            Ok(()) => {
                let _ = pending.commit();
                Ok(())
            }
            Err(error) => {
                log::warn!("Server rejected optimistic mutation, rolling back: {}", error);
                let _ = self.rollback(pending);
                Err(match error {
                    ListError::MutationRejected { .. } => error,
                    other => ListError::rejected(other.to_string()),
                })
            }
        }
    }
}

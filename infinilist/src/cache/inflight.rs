// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Per-identity fetch slots
//!
//! At most one fetch per query identity is in flight at any time. A request that
//! arrives while a fetch is running is dropped, not queued. Each slot also keeps a
//! generation counter: clearing or refreshing an identity bumps it, and a fetch
//! issued under an older generation settles without touching the cache.

use super::entry::FetchToken;
use crate::error::{ListError, Result};
use crate::query::{Cursor, QueryIdentity};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Fetch state of one identity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching {
        cursor: Cursor,
        token: FetchToken,
    },
    Failed {
        cursor: Cursor,
        error: ListError,
    },
}

impl FetchState {
    pub fn is_fetching(&self) -> bool {
        matches!(self, FetchState::Fetching { .. })
    }

    pub fn fetching_cursor(&self) -> Option<Cursor> {
        match self {
            FetchState::Fetching { cursor, .. } => Some(*cursor),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ListError> {
        match self {
            FetchState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Proof that the holder owns the in-flight fetch of an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub identity: QueryIdentity,
    pub cursor: Cursor,
    pub token: FetchToken,
    generation: u64,
}

/// Result of asking to start a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Begin {
    Started(FetchTicket),
    /// Another fetch for this identity is running
    InFlight,
    /// The caller's decision function had nothing to fetch
    Declined,
}

#[derive(Debug, Default)]
struct Slot {
    state: FetchState,
    generation: u64,
}

/// In-flight guard shared by every controller of one client
#[derive(Debug, Default)]
pub struct FetchSlots {
    slots: Mutex<HashMap<QueryIdentity, Slot>>,
}

impl FetchSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch unless one is already running. `decide` runs under the slot
    /// lock, so the cursor it picks cannot race another starter.
    pub fn begin(&self, identity: &QueryIdentity, decide: impl FnOnce() -> Option<Cursor>) -> Begin {
        let mut slots = self.slots.lock();
        let slot = slots.entry(identity.clone()).or_default();
        if slot.state.is_fetching() {
            return Begin::InFlight;
        }

        let Some(cursor) = decide() else {
            return Begin::Declined;
        };

        let token = FetchToken::new();
        slot.state = FetchState::Fetching { cursor, token };
        Begin::Started(FetchTicket {
            identity: identity.clone(),
            cursor,
            token,
            generation: slot.generation,
        })
    }

    /// Finish the fetch held by `ticket`. `apply` runs under the slot lock and is
    /// told whether the ticket's generation is still current; its result decides
    /// whether the slot returns to `Idle` or moves to `Failed`.
    pub fn settle<R>(&self, ticket: &FetchTicket, apply: impl FnOnce(bool) -> Result<R>) -> Result<R> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(ticket.identity.clone()).or_default();
        let current = slot.generation == ticket.generation;
        let outcome = apply(current);

        let owns_slot = matches!(slot.state, FetchState::Fetching { token, .. } if token == ticket.token);
        if owns_slot {
            slot.state = match &outcome {
                Err(error) if current => FetchState::Failed {
                    cursor: ticket.cursor,
                    error: error.clone(),
                },
                _ => FetchState::Idle,
            };
        }
        outcome
    }

    /// Invalidate any fetch currently in flight for `identity`; its result will be
    /// discarded when it lands. A failure recorded for the identity is cleared.
    pub fn bump_generation(&self, identity: &QueryIdentity) -> u64 {
        let mut slots = self.slots.lock();
        let slot = slots.entry(identity.clone()).or_default();
        slot.generation += 1;
        if matches!(slot.state, FetchState::Failed { .. }) {
            slot.state = FetchState::Idle;
        }
        slot.generation
    }

    /// Current generation of `identity`; changes whenever its cached pages are
    /// reset, refreshed or evicted
    pub fn generation(&self, identity: &QueryIdentity) -> u64 {
        self.slots
            .lock()
            .get(identity)
            .map(|slot| slot.generation)
            .unwrap_or_default()
    }

    pub fn state(&self, identity: &QueryIdentity) -> FetchState {
        self.slots
            .lock()
            .get(identity)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    pub fn is_fetching(&self, identity: &QueryIdentity) -> bool {
        self.slots
            .lock()
            .get(identity)
            .map(|slot| slot.state.is_fetching())
            .unwrap_or(false)
    }

    /// Identities with a fetch in flight
    pub fn fetching_identities(&self) -> HashSet<QueryIdentity> {
        self.slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.state.is_fetching())
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    /// Number of identities with a fetch in flight
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.state.is_fetching())
            .count()
    }
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Infinite list controller
//!
//! Orchestrates the page fetcher, the continuation policy and the cache store
//! for one query identity:
//!
//! ```text
//! Idle ──initialize/load_more──▶ Fetching(cursor) ──ok──▶ Idle
//!                                      │
//!                                      └──err──▶ Failed ──retry──▶ Fetching(cursor)
//! ```
//!
//! The only suspension point is the fetcher call. A failed fetch never touches
//! the cache, so a retry simply re-runs the same step.

use crate::cache::{Begin, CacheStore, FetchSlots, FetchState, FetchTicket, FlagTable};
use crate::config::ListConfig;
use crate::error::{ListError, Result};
use crate::fetcher::{as_fetch_failure, PageFetcher};
use crate::query::{Cursor, ListItem, PageEnvelope, PageRequest, QueryIdentity};
use std::sync::Arc;

/// What a load call ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and appended
    Fetched { cursor: Cursor, rows: usize },
    /// `initialize` found the identity already cached
    Cached,
    /// Another fetch for this identity was running; the call was dropped
    InFlight,
    /// The continuation policy reports no further pages
    Exhausted,
    /// The list was cleared or refreshed while the fetch ran; result dropped
    Discarded { cursor: Cursor },
    /// The page was already cached; the duplicate append was dropped
    Duplicate { cursor: Cursor },
    /// `refresh` dropped the cached pages while a superseded fetch was still
    /// running. Call `initialize` again once `state()` is no longer fetching.
    RefreshDeferred,
}

impl LoadOutcome {
    pub fn fetched(&self) -> bool {
        matches!(self, LoadOutcome::Fetched { .. })
    }
}

/// Read-only projection handed to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
    pub is_loading_initial: bool,
    pub is_loading_more: bool,
    pub has_more: bool,
    pub error: Option<ListError>,
}

impl<T> ListView<T> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Controller for one logical list
pub struct InfiniteList<T: ListItem> {
    identity: QueryIdentity,
    store: Arc<CacheStore<T>>,
    slots: Arc<FetchSlots>,
    flags: Arc<FlagTable<T::Id>>,
    fetcher: Arc<dyn PageFetcher<T>>,
    config: ListConfig,
}

impl<T: ListItem> InfiniteList<T> {
    pub(crate) fn new(
        identity: QueryIdentity,
        store: Arc<CacheStore<T>>,
        slots: Arc<FetchSlots>,
        flags: Arc<FlagTable<T::Id>>,
        fetcher: Arc<dyn PageFetcher<T>>,
        config: ListConfig,
    ) -> Self {
        Self {
            identity,
            store,
            slots,
            flags,
            fetcher,
            config,
        }
    }

    pub fn identity(&self) -> &QueryIdentity {
        &self.identity
    }

    /// Fetch the first page unless the identity is already cached
    pub async fn initialize(&self) -> Result<LoadOutcome> {
        let begin = self.slots.begin(&self.identity, || {
            (!self.store.contains(&self.identity)).then_some(Cursor::FIRST)
        });
        match begin {
            Begin::Started(ticket) => self.run(ticket).await,
            Begin::InFlight => Ok(LoadOutcome::InFlight),
            Begin::Declined => Ok(LoadOutcome::Cached),
        }
    }

    /// Fetch the next page if the policy says one exists and nothing is in flight.
    /// On an uncached identity this fetches the first page.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let hint = self.config.page_size_hint();
        let begin = self.slots.begin(&self.identity, || {
            self.store
                .read(&self.identity, |entry| entry.continuation(hint).cursor())
                .unwrap_or(Some(Cursor::FIRST))
        });
        match begin {
            Begin::Started(ticket) => self.run(ticket).await,
            Begin::InFlight => {
                log::debug!("load_more for {} dropped: fetch in flight", self.identity);
                Ok(LoadOutcome::InFlight)
            }
            Begin::Declined => Ok(LoadOutcome::Exhausted),
        }
    }

    /// Re-run the step that failed: the first page if nothing is cached,
    /// otherwise the next page.
    pub async fn retry(&self) -> Result<LoadOutcome> {
        if self.store.contains(&self.identity) {
            self.load_more().await
        } else {
            self.initialize().await
        }
    }

    /// Drop the cached pages and fetch the first page again. A fetch still in
    /// flight for the old pages is discarded when it lands; in that case nothing
    /// is fetched now and the outcome is [`LoadOutcome::RefreshDeferred`].
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        self.slots.bump_generation(&self.identity);
        self.store.remove(&self.identity);
        match self.initialize().await? {
            LoadOutcome::InFlight => {
                log::debug!("Refresh of {} deferred: superseded fetch in flight", self.identity);
                Ok(LoadOutcome::RefreshDeferred)
            }
            outcome => Ok(outcome),
        }
    }

    pub fn state(&self) -> FetchState {
        self.slots.state(&self.identity)
    }

    pub fn has_more(&self) -> bool {
        let hint = self.config.page_size_hint();
        self.store
            .read(&self.identity, |entry| entry.continuation(hint).has_more())
            .unwrap_or(false)
    }

    /// Current projection: flattened rows (with side-table flags applied), the
    /// latest page's total, loading flags and the last fetch error
    pub fn view(&self) -> ListView<T> {
        let hint = self.config.page_size_hint();
        let state = self.slots.state(&self.identity);
        let cached = self.store.read(&self.identity, |entry| {
            let rows: Vec<T> = entry
                .rows()
                .cloned()
                .map(|mut row| {
                    if let Some(flag) = self.flags.get(&row.item_id()) {
                        row.apply_flag(flag);
                    }
                    row
                })
                .collect();
            (rows, entry.total(), entry.continuation(hint).has_more(), entry.page_count())
        });
        let (rows, total, has_more, pages) = cached.unwrap_or((Vec::new(), None, false, 0));

        let fetching = state.fetching_cursor();
        ListView {
            rows,
            total,
            is_loading_initial: fetching.is_some_and(Cursor::is_first) && pages == 0,
            is_loading_more: fetching.is_some_and(|cursor| !cursor.is_first()),
            has_more,
            error: state.error().cloned(),
        }
    }

    async fn run(&self, ticket: FetchTicket) -> Result<LoadOutcome> {
        let request = PageRequest {
            identity: self.identity.clone(),
            cursor: ticket.cursor,
            page_size: self.config.page_size,
        };
        log::debug!("Fetching {} cursor {}", self.identity, ticket.cursor);

        let fetched = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| as_fetch_failure(&request, e));

        let outcome = self
            .slots
            .settle(&ticket, |current| self.apply(&ticket, current, fetched));

        if let Some(max_entries) = self.config.max_entries {
            if outcome.as_ref().is_ok_and(LoadOutcome::fetched) {
                let busy = self.slots.fetching_identities();
                let evicted = self.store.evict_excess(max_entries, |identity| {
                    identity == &self.identity || busy.contains(identity)
                });
                for identity in &evicted {
                    self.slots.bump_generation(identity);
                }
            }
        }
        outcome
    }

    fn apply(
        &self,
        ticket: &FetchTicket,
        current: bool,
        fetched: Result<PageEnvelope<T>>,
    ) -> Result<LoadOutcome> {
        if !current {
            log::debug!(
                "Discarding result for {} cursor {}: list was reset while fetching",
                self.identity,
                ticket.cursor
            );
            return Ok(LoadOutcome::Discarded {
                cursor: ticket.cursor,
            });
        }

        let page = match fetched {
            Ok(page) => page,
            Err(error) => {
                log::warn!("{}", error);
                return Err(error);
            }
        };

        let rows = page.rows.len();
        match self
            .store
            .append_page(&self.identity, ticket.cursor, page, ticket.token)
        {
            Ok(()) => {
                log::debug!(
                    "Appended {} rows to {} at cursor {}",
                    rows,
                    self.identity,
                    ticket.cursor
                );
                Ok(LoadOutcome::Fetched {
                    cursor: ticket.cursor,
                    rows,
                })
            }
            Err(error @ ListError::DuplicateCursor { .. }) => {
                log::warn!("{}; dropping duplicate page", error);
                Ok(LoadOutcome::Duplicate {
                    cursor: ticket.cursor,
                })
            }
            Err(error) => {
                log::warn!("{}; dropping page", error);
                Err(error)
            }
        }
    }
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Accumulated page state for one query identity
//!
//! `pages` and `cursors` always have equal length and `cursors[i]` produced
//! `pages[i]`. Fields are private so every change goes through methods that keep
//! that pairing intact; mutations may rewrite rows and totals but never the
//! page/cursor sequence itself (except a full reset).

use crate::policy::{self, Continuation};
use crate::query::{Cursor, PageEnvelope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchToken(Uuid);

impl FetchToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FetchToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FetchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row taken out of a page, with enough position data to put it back
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedRow<T> {
    pub page: usize,
    pub position: usize,
    pub row: T,
}

/// Cached pages of one list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry<T> {
    pages: Vec<PageEnvelope<T>>,
    cursors: Vec<Cursor>,
    last_fetch_token: Option<FetchToken>,
    updated_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            cursors: Vec::new(),
            last_fetch_token: None,
            updated_at: Utc::now(),
        }
    }

    pub fn pages(&self) -> &[PageEnvelope<T>] {
        &self.pages
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn last_fetch_token(&self) -> Option<FetchToken> {
        self.last_fetch_token
    }

    /// When the entry last changed; staleness windows are the caller's policy
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_cursor(&self, cursor: Cursor) -> bool {
        self.cursors.contains(&cursor)
    }

    /// All rows in page order
    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|page| page.rows.len()).sum()
    }

    /// The most recent page's total; later pages carry fresher counts
    pub fn total(&self) -> Option<u64> {
        self.pages.last().and_then(|page| page.total)
    }

    pub fn continuation(&self, page_size_hint: Option<usize>) -> Continuation {
        if self.pages.is_empty() {
            return Continuation::Done;
        }
        policy::decide_next(&self.pages, &self.cursors, page_size_hint)
    }

    /// Append one page. Callers check for duplicate cursors first.
    pub(crate) fn push_page(&mut self, cursor: Cursor, page: PageEnvelope<T>, token: FetchToken) {
        self.pages.push(page);
        self.cursors.push(cursor);
        self.last_fetch_token = Some(token);
        self.touch();
    }

    /// Remove every row matching `predicate`, decrementing each touched page's
    /// total by the number removed from it (floored at zero). Returns the
    /// removed rows in page/position order.
    pub fn remove_rows<F>(&mut self, mut predicate: F) -> Vec<RemovedRow<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        for (page_index, page) in self.pages.iter_mut().enumerate() {
            let rows = std::mem::take(&mut page.rows);
            let mut kept = Vec::with_capacity(rows.len());
            let mut removed_here = 0u64;
            for (position, row) in rows.into_iter().enumerate() {
                if predicate(&row) {
                    removed_here += 1;
                    removed.push(RemovedRow {
                        page: page_index,
                        position,
                        row,
                    });
                } else {
                    kept.push(row);
                }
            }
            page.rows = kept;
            if removed_here > 0 {
                if let Some(total) = page.total.as_mut() {
                    *total = total.saturating_sub(removed_here);
                }
            }
        }
        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    /// Put previously removed rows back at their original positions and add the
    /// given amounts back onto page totals. Rows whose page no longer exists are
    /// returned unplaced.
    pub fn reinsert_rows(
        &mut self,
        mut rows: Vec<RemovedRow<T>>,
        total_restores: &[(usize, u64)],
    ) -> Vec<RemovedRow<T>> {
        let mut unplaced = Vec::new();
        rows.sort_by_key(|r| (r.page, r.position));
        for removed in rows {
            match self.pages.get_mut(removed.page) {
                Some(page) => {
                    let position = removed.position.min(page.rows.len());
                    page.rows.insert(position, removed.row);
                }
                None => unplaced.push(removed),
            }
        }
        for &(page_index, amount) in total_restores {
            if let Some(total) = self
                .pages
                .get_mut(page_index)
                .and_then(|page| page.total.as_mut())
            {
                *total += amount;
            }
        }
        self.touch();
        unplaced
    }

    /// Apply `f` to every row in place
    pub fn update_rows<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for page in &mut self.pages {
            page.rows.iter_mut().for_each(&mut f);
        }
        self.touch();
    }

    /// Replace all pages with a single empty page at the first cursor
    pub fn reset(&mut self) {
        self.pages = vec![PageEnvelope::empty()];
        self.cursors = vec![Cursor::FIRST];
        self.touch();
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.pages.len() == self.cursors.len()
            && self.cursors.windows(2).all(|pair| pair[0] < pair[1])
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only projection of an entry: all rows, authoritative total, and whether
/// the continuation policy expects more pages
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedView<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
    pub has_more: bool,
}

impl<T: Clone> FlattenedView<T> {
    pub fn of(entry: &CacheEntry<T>, page_size_hint: Option<usize>) -> Self {
        Self {
            rows: entry.rows().cloned().collect(),
            total: entry.total(),
            has_more: entry.continuation(page_size_hint).has_more(),
        }
    }
}

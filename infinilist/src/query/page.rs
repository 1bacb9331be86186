// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Page cursors, envelopes and the row contract

use super::identity::QueryIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// 1-based, forward-only page index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(u32);

impl Cursor {
    /// The cursor every list starts from
    pub const FIRST: Cursor = Cursor(1);

    /// Cursor for the page following `fetched` already-fetched pages
    pub fn after(fetched: usize) -> Self {
        Cursor(fetched as u32 + 1)
    }

    pub fn new(index: u32) -> Option<Self> {
        (index >= 1).then_some(Cursor(index))
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn is_first(self) -> bool {
        self.0 == 1
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page as returned by the backend
///
/// `total` counts every item matching the query server-wide, not only the rows
/// fetched so far. Both `total` and `has_next` are optional because backends
/// populate them inconsistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub rows: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
}

impl<T> PageEnvelope<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            total: None,
            has_next: None,
        }
    }

    /// The page a cleared list is reset to
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total: Some(0),
            has_next: Some(false),
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_has_next(mut self, has_next: bool) -> Self {
        self.has_next = Some(has_next);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything a fetcher needs to request one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub identity: QueryIdentity,
    pub cursor: Cursor,
    pub page_size: usize,
}

/// Contract for rows held in cached pages
///
/// Rows are matched by id when mutations remove them. `apply_flag` lets list
/// views overwrite a flag embedded in the row (e.g. "favorited") with the
/// current side-table value.
pub trait ListItem: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn item_id(&self) -> Self::Id;

    fn apply_flag(&mut self, _flag: bool) {}
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for paging, caching and optimistic mutations

use crate::query::{Cursor, QueryIdentity};
use thiserror::Error;

/// Errors surfaced by the list engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// Transport or server failure while fetching one page. Recoverable by retry;
    /// the cache is left exactly as it was before the attempt.
    #[error("Fetch failed for {identity} at cursor {cursor}: {reason}")]
    FetchFailed {
        identity: QueryIdentity,
        cursor: Cursor,
        reason: String,
    },

    /// A page for this cursor is already cached. Logic fault: the duplicate is dropped.
    #[error("Duplicate cursor {cursor} for {identity}")]
    DuplicateCursor {
        identity: QueryIdentity,
        cursor: Cursor,
    },

    /// A page arrived for a cursor that does not directly follow the cached ones.
    /// Logic fault: the page is dropped.
    #[error("Cursor {cursor} for {identity} is out of order, expected {expected}")]
    OutOfOrderCursor {
        identity: QueryIdentity,
        cursor: Cursor,
        expected: Cursor,
    },

    /// The server declined an optimistic edit; local state has been rolled back
    #[error("Mutation rejected: {reason}")]
    MutationRejected { reason: String },

    #[error("No cache entry for {0}")]
    UnknownIdentity(QueryIdentity),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ListError {
    pub fn fetch_failed(identity: &QueryIdentity, cursor: Cursor, reason: impl Into<String>) -> Self {
        ListError::FetchFailed {
            identity: identity.clone(),
            cursor,
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        ListError::MutationRejected {
            reason: reason.into(),
        }
    }

    /// Whether re-issuing the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ListError::FetchFailed { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ListError>;

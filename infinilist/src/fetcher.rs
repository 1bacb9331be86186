// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Page fetcher: the single seam to the REST backend
//!
//! A fetcher performs exactly one network call per request and never retries on
//! its own. Failures come back as [`ListError::FetchFailed`] carrying the identity
//! and cursor; the controller decides whether to surface or retry.

use crate::error::{ListError, Result};
use crate::query::{PageEnvelope, PageRequest};
use async_trait::async_trait;
use std::future::Future;

/// Fetches one page for a query identity and cursor
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<T>>;
}

/// Adapter turning an async closure into a [`PageFetcher`]
pub struct FnFetcher<F> {
    fetch_fn: F,
}

impl<F> FnFetcher<F> {
    pub fn new(fetch_fn: F) -> Self {
        Self { fetch_fn }
    }
}

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageEnvelope<T>>> + Send,
{
    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<T>> {
        (self.fetch_fn)(request.clone()).await
    }
}

/// Coerce any fetcher error into `FetchFailed` for the request it belongs to
pub(crate) fn as_fetch_failure(request: &PageRequest, error: ListError) -> ListError {
    match error {
        ListError::FetchFailed { .. } => error,
        other => ListError::fetch_failed(&request.identity, request.cursor, other.to_string()),
    }
}

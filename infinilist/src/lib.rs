// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Infinilist - paginated list fetching with a coherent client-side cache
//!
//! The engine behind "infinite" lists of booths, products, footprints, favorites
//! and search results:
//!
//! - **Page fetcher** ([`PageFetcher`]): one network call per page
//! - **Continuation policy** ([`policy`]): ordered rules over `hasNext`, short
//!   pages and running totals decide whether another page exists
//! - **Cache store** ([`CacheStore`]): per-identity accumulated pages with
//!   single-writer transforms
//! - **Infinite list controller** ([`InfiniteList`]): `initialize` / `load_more`
//!   with at most one fetch in flight per identity
//! - **Mutation synchronizer** ([`MutationSynchronizer`]): optimistic remove,
//!   clear and favorite edits with rollback
//!
//! # Usage
//!
//! ```ignore
//! let client: ListClient<Booth> = ListClient::new(ListConfig::default())?;
//! let booths = client.list(QueryIdentity::new("booths", &params), fetcher);
//!
//! booths.initialize().await?;
//! while booths.view().has_more {
//!     booths.load_more().await?;
//! }
//!
//! client
//!     .mutations()
//!     .remove(&backend, &IdentityFilter::resource("footprints"), &booth_id)
//!     .await?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod mutation;
pub mod policy;
pub mod query;

pub use cache::{CacheEntry, CacheStore, FetchState, FetchToken, FlagTable, FlattenedView, StoreStats};
pub use client::{ClientStats, ListClient};
pub use config::{ClearMode, ListConfig};
pub use controller::{InfiniteList, ListView, LoadOutcome};
pub use error::{ListError, Result};
pub use fetcher::{FnFetcher, PageFetcher};
pub use mutation::{
    MutationBackend, MutationOutcome, MutationSnapshot, MutationSynchronizer, PendingMutation,
};
pub use policy::{decide_next, Continuation};
pub use query::{Cursor, IdentityFilter, ListItem, PageEnvelope, PageRequest, QueryIdentity};

/// Infinilist version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

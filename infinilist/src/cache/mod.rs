// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Client-side page cache
//!
//! - `entry`: accumulated pages of one identity and its flattened view
//! - `store`: the keyed, per-identity single-writer store
//! - `inflight`: at-most-one-fetch-per-identity guard with generations
//! - `flags`: favorite/follow side-table

pub mod entry;
pub mod flags;
pub mod inflight;
pub mod store;

pub use entry::{CacheEntry, FetchToken, FlattenedView, RemovedRow};
pub use flags::FlagTable;
pub use inflight::{Begin, FetchSlots, FetchState, FetchTicket};
pub use store::{CacheStore, StoreStats};

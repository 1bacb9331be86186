// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Query identities, cursors and page envelopes

pub mod identity;
pub mod page;

pub use identity::{IdentityFilter, QueryIdentity};
pub use page::{Cursor, ListItem, PageEnvelope, PageRequest};

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Boolean side-table keyed by item id (favorite / follow state)
//!
//! Flags live outside the cached pages because detail views that never went
//! through the page cache must see them too. List views consult this table to
//! override whatever flag a cached row still carries.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

pub struct FlagTable<Id> {
    flags: RwLock<HashMap<Id, bool>>,
}

impl<Id: Clone + Eq + Hash> FlagTable<Id> {
    pub fn new() -> Self {
        Self {
            flags: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &Id) -> Option<bool> {
        self.flags.read().get(id).copied()
    }

    /// Set the flag, returning the previous side-table value
    pub fn set(&self, id: Id, value: bool) -> Option<bool> {
        self.flags.write().insert(id, value)
    }

    /// Flip the flag. `fallback` is used when the table has no value yet,
    /// typically the flag embedded in the row the user is looking at.
    /// Returns the new value and the previous side-table value.
    pub fn toggle(&self, id: Id, fallback: bool) -> (bool, Option<bool>) {
        let mut flags = self.flags.write();
        let current = flags.get(&id).copied().unwrap_or(fallback);
        let previous = flags.insert(id, !current);
        (!current, previous)
    }

    /// Undo a `set`/`toggle` given the previous value it returned
    pub fn restore(&self, id: &Id, previous: Option<bool>) {
        let mut flags = self.flags.write();
        match previous {
            Some(value) => {
                flags.insert(id.clone(), value);
            }
            None => {
                flags.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.flags.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.read().is_empty()
    }

    pub fn clear(&self) {
        self.flags.write().clear();
    }
}

impl<Id: Clone + Eq + Hash> Default for FlagTable<Id> {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! List engine configuration and presets

use crate::error::{ListError, Result};
use serde::{Deserialize, Serialize};

/// How an explicit "clear" mutation treats matching cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearMode {
    /// Replace the pages with a single empty page (`rows: [], total: 0`)
    #[default]
    Reset,
    /// Drop the entry outright
    Remove,
}

/// Configuration shared by every list created from one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Page size sent to the backend
    pub page_size: usize,

    /// Use `page_size` as the continuation policy's short-page hint
    pub use_page_size_hint: bool,

    /// What clear mutations do to matching entries
    pub clear_mode: ClearMode,

    /// Soft cap on cached identities; `None` keeps every entry
    pub max_entries: Option<usize>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            use_page_size_hint: true,
            clear_mode: ClearMode::Reset,
            max_entries: None,
        }
    }
}

impl ListConfig {
    /// Small pages and a bounded cache, for memory-constrained clients
    pub fn compact() -> Self {
        Self {
            page_size: 10,
            max_entries: Some(32),
            ..Self::default()
        }
    }

    /// Rely on `hasNext`/`total` only; short pages do not end the list
    pub fn trusting_server() -> Self {
        Self {
            use_page_size_hint: false,
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_clear_mode(mut self, clear_mode: ClearMode) -> Self {
        self.clear_mode = clear_mode;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Hint handed to the continuation policy
    pub fn page_size_hint(&self) -> Option<usize> {
        self.use_page_size_hint.then_some(self.page_size)
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ListConfig =
            serde_json::from_str(json).map_err(|e| ListError::Config(e.to_string()))?;
        config.validate().map_err(ListError::Config)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size must be > 0".to_string());
        }

        if self.max_entries == Some(0) {
            return Err("max_entries must be > 0 when set".to_string());
        }

        Ok(())
    }
}

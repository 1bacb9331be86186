// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Fixture-backed stand-ins for the REST backend
//!
//! A fixture is a JSON array of objects carrying a numeric `id` (or an object
//! wrapping that array under `items`). Query parameters filter rows by field
//! equality, pages are 1-based slices, and failures can be injected at random.

use async_trait::async_trait;
use infinilist::{
    ListError, ListItem, MutationBackend, PageEnvelope, PageFetcher, PageRequest, Result,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One fixture row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureItem {
    pub id: u64,

    #[serde(default)]
    pub favorite: bool,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ListItem for FixtureItem {
    type Id = u64;

    fn item_id(&self) -> u64 {
        self.id
    }

    fn apply_flag(&mut self, flag: bool) {
        self.favorite = flag;
    }
}

impl FixtureItem {
    /// Whether every query parameter matches the row's field of the same name
    fn matches(&self, params: &Value) -> bool {
        let Some(params) = params.as_object() else {
            return true;
        };
        params.iter().all(|(key, expected)| match self.fields.get(key) {
            Some(actual) => field_eq(actual, expected),
            None => false,
        })
    }
}

/// Parameters arrive from the command line as strings; compare by text when the
/// fixture holds a number or bool
fn field_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a == b,
        (a, Value::String(b)) => a.to_string() == *b,
        (a, b) => a == b,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Rows(Vec<FixtureItem>),
    Wrapped { items: Vec<FixtureItem> },
}

/// Parse fixture rows from JSON text
pub fn parse(json: &str) -> std::result::Result<Vec<FixtureItem>, serde_json::Error> {
    Ok(match serde_json::from_str::<FixtureFile>(json)? {
        FixtureFile::Rows(items) | FixtureFile::Wrapped { items } => items,
    })
}

/// Read and parse a fixture file
pub fn load(path: &Path) -> std::result::Result<Vec<FixtureItem>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read fixture {}: {}", path.display(), e))?;
    let items = parse(&text).map_err(|e| format!("Invalid fixture {}: {}", path.display(), e))?;
    log::debug!("Loaded {} fixture rows from {}", items.len(), path.display());
    Ok(items)
}

/// What the simulated endpoint reports besides rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub report_total: bool,
    pub report_has_next: bool,
    pub fail_rate: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            report_total: true,
            report_has_next: true,
            fail_rate: 0.0,
        }
    }
}

/// Page fetcher serving slices of the fixture
pub struct FixtureFetcher {
    items: Vec<FixtureItem>,
    envelope: Envelope,
    rng: Mutex<fastrand::Rng>,
}

impl FixtureFetcher {
    pub fn new(items: Vec<FixtureItem>, envelope: Envelope, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            items,
            envelope,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PageFetcher<FixtureItem> for FixtureFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<FixtureItem>> {
        if self.envelope.fail_rate > 0.0 && self.rng.lock().f64() < self.envelope.fail_rate {
            return Err(ListError::fetch_failed(
                &request.identity,
                request.cursor,
                "injected failure",
            ));
        }

        let matching: Vec<&FixtureItem> = self
            .items
            .iter()
            .filter(|item| item.matches(request.identity.params()))
            .collect();
        let start = (request.cursor.index() as usize - 1).saturating_mul(request.page_size);
        let end = start.saturating_add(request.page_size).min(matching.len());
        let rows = matching
            .get(start..end)
            .map(|slice| slice.iter().map(|item| (*item).clone()).collect())
            .unwrap_or_default();

        let mut page = PageEnvelope::new(rows);
        if self.envelope.report_total {
            page = page.with_total(matching.len() as u64);
        }
        if self.envelope.report_has_next {
            page = page.with_has_next(end < matching.len());
        }
        Ok(page)
    }
}

/// Simulated mutation endpoint: accepts or rejects everything
pub struct FixtureBackend {
    reject: bool,
}

impl FixtureBackend {
    pub fn new(reject: bool) -> Self {
        Self { reject }
    }

    fn answer(&self, action: String) -> Result<()> {
        if self.reject {
            log::info!("Backend rejected: {}", action);
            Err(ListError::rejected(format!("{} refused by server", action)))
        } else {
            log::info!("Backend accepted: {}", action);
            Ok(())
        }
    }
}

#[async_trait]
impl MutationBackend<u64> for FixtureBackend {
    async fn remove(&self, id: &u64) -> Result<()> {
        self.answer(format!("remove {}", id))
    }

    async fn clear(&self, filter_type: Option<&str>) -> Result<()> {
        self.answer(format!("clear {}", filter_type.unwrap_or("all")))
    }

    async fn set_flag(&self, id: &u64, value: bool) -> Result<()> {
        self.answer(format!("favorite {} = {}", id, value))
    }
}

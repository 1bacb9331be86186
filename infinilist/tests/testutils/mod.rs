//! Shared fixtures for integration tests: a product row type, page fetchers
//! with scripted behavior, and a mutation backend that can be told to reject.

#![allow(dead_code)]

use async_trait::async_trait;
use infinilist::{
    Cursor, ListError, ListItem, MutationBackend, PageEnvelope, PageFetcher, PageRequest, Result,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub favorite: bool,
}

impl Product {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("product-{}", id),
            favorite: false,
        }
    }
}

impl ListItem for Product {
    type Id = u32;

    fn item_id(&self) -> u32 {
        self.id
    }

    fn apply_flag(&mut self, flag: bool) {
        self.favorite = flag;
    }
}

pub fn products(ids: std::ops::RangeInclusive<u32>) -> Vec<Product> {
    ids.map(Product::new).collect()
}

pub fn ids(rows: &[Product]) -> Vec<u32> {
    rows.iter().map(|p| p.id).collect()
}

/// Optional barrier a fetcher or backend waits on before answering
#[derive(Clone, Default)]
pub struct Gate {
    notify: Option<Arc<Notify>>,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            notify: Some(Arc::new(Notify::new())),
        }
    }

    pub fn open(&self) {
        if let Some(notify) = &self.notify {
            notify.notify_one();
        }
    }

    async fn pass(&self) {
        if let Some(notify) = &self.notify {
            notify.notified().await;
        }
    }
}

/// Serves slices of a fixed catalog like a REST endpoint would
pub struct CatalogFetcher {
    items: Vec<Product>,
    report_total: bool,
    report_has_next: bool,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<Cursor>>,
    failures: Mutex<VecDeque<String>>,
    gate: Mutex<Gate>,
}

impl CatalogFetcher {
    pub fn new(items: Vec<Product>) -> Self {
        Self {
            items,
            report_total: true,
            report_has_next: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate: Mutex::new(Gate::default()),
        }
    }

    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    pub fn with_has_next(mut self) -> Self {
        self.report_has_next = true;
        self
    }

    /// Make the next fetch fail with `reason`
    pub fn fail_next(&self, reason: &str) {
        self.failures.lock().push_back(reason.to_string());
    }

    /// Hold every following fetch until the returned gate is opened
    pub fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.lock() = gate.clone();
        gate
    }

    pub fn release(&self) {
        *self.gate.lock() = Gate::default();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<Cursor> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PageFetcher<Product> for CatalogFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<Product>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.cursor);

        let gate = self.gate.lock().clone();
        gate.pass().await;

        if let Some(reason) = self.failures.lock().pop_front() {
            return Err(ListError::fetch_failed(&request.identity, request.cursor, reason));
        }

        let start = (request.cursor.index() as usize - 1) * request.page_size;
        let end = (start + request.page_size).min(self.items.len());
        let rows = if start < self.items.len() {
            self.items[start..end].to_vec()
        } else {
            Vec::new()
        };

        let mut page = PageEnvelope::new(rows);
        if self.report_total {
            page = page.with_total(self.items.len() as u64);
        }
        if self.report_has_next {
            page = page.with_has_next(end < self.items.len());
        }
        Ok(page)
    }
}

/// Returns scripted envelopes per cursor, in order
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<u32, VecDeque<PageEnvelope<Product>>>>,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, cursor: u32, page: PageEnvelope<Product>) -> Self {
        self.pages.lock().entry(cursor).or_default().push_back(page);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher<Product> for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<Product>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .get_mut(&request.cursor.index())
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| {
                ListError::fetch_failed(&request.identity, request.cursor, "no scripted page")
            })
    }
}

/// Server side of mutations: records calls, optionally rejects, optionally waits
#[derive(Default)]
pub struct ScriptedBackend {
    reject: AtomicBool,
    pub calls: AtomicUsize,
    pub log: Mutex<Vec<String>>,
    gate: Mutex<Gate>,
}

impl ScriptedBackend {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        let backend = Self::default();
        backend.reject.store(true, Ordering::SeqCst);
        backend
    }

    pub fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.lock() = gate.clone();
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, what: String) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(what.clone());
        let gate = self.gate.lock().clone();
        gate.pass().await;
        if self.reject.load(Ordering::SeqCst) {
            Err(ListError::rejected(format!("{} refused", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MutationBackend<u32> for ScriptedBackend {
    async fn remove(&self, id: &u32) -> Result<()> {
        self.answer(format!("remove {}", id)).await
    }

    async fn clear(&self, filter_type: Option<&str>) -> Result<()> {
        self.answer(format!("clear {}", filter_type.unwrap_or("all"))).await
    }

    async fn set_flag(&self, id: &u32, value: bool) -> Result<()> {
        self.answer(format!("flag {} {}", id, value)).await
    }
}

/// Route library logs to the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Yield until `condition` holds
pub async fn until(condition: impl Fn() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for infinilist
//!
//! Each subcommand builds a client from the configuration, opens a list over the
//! fixture and drives it the way a scrolling UI would.

pub mod commands;
pub mod fixture;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat, SourceArgs};

use colored::Colorize;
use fixture::{Envelope, FixtureBackend, FixtureFetcher, FixtureItem};
use infinilist::{
    IdentityFilter, InfiniteList, ListClient, ListConfig, LoadOutcome, QueryIdentity,
};
use output::ViewFormatter;
use serde_json::{Map, Value};
use std::sync::Arc;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Client, list and view format assembled from the source arguments
struct Session {
    client: ListClient<FixtureItem>,
    list: InfiniteList<FixtureItem>,
    format: OutputFormat,
}

impl Session {
    fn open(source: &SourceArgs) -> CliResult<Self> {
        let items = fixture::load(&source.fixture)?;

        let mut config = match &source.config {
            Some(path) => ListConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            None => ListConfig::default(),
        };
        if let Some(page_size) = source.page_size {
            config = config.with_page_size(page_size);
        }
        let client = ListClient::new(config)?;

        if !(0.0..=1.0).contains(&source.fail_rate) {
            return Err(format!("--fail-rate must be within 0.0 and 1.0, got {}", source.fail_rate).into());
        }
        let envelope = Envelope {
            report_total: !source.hide_total,
            report_has_next: !source.hide_has_next,
            fail_rate: source.fail_rate,
        };
        let fetcher = Arc::new(FixtureFetcher::new(items, envelope, source.seed));
        let identity = QueryIdentity::from_value(source.resource.clone(), parse_params(&source.params)?);
        log::debug!("Opening list {}", identity);
        let list = client.list(identity, fetcher);

        Ok(Self {
            client,
            list,
            format: source.format,
        })
    }

    /// Load up to `pages` pages (all when `None`), retrying each failed fetch up
    /// to `retries` times
    async fn load(&self, pages: Option<usize>, retries: u32) -> CliResult<()> {
        let mut loaded = 0;
        let mut attempts = 0;
        while pages.map_or(true, |max| loaded < max) {
            let step = if loaded == 0 {
                self.list.initialize().await
            } else {
                self.list.load_more().await
            };
            match step {
                Ok(LoadOutcome::Fetched { cursor, rows }) => {
                    log::info!("Fetched page {} ({} rows)", cursor, rows);
                    loaded += 1;
                    attempts = 0;
                }
                Ok(LoadOutcome::Cached) => loaded += 1,
                Ok(outcome) => {
                    log::debug!("Stopped paging: {:?}", outcome);
                    break;
                }
                Err(error) if error.is_retryable() && attempts < retries => {
                    attempts += 1;
                    log::warn!("{} (retry {}/{})", error, attempts, retries);
                }
                // Rows fetched so far stay visible; the error shows in the view
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn print(&self) {
        print!("{}", ViewFormatter::format(&self.list.view(), self.format));
    }
}

/// Turn `key=value` arguments into the identity's parameter object
fn parse_params(params: &[String]) -> CliResult<Value> {
    let mut map = Map::new();
    for param in params {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| format!("Invalid --param '{}': expected KEY=VALUE", param))?;
        map.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }
    Ok(Value::Object(map))
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

pub fn handle_browse(source: SourceArgs, pages: Option<usize>, retries: u32) -> CliResult<()> {
    runtime()?.block_on(browse(source, pages, retries))
}

pub fn handle_remove(source: SourceArgs, id: u64, pages: usize, reject: bool) -> CliResult<()> {
    runtime()?.block_on(remove(source, id, pages, reject))
}

pub fn handle_clear(
    source: SourceArgs,
    filter_type: Option<String>,
    pages: usize,
    reject: bool,
) -> CliResult<()> {
    runtime()?.block_on(clear(source, filter_type, pages, reject))
}

pub fn handle_favorite(source: SourceArgs, id: u64, reject: bool) -> CliResult<()> {
    runtime()?.block_on(favorite(source, id, reject))
}

async fn browse(source: SourceArgs, pages: Option<usize>, retries: u32) -> CliResult<()> {
    let session = Session::open(&source)?;
    session.load(pages, retries).await?;
    session.print();
    Ok(())
}

async fn remove(source: SourceArgs, id: u64, pages: usize, reject: bool) -> CliResult<()> {
    let session = Session::open(&source)?;
    session.load(Some(pages), 0).await?;

    let backend = FixtureBackend::new(reject);
    let filter = IdentityFilter::resource(source.resource.clone());
    match session.client.mutations().remove(&backend, &filter, &id).await {
        Ok(()) => println!("{}", format!("Removed item {}", id).green()),
        Err(error) => println!("{} {}", "Rolled back:".bold().yellow(), error),
    }
    session.print();
    Ok(())
}

async fn clear(
    source: SourceArgs,
    filter_type: Option<String>,
    pages: usize,
    reject: bool,
) -> CliResult<()> {
    let session = Session::open(&source)?;
    session.load(Some(pages), 0).await?;

    let backend = FixtureBackend::new(reject);
    let mut filter = IdentityFilter::resource(source.resource.clone());
    if let Some(filter_type) = &filter_type {
        filter = filter.with_param("type", filter_type.as_str());
    }
    let cleared = session
        .client
        .mutations()
        .clear(&backend, &filter, filter_type.as_deref())
        .await;
    match cleared {
        Ok(()) => println!("{}", "Cleared".green()),
        Err(error) => println!("{} {}", "Rolled back:".bold().yellow(), error),
    }
    session.print();
    Ok(())
}

async fn favorite(source: SourceArgs, id: u64, reject: bool) -> CliResult<()> {
    let session = Session::open(&source)?;
    session.load(Some(1), 0).await?;

    let embedded = session
        .list
        .view()
        .rows
        .iter()
        .find(|row| row.id == id)
        .map(|row| row.favorite)
        .unwrap_or(false);
    let backend = FixtureBackend::new(reject);
    match session
        .client
        .mutations()
        .toggle_favorite(&backend, &id, embedded)
        .await
    {
        Ok(value) => println!("{}", format!("Item {} favorite = {}", id, value).green()),
        Err(error) => println!("{} {}", "Rolled back:".bold().yellow(), error),
    }
    session.print();
    Ok(())
}

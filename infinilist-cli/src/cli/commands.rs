// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "infinilist",
    version,
    about = "Page through list fixtures with the infinilist engine",
    long_about = "Drives infinite lists against a JSON fixture that stands in for the REST backend.\n\n\
                  Shows paging heuristics, injected fetch failures and optimistic mutations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Explicit log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch pages from a fixture and print the flattened list
    Browse {
        #[command(flatten)]
        source: SourceArgs,

        /// Stop after this many pages (default: until the list is exhausted)
        #[arg(long)]
        pages: Option<usize>,

        /// Retry a failed page fetch this many times
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },

    /// Load pages, then optimistically remove one item from every list of the resource
    Remove {
        #[command(flatten)]
        source: SourceArgs,

        /// Item id to remove
        #[arg(long)]
        id: u64,

        /// Pages to load before removing
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Make the simulated server reject the removal
        #[arg(long)]
        reject: bool,
    },

    /// Load pages, then clear lists of the resource (optionally one type only)
    Clear {
        #[command(flatten)]
        source: SourceArgs,

        /// Only clear lists whose `type` parameter equals this value
        #[arg(long = "type")]
        filter_type: Option<String>,

        /// Pages to load before clearing
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Make the simulated server reject the clear
        #[arg(long)]
        reject: bool,
    },

    /// Load pages, then toggle the favorite flag of one item
    Favorite {
        #[command(flatten)]
        source: SourceArgs,

        /// Item id to toggle
        #[arg(long)]
        id: u64,

        /// Make the simulated server reject the change
        #[arg(long)]
        reject: bool,
    },

    /// Show version information
    Version,
}

/// Where rows come from and how the simulated backend behaves
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// JSON fixture: an array of objects with an `id`, or `{ "items": [...] }`
    #[arg(long, short = 'f', value_name = "PATH")]
    pub fixture: PathBuf,

    /// Logical resource name of the list
    #[arg(long, default_value = "items")]
    pub resource: String,

    /// Query parameter `key=value`; rows whose field differs are filtered out
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// List configuration file (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Page size (overrides the configuration file)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Do not report `total` in page envelopes
    #[arg(long)]
    pub hide_total: bool,

    /// Do not report `hasNext` in page envelopes
    #[arg(long)]
    pub hide_has_next: bool,

    /// Probability (0.0 - 1.0) that a page fetch fails
    #[arg(long, default_value_t = 0.0)]
    pub fail_rate: f64,

    /// Seed for failure injection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

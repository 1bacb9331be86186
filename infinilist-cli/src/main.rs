// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Infinilist CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "Infinilist".bold().green(), infinilist::VERSION);
            println!("Paginated lists with a coherent client-side cache");
            Ok(())
        }

        Commands::Browse {
            source,
            pages,
            retries,
        } => cli::handle_browse(source, pages, retries),

        Commands::Remove {
            source,
            id,
            pages,
            reject,
        } => cli::handle_remove(source, id, pages, reject),

        Commands::Clear {
            source,
            filter_type,
            pages,
            reject,
        } => cli::handle_clear(source, filter_type, pages, reject),

        Commands::Favorite { source, id, reject } => cli::handle_favorite(source, id, reject),
    }
}

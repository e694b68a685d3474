// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Binary entry point for the teldoor reactor server.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Binary entry point for the teldoor reactor server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::LevelFilter;

use teldoor::{DoorConfig, DoorServer, FsGateway};

/// teldoor server command-line arguments.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Minimal remote file shell over TCP", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TCP port to listen on (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Directory served as the shell root (overrides the config file).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => DoorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DoorConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(root) = cli.root {
        config.root = root;
    }

    let gateway = FsGateway::new(&config.root)
        .with_context(|| format!("failed to prepare root {}", config.root.display()))?;
    let server = DoorServer::start(&config, gateway).context("failed to start reactor")?;
    server.join();
    Ok(())
}

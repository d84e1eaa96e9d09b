//! # foldconf
//!
//! `foldconf` inspects folders of YAML documents the way the collection
//! engine sees them: which items load, in what order, which are enabled,
//! and the content hash each one is diffed by.
//!
//! ## Usage
//!
//! ```sh
//! foldconf list ./arenas --order-by priority --enabled-field enabled
//! foldconf hash ./arenas/dunes.yml
//! foldconf canonical ./arenas/dunes.yml
//! foldconf check ./arenas
//! ```

use anyhow::Result;
use clap::Parser as _;
use foldconf::cli::Args;
use foldconf::error::ConfigError;
use foldconf::system::RealSystem;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match foldconf::cli::run(&args, Arc::new(RealSystem::new())) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(
                err.downcast_ref::<ConfigError>()
                    .map_or(1, ConfigError::exit_code),
            );
        }
    }
}

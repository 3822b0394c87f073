//! envshare - share environment variables between shell sessions.
//!
//! Shells call this binary from their hooks: `share` publishes variables from
//! the calling environment, `export` prints statements that apply the shared
//! values when `eval`ed from a prompt hook.

mod commands;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use envshare_core::config::{LockConfig, PathsConfig};
use envshare_core::SharedCacheConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "envshare")]
#[command(about = "Share environment variables between shell sessions")]
struct Args {
    /// Shared backing file (defaults to cachefile in the temp directory)
    #[arg(long, global = true, env = PathsConfig::CACHE_FILE_ENV)]
    cache_file: Option<PathBuf>,

    /// How long to wait for the lock before giving up, in milliseconds
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Share variables from this environment with other sessions
    Share {
        /// Variable names to share
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the shared values
    Show {
        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },
    /// Print shell statements that apply the shared values
    Export,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so `export` output stays safe to eval
    let log_level = if args.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = build_config(args.cache_file, args.lock_timeout_ms);
    debug!("Shared cache file: {}", config.cache_file.display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Share { names } => commands::share(config, &names, &mut out),
        Command::Show { json } => commands::show(config, json, &mut out),
        Command::Export => commands::export(config, &mut out),
    }
}

fn build_config(cache_file: Option<PathBuf>, lock_timeout_ms: Option<u64>) -> SharedCacheConfig {
    let config = match cache_file {
        Some(path) => SharedCacheConfig::new(path),
        None => SharedCacheConfig::default(),
    };
    config.with_lock_timeout(
        lock_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(LockConfig::ACQUIRE_TIMEOUT),
    )
}

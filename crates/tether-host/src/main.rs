//! # tether
//!
//! Extension host binary — speaks newline-delimited JSON over
//! stdin/stdout and relays events and tool invocations to loaded
//! extensions.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tether_host::router::MessageRouter;
use tether_host::transport::LineTransport;

/// Tether extension host.
#[derive(Parser, Debug)]
#[command(name = "tether", about = "Headless extension host bridge")]
struct Cli {
    /// Default working directory for extension contexts.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Tracing filter (overrides `RUST_LOG`), e.g. `info` or
    /// `tether_extensions=debug`.
    #[arg(long)]
    log_filter: Option<String>,
}

/// Install the tracing subscriber.
///
/// Diagnostics go to stderr: stdout carries the protocol and must stay
/// clean.
fn init_tracing(filter: Option<&str>) {
    let env_filter = match filter {
        Some(spec) => EnvFilter::new(spec),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    // 1. Resolve the default context cwd.
    let cwd = match cli.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to resolve working directory")?,
    };
    info!(cwd = %cwd.display(), "Starting extension host");

    // 2. Wire the router to real stdin/stdout.
    let mut router = MessageRouter::new(cwd);
    let mut transport = LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());

    // 3. Serve until the input stream closes. Only transport failures
    //    escape; everything per-message is answered as data.
    if let Err(err) = router.run(&mut transport).await {
        error!(error = %err, "Transport failure; exiting");
        return Err(err).context("Extension host transport failed");
    }

    info!("Input closed; exiting cleanly");
    Ok(())
}

mod client;
mod commands;
mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inksync_core::Collection;
use inksync_sync::RelayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use client::JoinOptions;
use config::FileConfig;

/// Shared whiteboard with delta sync over a WebSocket relay
#[derive(Parser, Debug)]
#[command(name = "inksync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/inksync/config.json)
    #[arg(long, global = true, env = "INKSYNC_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run a relay that forwards every frame to the other clients
    Relay {
        /// Address to listen on
        #[arg(long, env = "INKSYNC_BIND", value_name = "ADDR")]
        bind: Option<String>,

        /// Also send each frame back to its sender
        #[arg(long)]
        echo: bool,
    },
    /// Join a whiteboard and drive it with commands on stdin
    Join {
        /// Relay URL
        #[arg(long, env = "INKSYNC_URL", value_name = "URL")]
        url: Option<String>,

        /// Work locally without connecting
        #[arg(long, conflicts_with = "url")]
        offline: bool,
    },
    /// Validate a snapshot file and summarize it
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let file_config = FileConfig::load(args.config.as_deref())?;

    match args.command {
        Cmd::Relay { bind, echo } => run_relay(&file_config, bind, echo),
        Cmd::Join { url, offline } => client::run(JoinOptions {
            ws: (!offline).then(|| file_config.ws_config(url)),
            sync: file_config.sync_config(),
            style: file_config.style(),
        }),
        Cmd::Check { file } => run_check(&file),
    }
}

/// Logs go to stderr so stdout stays clean for command output
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inksync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_relay(file_config: &FileConfig, bind: Option<String>, echo: bool) -> Result<()> {
    let relay_config = file_config.relay_config(bind, echo);
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    rt.block_on(async move {
        let server = RelayServer::bind(relay_config).await?;
        println!("relay listening on ws://{}", server.local_addr()?);
        let stats = server.stats_handle();

        tokio::select! {
            result = server.run() => result,
            _ = tokio::signal::ctrl_c() => {
                let stats = stats.snapshot();
                info!(
                    connections = stats.total_connections,
                    relayed = stats.frames_relayed,
                    dropped = stats.frames_dropped,
                    "relay shutting down"
                );
                Ok(())
            }
        }
    })
}

fn run_check(path: &Path) -> Result<()> {
    let collection = Collection::load(path)
        .with_context(|| format!("{} is not a valid snapshot", path.display()))?;

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for element in &collection {
        *kinds.entry(element.kind()).or_default() += 1;
    }

    println!("{}: {} element(s)", path.display(), collection.len());
    for (kind, count) in kinds {
        println!("  {kind}: {count}");
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use playground_core::PlaygroundConfig;
use playground_share::{FsShareStore, MemoryShareStore, ShareService, ShareStore};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "playgroundd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Share server for the parameters playground", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Directory shared templates are written to
    #[arg(long)]
    share_dir: Option<PathBuf>,

    /// Keep shared templates in memory only
    #[arg(long)]
    memory: bool,

    /// Config file (TOML)
    #[arg(long, env = "PLAYGROUND_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    playground_core::telemetry::init_tracing(args.json, level);

    let mut config =
        PlaygroundConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(dir) = args.share_dir {
        config.share_dir = dir;
    }

    let store: Arc<dyn ShareStore> = if args.memory {
        info!("using in-memory share store");
        Arc::new(MemoryShareStore::new())
    } else {
        info!(dir = ?config.share_dir, "using filesystem share store");
        Arc::new(
            FsShareStore::new(&config.share_dir)
                .with_context(|| format!("Failed to open share store at {:?}", config.share_dir))?,
        )
    };
    let service = ShareService::new(store, config.max_share_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    playgroundd::serve(listener, playgroundd::router(service), async {
        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");
    })
    .await?;
    Ok(())
}

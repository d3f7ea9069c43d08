use anyhow::Context;
use clap::Parser;
use forumdb::config::{BackendKind, Config};
use forumdb::{clock, server, web, Database};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forumdb")]
#[command(version)]
#[command(about = "Forum storage server: RESP protocol plus a JSON operations endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend: memory or sharded
    #[arg(long)]
    backend: Option<String>,

    /// Shard count for the sharded backend (0 = one per CPU)
    #[arg(long)]
    shards: Option<usize>,

    /// Disable the append-only file
    #[arg(long)]
    no_aof: bool,

    /// Log level when RUST_LOG is unset: error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(backend) = &cli.backend {
        config.storage.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(shards) = cli.shards {
        config.storage.shards = shards;
    }
    if cli.no_aof {
        config.aof.enabled = false;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "forumdb {} starting ({} backend)",
        env!("CARGO_PKG_VERSION"),
        config.storage.backend
    );

    let clock = clock::system();
    let db = Database::open_with_clock(&config, clock.clone())
        .await
        .context("failed to open database")?;
    info!("Database ready with {} shard(s)", db.backend().num_shards());

    let resp_addr = config.server.resp_addr.clone();
    let backend = db.backend().clone();
    let resp_handle = tokio::spawn(async move {
        if let Err(e) = server::run(&resp_addr, backend).await {
            error!("RESP server error: {}", e);
        }
    });

    let web_handle = if config.server.web_enabled {
        let web_addr = config.server.web_addr.clone();
        let db = db.clone();
        tokio::spawn(async move {
            if let Err(e) = web::run(&web_addr, db, clock).await {
                error!("Operations endpoint error: {}", e);
            }
        })
    } else {
        tokio::spawn(std::future::pending::<()>())
    };

    tokio::select! {
        _ = resp_handle => error!("RESP server stopped"),
        _ = web_handle => error!("Operations endpoint stopped"),
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}

//! Forum server
//!
//! # Architecture Overview
//!
//! ```text
//!   conf/*.ini, conf/compress.json
//!        │
//!        ▼
//!   ┌──────────┐  trigger  ┌──────────────────┐  reload  ┌──────────────┐
//!   │ watcher  │──────────▶│ reload registry  │─────────▶│ settings /   │
//!   │ (notify) │           │ + debouncer      │          │ locales /    │
//!   └──────────┘           └──────────────────┘          │ assets       │
//!                                                        └──────┬───────┘
//!                                                               │ ArcSwap
//!                                                               ▼
//!   Client ─────────────────────────▶ axum handlers ──▶ one snapshot per request
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use forum_server::assets::{AssetCompressor, AssetSettings, BundleCompressor, CompressOptions};
use forum_server::config::derive::derive_settings;
use forum_server::config::ConfigPaths;
use forum_server::http::{AppState, HttpServer};
use forum_server::lifecycle::{self, signals, Shutdown};
use forum_server::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "forum-server", version, about = "Community forum server")]
struct Args {
    /// Configuration directory (watched for changes).
    #[arg(short, long, default_value = "conf")]
    conf_dir: PathBuf,

    /// Listen address; defaults to 0.0.0.0 and `[app] http_port`.
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Disable config hot reload.
    #[arg(long)]
    no_watch: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the asset bundles declared in compress.json and exit
    Compress {
        /// Rebuild bundles that are already up to date
        #[arg(short, long)]
        force: bool,

        /// Log every bundle written
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let log = logging::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "forum-server starting");

    let paths = ConfigPaths::new(&args.conf_dir);
    if let Some(Command::Compress { force, verbose }) = args.command {
        return compress(&paths, CompressOptions { force, verbose });
    }

    let app = match lifecycle::bootstrap(paths, Arc::new(BundleCompressor::new("."))) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let settings = app.store.snapshot();
    log.apply_run_mode(settings.run_mode);

    if settings.metrics.enabled {
        match settings.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %settings.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let mut background = app.start_background(&shutdown, !args.no_watch);
    background.push(log.follow_run_mode(app.store.clone(), shutdown.subscribe()));

    let bind = args
        .bind
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], settings.http_port)));
    let listener = TcpListener::bind(bind).await?;
    drop(settings);

    let server = HttpServer::new(AppState::from(&app));
    let server_shutdown = shutdown.subscribe();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_shutdown().await;
            shutdown.trigger();
        });
    }

    server.run(listener, server_shutdown).await?;

    for task in background {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// One-off bundling, independent of run mode.
fn compress(
    paths: &ConfigPaths,
    options: CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = paths.ini_source().load()?;
    let settings = derive_settings(&raw, None)?;
    let assets = AssetSettings::load_json(&paths.compress_json(), true, &settings.app.url)?;

    let report = BundleCompressor::new(".").compress(&assets, options)?;
    tracing::info!(
        written = report.written,
        unchanged = report.unchanged,
        "Asset compression finished"
    );
    Ok(())
}

//! Private relay server.
//!
//! The trusted relay used as the router's `private-relay` path. Forwards
//! browser and client requests to a fixed upstream API, adding CORS headers
//! and an optional secret header the client never sees.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────┐
//!                   │                 RELAY SERVER                  │
//!                   │                                               │
//!   Client request  │  ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//!   ────────────────┼─▶│ listener │──▶│ middleware │──▶│ handler │─┼──▶ Upstream API
//!                   │  │ (TLS opt)│   │ id/trace/  │   │ origin, │ │
//!                   │  └──────────┘   │ timeout/   │   │ headers │ │
//!                   │                 │ body limit │   └────┬────┘ │
//!   Client response │                 └────────────┘        │      │
//!   ◀───────────────┼───────────── CORS + upstream body ◀───┘      │
//!                   │                                               │
//!                   │  config (TOML, hot reload) · logging · metrics│
//!                   └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use relay_router::config::{load_or_default, watcher::ConfigWatcher};
use relay_router::lifecycle::Shutdown;
use relay_router::net::load_tls_config;
use relay_router::observability::{logging, metrics};
use relay_router::relay::{RelayServer, RelaySettings};

#[derive(Parser)]
#[command(name = "relay-router")]
#[command(about = "Private relay server for the multi-path request router", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay-router.toml")]
    config: PathBuf,

    /// Override `relay.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload relay settings when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = load_or_default(&args.config)?;
    if let Some(bind) = args.bind {
        config.relay.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay-router starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        bind_address = %config.relay.bind_address,
        fixed_target = config.relay.target_url.is_some(),
        allow_any_target = config.relay.allow_any_target,
        allowed_origins = config.relay.allowed_origins.len(),
        "Configuration loaded"
    );

    let server = RelayServer::new(&config.relay)?;

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = if args.watch {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config);
        let watcher = watcher.run()?;
        let settings = server.settings();
        tokio::spawn(async move {
            while let Some(new_config) = updates.recv().await {
                settings.store(Arc::new(RelaySettings::from_config(&new_config.relay)));
                tracing::info!("Relay settings reloaded");
            }
        });
        Some(watcher)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move { signal.trigger_on_signal().await });

    match &config.relay.tls {
        Some(tls) => {
            let addr: SocketAddr = config.relay.bind_address.parse()?;
            let tls = load_tls_config(tls).await?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.relay.bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Ledger gate service.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 LEDGER GATE                  │
//!                     │                                              │
//!   transfer / mint   │  ┌───────────┐   ┌───────────┐   ┌────────┐  │
//!   burn / admit ─────┼─▶│  settings │──▶│ whitelist │──▶│limiter │  │
//!                     │  │  (paused) │   │ registry  │   │cap/cd/ │  │
//!                     │  └───────────┘   └───────────┘   │ quota  │  │
//!                     │                                  └───┬────┘  │
//!                     │                                      ▼       │
//!                     │                                 ┌────────┐   │
//!                     │                                 │ ledger │   │
//!                     │                                 └────────┘   │
//!                     │                                              │
//!   operator ─────────┼─▶ admin API (bearer key → operator address)  │
//!                     │                                              │
//!                     │  events · metrics · snapshots · signals      │
//!                     └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use ledger_gate::admin::{serve_admin, setup_admin_router, AdminState};
use ledger_gate::clock::SystemClock;
use ledger_gate::config::load_config;
use ledger_gate::config::validation::{parse_principal, parse_socket};
use ledger_gate::lifecycle::{spawn_periodic_snapshots, spawn_signal_listener, GateService, Shutdown};
use ledger_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ledger-gate")]
#[command(about = "Whitelist and rate-limit admission layer for a token ledger", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ledger-gate.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(args.log_level.as_deref());
            tracing::error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    logging::init_logging(Some(
        args.log_level.as_deref().unwrap_or(&config.observability.log_level),
    ));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ledger-gate starting");

    if config.observability.metrics_enabled {
        let addr = parse_socket("observability.metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr);
    }

    let service = Arc::new(GateService::bootstrap(&config, Arc::new(SystemClock::new()))?);
    let shutdown = Shutdown::new();
    let signals = spawn_signal_listener(shutdown.clone());

    let snapshots = (config.persistence.enabled && config.persistence.snapshot_interval_secs > 0).then(|| {
        spawn_periodic_snapshots(
            service.clone(),
            Duration::from_secs(config.persistence.snapshot_interval_secs),
            shutdown.clone(),
        )
    });

    if config.admin.enabled {
        let state = AdminState {
            service: service.clone(),
            operator: parse_principal("admin.operator", &config.admin.operator)?,
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        let router = setup_admin_router(state, Duration::from_secs(config.admin.request_timeout_secs));
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        serve_admin(listener, router, shutdown.clone()).await?;
    } else {
        tracing::info!("Admin API disabled; waiting for shutdown signal");
        shutdown.wait().await;
    }

    // The admin server can also stop on its own; make sure everything else follows.
    shutdown.trigger();
    let _ = signals.await;
    if let Some(task) = snapshots {
        let _ = task.await;
    }

    match service.save() {
        Ok(Some(path)) => tracing::info!(path = %path.display(), "Final snapshot written"),
        Ok(None) => tracing::debug!("Persistence disabled; no final snapshot"),
        Err(e) => tracing::error!(error = %e, "Failed to write final snapshot"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

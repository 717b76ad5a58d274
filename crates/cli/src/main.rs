//! Aide gateway entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load the JSON config file and apply flag
//!    overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with a JSON (or
//!    text) layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter. All spans and events from every crate flow through it.
//! 3. **Construct infrastructure**: build the trigger cache, the executor pool
//!    over the graph engine, the authority and linguistic clients, and the
//!    token signer, and inject them into the `dispatch` components.
//! 4. **Serve**: run the HTTP surface until SIGINT/SIGTERM, then drain
//!    in-flight requests within the grace period.

mod app;
mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{Args, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = GatewayConfig::load(&args.config_path)?.with_overrides(&args)?;
    let telemetry = telemetry::init(args.log_format, config.otlp_endpoint.as_deref())?;

    let result = run(config).await;
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "Gateway stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let state = app::build_state(&config)?;
    let pool = state.dispatcher.pool().clone();

    let tcp = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("binding {}", config.listen_address))?;
    info!(address = %config.listen_address, "Gateway listening");

    listener::serve(
        tcp,
        listener::build_app(state),
        shutdown_signal(),
        config.shutdown_grace(),
    )
    .await
    .context("serving HTTP")?;

    pool.close();
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

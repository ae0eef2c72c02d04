//! Sentinel Gateway (v1)
//!
//! A latency-budgeted HTTP gateway for the semantic cache engine.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌────────────────────────────────────────────┐
//!                       │              SENTINEL GATEWAY              │
//!   POST /v1/cache/check│  ┌─────────┐   ┌─────────┐   ┌──────────┐  │  gRPC over UDS
//!  ─────────────────────┼─▶│   net   │──▶│  http   │──▶│ backend  │──┼──────────▶ engine
//!                       │  │listener │   │ handler │   │ binding  │  │
//!  ◀────────────────────┼──└─────────┘◀──└─────────┘◀──└──────────┘◀─┼───────────
//!                       │                     │                      │
//!                       │        ┌────────────┴──────────────┐       │
//!                       │        │ resilience: deadline =     │       │
//!                       │        │ min(caller, now + budget)  │       │
//!                       │        └───────────────────────────┘       │
//!                       │  lifecycle: Starting → Warming → Serving   │
//!                       │             → Draining → Stopped           │
//!                       └────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;

use sentinel_gateway::backend::GrpcBackend;
use sentinel_gateway::cli::Cli;
use sentinel_gateway::lifecycle::{signals, Lifecycle};
use sentinel_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sentinel-gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("sentinel-gateway: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("sentinel-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.address,
        service_timeout_ms = ?config.timeouts.service_timeout_ms,
        warmup_timeout_ms = config.backend.warmup_timeout_ms,
        shutdown_grace_secs = config.timeouts.shutdown_grace_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let lifecycle = Lifecycle::new(config);
    let result = lifecycle
        .run(
            |backend| GrpcBackend::connect(&backend.address),
            signals::wait_for_termination(),
        )
        .await;

    match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway terminated");
            ExitCode::FAILURE
        }
    }
}

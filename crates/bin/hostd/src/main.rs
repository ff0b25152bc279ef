//! # libvirt-hostd — libvirt host control daemon
//!
//! Composition root that wires the libvirt session into the HTTP adapter
//! and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialise `tracing`
//! - Connect to libvirtd and complete the handshake; failure is fatal and
//!   happens before anything listens
//! - Construct the dispatch service, injecting the session via the port trait
//! - Build the axum router, bind, and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT), then close the session once
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostd_adapter_http_axum::state::AppState;
use hostd_adapter_libvirt::RemoteSession;
use hostd_app::services::dispatch_service::DispatchService;

use crate::config::Config;

/// Translate VM identifiers into libvirt lifecycle commands over HTTP.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// API bind address:port (overrides the config file and environment).
    #[arg(short = 'b', long = "bind")]
    bind: Option<String>,

    /// Path to a TOML config file (default: `hostd.toml` if present).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = &cli.bind {
        config.set_bind(bind)?;
        config.validate()?;
    }

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Management session
    let session = RemoteSession::connect(&config.libvirt)
        .await
        .with_context(|| format!("failed to connect to libvirt at {}", config.libvirt.address))?;
    tracing::info!(remote = %session.remote_addr(), "connected to libvirt");
    tracing::info!(version = %session.lib_version(), "libvirt library version");

    // Services
    let dispatch_service = Arc::new(DispatchService::with_listing_limit(
        session,
        config.dispatch.listing_limit,
    ));

    // HTTP
    let app = hostd_adapter_http_axum::router::build(AppState::from_arc(Arc::clone(
        &dispatch_service,
    )));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on http://{bind_addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match dispatch_service.session().close().await {
        Ok(()) => tracing::info!("disconnected from libvirt"),
        Err(err) => tracing::error!(error = %err, "failed to disconnect from libvirt"),
    }

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

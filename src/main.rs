//! Decoy Gate entry point
//!
//! Serves the risk API with the reference models behind the routing engine.
//!
//! ## Usage
//!
//! ```bash
//! # Run with defaults (127.0.0.1:8080)
//! decoy-gate
//!
//! # Run with a config file, overriding the port
//! decoy-gate --config gateway.toml --port 9090
//! ```

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use decoy_gate::credentials::{write_token_file, CredentialValidator, TokenRegistry};
use decoy_gate::risk_model::{decoy_factory, AuthoritativeRiskModel};
use decoy_gate::server::{self, AppState};
use decoy_gate::{GatewayConfig, GatewayEngine, SystemClock};

/// Decoy Gate
#[derive(Parser, Debug)]
#[command(name = "decoy-gate")]
#[command(author = "Decoy Gate Team")]
#[command(version)]
#[command(about = "Extraction-resistant risk scoring gateway", long_about = None)]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let registry = Arc::new(TokenRegistry::new());
    let token = registry.issue();
    match &config.server.token_file {
        Some(path) => write_token_file(path, &token)?,
        None => println!("Creator token: {}", token.expose()),
    }
    drop(token);

    let validator: Arc<dyn CredentialValidator> = registry;
    let engine = GatewayEngine::from_config(
        &config,
        Arc::new(SystemClock::new()),
        Arc::new(AuthoritativeRiskModel),
        decoy_factory(),
        validator,
    )?;
    let state = Arc::new(AppState::new(engine, config.server.model_version.clone()));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).with_context(|| format!("failed to bind {}", addr))?;

    info!("Starting Decoy Gate v{}", env!("CARGO_PKG_VERSION"));
    info!("Model version: {}", config.server.model_version);
    info!("History window: {}s", config.history.window_secs);
    info!("Endpoints:");
    info!("  - GET|POST /api/risk - Risk score (Bearer token optional)");
    info!("  - GET /stats         - Routing statistics (JSON)");
    info!("  - GET /metrics       - Routing statistics (Prometheus)");
    info!("  - GET /health        - Health check (JSON)");

    server::run(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}

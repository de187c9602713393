//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                   LOAD BALANCER                   │
//!                 │                                                   │
//!  Client ───────▶│  http::server ──▶ LoadBalancer::serve             │
//!                 │                        │                          │
//!                 │                        ▼                          │
//!                 │               RoundRobinPool::next_available      │
//!                 │                        │                          │
//!  Client ◀───────│  http::forward ◀── Backend::forward ◀─────────────┼──── Backend
//!                 │                                                   │
//!                 │  health::HealthChecker ── every interval ──▶      │
//!                 │      probe each backend ──▶ Backend::set_alive    │
//!                 │                                                   │
//!                 │  lifecycle: SIGINT/SIGTERM → drain → exit         │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rr_balancer::config::load_config;
use rr_balancer::http::HttpServer;
use rr_balancer::lifecycle::{signals, Shutdown};
use rr_balancer::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "RR_BALANCER_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("rr-balancer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %cli.config.display(),
        port = config.server.port,
        backends = config.backend.routes.len(),
        health_interval_secs = config.backend.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(server.config().server.bind_address()).await?;

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

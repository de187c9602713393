//! Demo upstream for local runs: a health endpoint and a JSON echo.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "demo-backend")]
#[command(about = "Demo game backend behind the load balancer", long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Make health checks numbered FROM-TO (inclusive) stall, e.g. `3-5`.
    #[arg(long, value_parser = parse_range)]
    slow_healthcheck: Option<(u64, u64)>,

    /// How long a stalled health check sleeps, in seconds.
    #[arg(long, default_value_t = 50)]
    stall_secs: u64,
}

#[derive(Clone)]
struct AppState {
    health_requests: Arc<AtomicU64>,
    slow_range: Option<(u64, u64)>,
    stall: Duration,
}

fn parse_range(s: &str) -> Result<(u64, u64), String> {
    let (from, to) = s
        .split_once('-')
        .ok_or_else(|| format!("expected FROM-TO, got {s:?}"))?;
    let from: u64 = from.trim().parse().map_err(|e| format!("bad FROM: {e}"))?;
    let to: u64 = to.trim().parse().map_err(|e| format!("bad TO: {e}"))?;
    if from > to {
        return Err(format!("FROM ({from}) is greater than TO ({to})"));
    }
    Ok((from, to))
}

async fn healthcheck(State(state): State<AppState>) -> &'static str {
    let n = state.health_requests.fetch_add(1, Ordering::Relaxed) + 1;
    if let Some((from, to)) = state.slow_range {
        if (from..=to).contains(&n) {
            tracing::info!(request = n, "Stalling health check");
            tokio::time::sleep(state.stall).await;
        }
    }
    "ok"
}

async fn create_player(Json(payload): Json<Value>) -> Json<Value> {
    tracing::info!(payload = %payload, "Request received");
    Json(payload)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let state = AppState {
        health_requests: Arc::new(AtomicU64::new(0)),
        slow_range: cli.slow_healthcheck,
        stall: Duration::from_secs(cli.stall_secs),
    };
    let app = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/create", post(create_player))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Demo backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}

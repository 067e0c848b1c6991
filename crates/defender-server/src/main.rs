mod logging;
mod routes;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use defender_agent::Analyst;
use defender_core::{config::Config, ledger::Ledger, solana::Faucet};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::logging::BroadcastLayer;

const DEFAULT_LOG_FILTER: &str =
    "defender_server=info,defender_core=info,defender_agent=info,tower_http=debug";

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub config: Config,
    /// `None` when `GEMINI_API_KEY` is unset; model routes answer 500.
    pub analyst: Option<Analyst>,
    pub ledger: Ledger,
    pub faucet: Faucet,
    pub start_time: Instant,
    pub log_tx: broadcast::Sender<String>,
    pub log_ring: Arc<std::sync::Mutex<VecDeque<String>>>,
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (log_tx, _log_rx) = broadcast::channel::<String>(256);
    let log_ring = Arc::new(std::sync::Mutex::new(VecDeque::new()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(BroadcastLayer {
            tx: log_tx.clone(),
            ring: Arc::clone(&log_ring),
        })
        .init();

    let config = Config::from_env()?;

    let ledger = if config.ledger_path.is_empty() {
        Ledger::in_memory()
    } else {
        Ledger::open(&config.ledger_path)?
    }
    .with_latency(
        Duration::from_millis(config.radar_fetch_latency_ms),
        Duration::from_millis(config.radar_write_latency_ms),
    );

    let analyst = Analyst::from_config(&config);
    match &analyst {
        Some(a) => info!(model = a.model_name(), "gemini configured"),
        None => warn!("GEMINI_API_KEY not set; analysis routes will return 500"),
    }

    let faucet = Faucet::from_config(&config);
    let addr = format!("{}:{}", config.web_bind, config.web_port);

    let state = Arc::new(AppState {
        config,
        analyst,
        ledger,
        faucet,
        start_time: Instant::now(),
        log_tx,
        log_ring,
    });

    let app = routes::router(state);

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

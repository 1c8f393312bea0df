//! Simulated Exchange - Matching Service
//!
//! Reads newline-delimited JSON orders from stdin, matches them against the
//! book, settles trades on the client ledger and publishes the results.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use tokio::io::BufReader;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sim_exchange::intake::run_intake;
use sim_exchange::{AppState, ClientManager, Config, Engine, ExchangeService, Metrics, Publisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting simulated exchange");

    let config = Arc::new(Config::load()?);
    info!(
        starting_capital = %config.starting_capital,
        clients_file = ?config.clients_file,
        "Configuration loaded"
    );

    let mut clients = ClientManager::new(config.starting_capital);
    if let Some(path) = &config.clients_file {
        clients.load_directory(path)?;
    }

    let metrics = Metrics::new()?;
    let (exchange, service_task) = ExchangeService::spawn(
        Engine::new(),
        clients,
        metrics.clone(),
        config.command_buffer,
    );

    let publisher = Arc::new(Publisher::new(&config.ipc_socket_path).await?);

    let state = Arc::new(AppState {
        exchange: exchange.clone(),
        publisher,
        metrics,
        config: config.clone(),
    });

    let health_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state).await {
            warn!(error = %e, "Health server error");
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    run_intake(stdin, &state.exchange, &state.publisher).await?;

    for (client_id, capital) in exchange.results().await? {
        info!(client = %client_id, capital = %capital, "Final capital");
    }

    exchange.shutdown().await?;
    service_task.await?;
    Ok(())
}

/// Start HTTP server for health checks and metrics
async fn start_health_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.health_port));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "exchange",
        "feed_connected": state.publisher.is_connected().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, (StatusCode, String)> {
    state
        .metrics
        .render()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

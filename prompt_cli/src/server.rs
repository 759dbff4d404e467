use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use prompt_metrics::{ScrapeAggregator, ScrapeResponse, ScrapeStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<ScrapeAggregator>,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub exporters: usize,
}

impl HealthStatus {
    pub fn healthy(uptime_seconds: u64, exporters: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
            uptime_seconds,
            exporters,
        }
    }
}

pub fn create_router(aggregator: Arc<ScrapeAggregator>) -> Router {
    let state = AppState {
        aggregator,
        started_at: Instant::now(),
    };

    // The wildcard does not match an empty name, so `/metrics/` gets its own route.
    Router::new()
        .route("/metrics", get(scrape_all))
        .route("/metrics/", get(scrape_all))
        .route("/metrics/*name", get(scrape_one))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, aggregator: Arc<ScrapeAggregator>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {}", addr))?;

    axum::serve(listener, create_router(aggregator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn scrape_all(State(state): State<AppState>) -> Response {
    into_http(state.aggregator.handle(None).await)
}

async fn scrape_one(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    into_http(state.aggregator.handle(Some(&name)).await)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(
        state.started_at.elapsed().as_secs(),
        state.aggregator.registry().len(),
    ))
}

fn into_http(scrape: ScrapeResponse) -> Response {
    let status = match scrape.status {
        ScrapeStatus::Ok => StatusCode::OK,
        ScrapeStatus::NotFound => StatusCode::NOT_FOUND,
        ScrapeStatus::NoContent => return StatusCode::NO_CONTENT.into_response(),
    };
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], scrape.body).into_response()
}

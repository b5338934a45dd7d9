//! Prometheus metrics for the scanner and the `/metrics` endpoint that serves them

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::error::{IndexerError, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HIGHEST_BLOCK: IntGauge =
        IntGauge::new("indexer_highest_block", "Chain height last reported by the node")
            .expect("can't create highest_block metric");
    pub static ref CURRENT_BLOCK: IntGauge =
        IntGauge::new("indexer_current_block", "Height the scanner is processing")
            .expect("can't create current_block metric");
    pub static ref BLOCKS_PROCESSED: IntCounter =
        IntCounter::new("indexer_blocks_processed", "Heights fully indexed")
            .expect("can't create blocks_processed metric");
    pub static ref MISSING_TRANSACTIONS: IntCounter =
        IntCounter::new("indexer_missing_transactions", "Transactions the node no longer serves")
            .expect("can't create missing_transactions metric");
    pub static ref CYCLE_FAILURES: IntCounter =
        IntCounter::new("indexer_cycle_failures", "Scan cycles aborted by an error")
            .expect("can't create cycle_failures metric");
}

/// Register every collector. Calling it again is a no-op.
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(HIGHEST_BLOCK.clone()),
        Box::new(CURRENT_BLOCK.clone()),
        Box::new(BLOCKS_PROCESSED.clone()),
        Box::new(MISSING_TRANSACTIONS.clone()),
        Box::new(CYCLE_FAILURES.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(IndexerError::Internal(format!("Failed to register metric: {}", e))),
        }
    }
    Ok(())
}

async fn render() -> (StatusCode, String) {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until a shutdown signal arrives.
    pub async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        register_metrics()?;

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| IndexerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(%addr, "metrics server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| IndexerError::Internal(format!("Metrics server error: {}", e)))?;

        Ok(())
    }
}

//! Prometheus Metrics Registry - Trading Observability
//!
//! Registers and exposes Prometheus metrics for the swap bot: the last
//! observed price, poll counts, transaction outcomes, and failed ledger
//! reads.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the swap bot.
///
/// All metrics follow the naming convention `sunswap_bot_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Last price observed by the monitor, per route.
    pub last_price: GaugeVec,
    /// Price queries performed, per route.
    pub price_polls: IntCounterVec,
    /// Confirmed transactions by kind (approve/swap) and receipt status.
    pub transactions: IntCounterVec,
    /// Approvals skipped because the allowance was already sufficient.
    pub approvals_skipped: IntCounterVec,
    /// Ledger reads that failed after retries, per stage.
    pub query_failures: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let last_price = GaugeVec::new(
            Opts::new(
                "sunswap_bot_last_price",
                "Last observed price, in input-asset units per output-asset unit",
            ),
            &["route"],
        )?;

        let price_polls = IntCounterVec::new(
            Opts::new("sunswap_bot_price_polls_total", "Total price queries"),
            &["route"],
        )?;

        let transactions = IntCounterVec::new(
            Opts::new(
                "sunswap_bot_transactions_total",
                "Confirmed transactions by kind and receipt status",
            ),
            &["kind", "status"],
        )?;

        let approvals_skipped = IntCounterVec::new(
            Opts::new(
                "sunswap_bot_approvals_skipped_total",
                "Approvals skipped because allowance was sufficient",
            ),
            &["token"],
        )?;

        let query_failures = IntCounterVec::new(
            Opts::new(
                "sunswap_bot_query_failures_total",
                "Ledger reads that failed after retries",
            ),
            &["stage"],
        )?;

        // Register all metrics
        registry.register(Box::new(last_price.clone()))?;
        registry.register(Box::new(price_polls.clone()))?;
        registry.register(Box::new(transactions.clone()))?;
        registry.register(Box::new(approvals_skipped.clone()))?;
        registry.register(Box::new(query_failures.clone()))?;

        Ok(Self {
            registry,
            last_price,
            price_polls,
            transactions,
            approvals_skipped,
            query_failures,
        })
    }

    /// Record one price observation.
    pub fn observe_price(&self, route: &str, price: Decimal) {
        self.price_polls.with_label_values(&[route]).inc();
        if let Some(value) = price.to_f64() {
            self.last_price.with_label_values(&[route]).set(value);
        }
    }

    /// Record a confirmed transaction.
    pub fn observe_transaction(&self, kind: &str, status: &str) {
        self.transactions.with_label_values(&[kind, status]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

//! Health Check Server - Liveness and Readiness Endpoints
//!
//! `/live` answers as long as the process runs. `/ready` answers 200
//! only while the RPC endpoint was reachable and the trading loop is
//! still watching the price; its JSON body says which check failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Flags flipped by `main` and read by the endpoints.
#[derive(Debug, Default)]
pub struct HealthState {
    chain_healthy: AtomicBool,
    loop_running: AtomicBool,
}

/// Body of the `/ready` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub chain: bool,
    pub monitoring: bool,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self.chain && self.monitoring
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chain_healthy(&self, healthy: bool) {
        self.chain_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn set_loop_running(&self, running: bool) {
        self.loop_running.store(running, Ordering::Relaxed);
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            chain: self.chain_healthy.load(Ordering::Relaxed),
            monitoring: self.loop_running.load(Ordering::Relaxed),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }
}

pub struct HealthServer {
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Serve the health endpoints until the shutdown broadcast fires.
    #[instrument(skip(self, shutdown_rx), fields(port = self.port))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(|| async { (StatusCode::OK, "OK") }))
            .route("/ready", get(ready))
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!(address = %listener.local_addr()?, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;
        Ok(())
    }
}

async fn ready(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<Readiness>) {
    let readiness = state.readiness();
    let code = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness))
}

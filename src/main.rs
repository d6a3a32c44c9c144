//! SunSwap Limit Bot - Entry Point
//!
//! Wiring sequence:
//! 1. Load .env + config.toml, validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load wallet credentials from env (WALLET_ADDRESS, TRADER_PRIVATE_KEY)
//! 4. Connect the signing RPC provider, build the ledger gateway
//! 5. Spawn metrics + health servers (if enabled)
//! 6. Log the input token balance
//! 7. Run the trading loop: monitor price, swap once, exit
//! 8. SIGINT stops monitoring; a swap already submitted is awaited

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use sunswap_limit_bot::adapters::chain::{
    provider, EvmLedgerGateway, GatewaySettings, RetryPolicy, WalletCredentials,
};
use sunswap_limit_bot::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use sunswap_limit_bot::config::{self, AppConfig};
use sunswap_limit_bot::domain::route::TradeRoute;
use sunswap_limit_bot::usecases::{RunStatus, TradingLoop, TradingSettings};

/// Buy a token once its price drops to a threshold.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Build the order on trigger but do not submit it (overrides config).
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            // Tracing may not be initialized yet when config loading fails.
            eprintln!("fatal: {e:#}");
            error!(error = %format!("{e:#}"), "Bot exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── 1. Environment + configuration ──────────────────────
    dotenvy::dotenv().ok();
    let mut config = config::loader::load_config(&cli.config)
        .context("Failed to load configuration")?;
    config.bot.dry_run |= cli.dry_run;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.bot.dry_run,
        "Starting SunSwap limit bot"
    );

    // ── 3. Wallet credentials ───────────────────────────────
    let credentials =
        WalletCredentials::from_env().context("Failed to load wallet credentials from env")?;
    let wallet = credentials.address();
    info!(wallet = %wallet, "Wallet loaded");

    // ── 4. Provider + ledger gateway ────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health = Arc::new(HealthState::new());

    let provider = provider::connect(&config.chain, credentials.into_wallet())
        .await
        .context("Failed to connect to RPC")?;
    let gateway = Arc::new(EvmLedgerGateway::<
        alloy::transports::http::Http<alloy::transports::http::Client>,
        _,
    >::new(provider, gateway_settings(&config)));
    health.set_chain_healthy(gateway.is_healthy().await);

    // ── 5. Metrics + health servers ─────────────────────────
    let metrics = if config.metrics.enabled {
        Some(spawn_observability(&config, Arc::clone(&health), &shutdown_tx)?)
    } else {
        None
    };

    // ── 6. Trading loop ─────────────────────────────────────
    let route = TradeRoute::from_symbols(&config.registry(), &config.trade.route)?;
    let settings = TradingSettings {
        wallet,
        router: config.chain.router,
        gas_limit: config.chain.gas_limit,
        dry_run: config.bot.dry_run,
    };
    let mut trading = TradingLoop::new(Arc::clone(&gateway), settings)
        .with_shutdown(shutdown_tx.subscribe());
    if let Some(metrics) = metrics {
        trading = trading.with_metrics(metrics);
    }

    match trading.balance_of(route.first()).await {
        Ok(balance) => info!(token = %route.first().symbol, balance = %balance, "Wallet balance"),
        Err(e) => warn!(error = %e, "Balance query failed"),
    }

    // SIGINT only interrupts the price wait.
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, initiating graceful shutdown");
            let _ = signal_tx.send(());
        }
    });

    health.set_loop_running(true);
    let result = trading
        .run(
            &route,
            config.trade.threshold_price,
            config.trade.amount_in,
            config.trade.poll_interval(),
        )
        .await;
    health.set_loop_running(false);
    let _ = shutdown_tx.send(());

    match result {
        Ok(report) => {
            info!(
                status = ?report.status,
                polls = report.polls,
                trigger_price = ?report.trigger_price,
                tx = ?report.last_receipt.as_ref().map(|r| r.tx_hash),
                "Run finished"
            );
            Ok(match report.status {
                RunStatus::Swapped | RunStatus::DryRun => ExitCode::SUCCESS,
                RunStatus::Cancelled => ExitCode::from(130),
            })
        }
        Err(e) => {
            error!(
                error = %e,
                stage = ?e.stage(),
                receipt = ?e.receipt().map(|r| &r.payload),
                "Run failed"
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn gateway_settings(config: &AppConfig) -> GatewaySettings {
    GatewaySettings {
        router: config.chain.router,
        retry: RetryPolicy {
            max_retries: config.chain.max_retries,
            base_delay: Duration::from_millis(config.chain.retry_base_delay_ms),
        },
        receipt_poll: Duration::from_millis(config.chain.receipt_poll_ms),
        receipt_timeout: Duration::from_secs(config.chain.receipt_timeout_secs),
    }
}

/// Spawn the Prometheus and health servers; they stop on shutdown.
fn spawn_observability(
    config: &AppConfig,
    health: Arc<HealthState>,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<Arc<MetricsRegistry>> {
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

    let metrics_server = Arc::clone(&metrics);
    let bind_address = config.metrics.bind_address.clone();
    let metrics_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = metrics_server.serve(bind_address, metrics_shutdown).await {
            error!(error = %e, "Metrics server failed");
        }
    });

    let health_server = HealthServer::new(health, config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    Ok(metrics)
}

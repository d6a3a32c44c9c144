//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. Wallet secrets
//! never live here; they come from the environment (`.env`).
//! Token and router addresses default to the SunSwap deployment and can
//! be overridden per entry.

pub mod loader;

use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::token::{TokenAsset, TokenRegistry, SUNSWAP_V2_ROUTER};

/// Top-level bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and runtime flags.
  pub bot: BotConfig,
  /// RPC endpoint, router, and transaction settings.
  pub chain: ChainConfig,
  /// What to watch and what to buy.
  pub trade: TradeConfig,
  /// Extra or overriding token definitions.
  #[serde(default)]
  pub tokens: Vec<TokenAsset>,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

impl AppConfig {
  /// Built-in tokens with `[[tokens]]` entries layered on top.
  pub fn registry(&self) -> TokenRegistry {
    TokenRegistry::builtin().extended(self.tokens.iter().cloned())
  }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Build the order on trigger but submit nothing.
  #[serde(default)]
  pub dry_run: bool,
}

/// Ledger connection and transaction configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  pub rpc_url: String,
  /// Expected chain ID; checked at startup when set.
  #[serde(default)]
  pub chain_id: Option<u64>,
  /// Uniswap-V2 compatible router.
  #[serde(default = "default_router")]
  pub router: Address,
  /// Gas cap (gas units) for every transaction. Unset means the
  /// provider estimates gas per transaction.
  #[serde(default)]
  pub gas_limit: Option<u64>,
  /// Seconds to wait for a transaction receipt.
  #[serde(default = "default_receipt_timeout")]
  pub receipt_timeout_secs: u64,
  /// Interval between receipt polls (milliseconds).
  #[serde(default = "default_receipt_poll")]
  pub receipt_poll_ms: u64,
  /// Retries for failed ledger reads.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between read retries (milliseconds, doubled each retry).
  #[serde(default = "default_retry_base_delay")]
  pub retry_base_delay_ms: u64,
}

/// Trade trigger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeConfig {
  /// Token symbols in hop order; first is spent, last is bought.
  pub route: Vec<String>,
  /// Buy once the price (first asset per last asset) is at or below this.
  pub threshold_price: Decimal,
  /// Amount of the first asset to spend.
  pub amount_in: Decimal,
  /// Interval between price polls (milliseconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
}

impl TradeConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics and health endpoints.
  #[serde(default)]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_router() -> Address {
  SUNSWAP_V2_ROUTER
}

fn default_receipt_timeout() -> u64 {
  120
}

fn default_receipt_poll() -> u64 {
  1_000
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay() -> u64 {
  200
}

fn default_poll_interval() -> u64 {
  2_000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

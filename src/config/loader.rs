//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;
use crate::domain::route::TradeRoute;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    route = ?config.trade.route,
    threshold = %config.trade.threshold_price,
    amount_in = %config.trade.amount_in,
    dry_run = config.bot.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A route of at least two known tokens
/// - Positive threshold, amount, and intervals
/// - Non-empty RPC endpoint
fn validate_config(config: &AppConfig) -> Result<()> {
  // Trade validation
  TradeRoute::from_symbols(&config.registry(), &config.trade.route)
    .context("Invalid [trade].route")?;

  anyhow::ensure!(
    config.trade.threshold_price > Decimal::ZERO,
    "threshold_price must be positive, got {}",
    config.trade.threshold_price
  );
  anyhow::ensure!(
    config.trade.amount_in > Decimal::ZERO,
    "amount_in must be positive, got {}",
    config.trade.amount_in
  );
  anyhow::ensure!(
    config.trade.poll_interval_ms > 0,
    "poll_interval_ms must be positive"
  );

  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.is_empty(),
    "RPC URL must not be empty"
  );
  anyhow::ensure!(
    config.chain.gas_limit != Some(0),
    "gas_limit must be positive when set"
  );
  anyhow::ensure!(
    config.chain.receipt_poll_ms > 0,
    "receipt_poll_ms must be positive"
  );

  // Token validation
  for token in &config.tokens {
    anyhow::ensure!(
      !token.symbol.is_empty(),
      "Token at {} has an empty symbol",
      token.address
    );
  }

  Ok(())
}

//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Builds the signing HTTP provider shared by every on-chain operation
//! and validates connectivity (and optionally the chain ID) at startup.
//! Nonce, gas price, and chain ID are filled by alloy's recommended
//! fillers; signing is done by the wallet filler.

use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::http::{Client, Http};
use anyhow::{bail, Context, Result};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Connect to the configured RPC endpoint with `wallet` as signer.
///
/// The URL itself comes from `config.toml` (never hardcoded) and is not
/// logged, since hosted endpoints often embed API keys.
#[instrument(skip_all)]
pub async fn connect(
    config: &ChainConfig,
    wallet: EthereumWallet,
) -> Result<impl Provider<Http<Client>> + 'static> {
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(config.rpc_url.parse().context("Invalid RPC URL")?);

    let chain_id = provider
        .get_chain_id()
        .await
        .context("Failed to query chain ID")?;

    if let Some(expected) = config.chain_id {
        if chain_id != expected {
            bail!("Expected chain_id={expected}, RPC reports {chain_id}");
        }
    }

    info!(chain_id, "Connected to RPC");
    Ok(provider)
}

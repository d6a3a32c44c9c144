//! Wallet Credentials - Signing Key From the Environment
//!
//! The wallet address and private key come from `WALLET_ADDRESS` and
//! `TRADER_PRIVATE_KEY` (usually via `.env`, never committed). The key is
//! never logged; `Debug` redacts it.

use std::fmt;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{ensure, Context, Result};

pub const WALLET_ADDRESS_ENV: &str = "WALLET_ADDRESS";
pub const PRIVATE_KEY_ENV: &str = "TRADER_PRIVATE_KEY";

/// Trading wallet: its address and the key that signs for it.
pub struct WalletCredentials {
    address: Address,
    signer: PrivateKeySigner,
}

impl WalletCredentials {
    /// Load credentials from `WALLET_ADDRESS` and `TRADER_PRIVATE_KEY`.
    pub fn from_env() -> Result<Self> {
        let address = std::env::var(WALLET_ADDRESS_ENV)
            .with_context(|| format!("{WALLET_ADDRESS_ENV} not set"))?;
        let key = std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("{PRIVATE_KEY_ENV} not set"))?;
        Self::from_parts(&address, &key)
    }

    /// Parse and cross-check an address and a hex private key.
    pub fn from_parts(address: &str, private_key_hex: &str) -> Result<Self> {
        let address: Address = address
            .trim()
            .parse()
            .context("Invalid wallet address")?;
        let signer: PrivateKeySigner = private_key_hex
            .trim()
            .parse()
            .context("Invalid private key")?;

        ensure!(
            signer.address() == address,
            "Private key belongs to {}, not to configured wallet {address}",
            signer.address()
        );

        Ok(Self { address, signer })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Consume the credentials into an alloy wallet for the provider.
    pub fn into_wallet(self) -> EthereumWallet {
        EthereumWallet::from(self.signer)
    }
}

impl fmt::Debug for WalletCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredentials")
            .field("address", &self.address)
            .field("signer", &"<redacted>")
            .finish()
    }
}

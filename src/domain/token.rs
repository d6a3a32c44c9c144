//! Token identities and the immutable token registry.
//!
//! A `TokenAsset` is identified by its on-ledger address; the symbol is
//! only a lookup convenience. Decimals may be unknown up front and are
//! resolved once per run through `usecases::decimals::DecimalsCache`.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// TRC-20 USDT on TRON (`TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t`), hex form.
pub const USDT_ADDRESS: Address = address!("a614f803b6fd780986a42c78ec9c7f77e6ded13c");

/// SUN token on TRON (`TSSMHYeV2uE9qYH95DqyoCuNCzEL1NvU3S`), hex form.
pub const SUN_ADDRESS: Address = address!("b4a428ab7092c2f1395f376ce297033b3bb446c1");

/// SunswapV2Router02 (`TKzxdSv2FZKQrEqkKVgp5DcwEXBEKMg2Ax`), hex form.
pub const SUNSWAP_V2_ROUTER: Address = address!("6e0617948fe030a7e4970f8389d4ad295f249b7e");

/// A fungible token known to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAsset {
    /// Ticker used for lookup and logging.
    pub symbol: String,
    /// Contract address. This is the identity key.
    pub address: Address,
    /// Decimal precision, if known without asking the ledger.
    #[serde(default)]
    pub decimals: Option<u8>,
}

impl TokenAsset {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: Option<u8>) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }
}

// Two assets are the same token only when their addresses match.
impl PartialEq for TokenAsset {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for TokenAsset {}

impl fmt::Display for TokenAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.symbol, self.address)
    }
}

/// Read-only catalog of known tokens, looked up by symbol.
///
/// Built once at startup from config and passed to whoever needs it.
/// There is no global registry.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_symbol: HashMap<String, TokenAsset>,
}

impl TokenRegistry {
    /// Registry holding the tokens the bot ships with (USDT, SUN).
    pub fn builtin() -> Self {
        Self::from_assets([
            TokenAsset::new("USDT", USDT_ADDRESS, Some(6)),
            TokenAsset::new("SUN", SUN_ADDRESS, Some(18)),
        ])
    }

    /// Build a registry; later entries replace earlier ones with the same symbol.
    pub fn from_assets(assets: impl IntoIterator<Item = TokenAsset>) -> Self {
        let by_symbol = assets
            .into_iter()
            .map(|asset| (asset.symbol.to_ascii_uppercase(), asset))
            .collect();
        Self { by_symbol }
    }

    /// Return a registry with `overrides` layered on top of `self`.
    pub fn extended(&self, overrides: impl IntoIterator<Item = TokenAsset>) -> Self {
        let mut by_symbol = self.by_symbol.clone();
        for asset in overrides {
            by_symbol.insert(asset.symbol.to_ascii_uppercase(), asset);
        }
        Self { by_symbol }
    }

    /// Case-insensitive lookup by symbol.
    pub fn get(&self, symbol: &str) -> Option<&TokenAsset> {
        self.by_symbol.get(&symbol.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

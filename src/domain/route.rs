//! Trade routes through a single exchange router.

use std::fmt;

use alloy::primitives::Address;

use super::error::TradeError;
use super::token::{TokenAsset, TokenRegistry};

/// Ordered hop sequence; first asset is spent, last asset is received.
///
/// Always holds at least two assets. The only way to get one is through
/// [`TradeRoute::new`] or [`TradeRoute::from_symbols`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRoute {
    hops: Vec<TokenAsset>,
}

impl TradeRoute {
    pub fn new(hops: Vec<TokenAsset>) -> Result<Self, TradeError> {
        if hops.len() < 2 {
            return Err(TradeError::InvalidRoute(format!(
                "route needs at least 2 assets, got {}",
                hops.len()
            )));
        }
        Ok(Self { hops })
    }

    /// Resolve a list of symbols against the registry.
    pub fn from_symbols<S: AsRef<str>>(
        registry: &TokenRegistry,
        symbols: &[S],
    ) -> Result<Self, TradeError> {
        let hops = symbols
            .iter()
            .map(|s| {
                registry.get(s.as_ref()).cloned().ok_or_else(|| {
                    TradeError::InvalidRoute(format!("unknown token symbol {}", s.as_ref()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(hops)
    }

    pub fn first(&self) -> &TokenAsset {
        &self.hops[0]
    }

    pub fn last(&self) -> &TokenAsset {
        &self.hops[self.hops.len() - 1]
    }

    pub fn hops(&self) -> &[TokenAsset] {
        &self.hops
    }

    /// Router `path` argument.
    pub fn addresses(&self) -> Vec<Address> {
        self.hops.iter().map(|t| t.address).collect()
    }
}

impl fmt::Display for TradeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.hops.iter().map(|t| t.symbol.as_str()).collect();
        write!(f, "{}", symbols.join("->"))
    }
}

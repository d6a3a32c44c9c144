//! Per-run decimals cache.
//!
//! Tokens configured without `decimals` are resolved from the ledger the
//! first time they are used and the answer is kept for the rest of the
//! run, keyed by token address. `TokenAsset` values are never mutated.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::error::TradeError;
use crate::domain::route::TradeRoute;
use crate::domain::token::TokenAsset;
use crate::ports::ledger::LedgerGateway;

pub struct DecimalsCache<L: LedgerGateway> {
  ledger: Arc<L>,
  resolved: RwLock<HashMap<Address, u8>>,
}

impl<L: LedgerGateway> DecimalsCache<L> {
  pub fn new(ledger: Arc<L>) -> Self {
    Self {
      ledger,
      resolved: RwLock::new(HashMap::new()),
    }
  }

  /// Decimals of `token`: configured value, cached value, or a ledger read.
  ///
  /// A failed read is reported as `InvalidRoute`: a token whose precision
  /// is unknown cannot be priced or traded.
  pub async fn decimals_of(&self, token: &TokenAsset) -> Result<u8, TradeError> {
    if let Some(decimals) = token.decimals {
      return Ok(decimals);
    }

    {
      let cache = self.resolved.read().await;
      if let Some(decimals) = cache.get(&token.address) {
        return Ok(*decimals);
      }
    }

    let decimals = self
      .ledger
      .resolve_decimals(token.address)
      .await
      .map_err(|e| {
        TradeError::InvalidRoute(format!("decimals of {token} unresolvable: {e:#}"))
      })?;

    debug!(token = %token.symbol, decimals, "Resolved token decimals");

    let mut cache = self.resolved.write().await;
    Ok(*cache.entry(token.address).or_insert(decimals))
  }

  /// Decimals of every hop in `route`, in route order.
  pub async fn decimals_for_route(&self, route: &TradeRoute) -> Result<Vec<u8>, TradeError> {
    let mut out = Vec::with_capacity(route.hops().len());
    for token in route.hops() {
      out.push(self.decimals_of(token).await?);
    }
    Ok(out)
  }
}

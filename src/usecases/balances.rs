//! Wallet balance queries, normalized by token decimals.

use alloy::primitives::Address;
use rust_decimal::Decimal;

use crate::domain::error::{Stage, TradeError};
use crate::domain::order::from_raw_units;
use crate::domain::token::TokenAsset;
use crate::ports::ledger::LedgerGateway;

use super::decimals::DecimalsCache;

/// `owner`'s balance of `token`, token-denominated.
pub async fn token_balance<L: LedgerGateway>(
  ledger: &L,
  decimals: &DecimalsCache<L>,
  owner: Address,
  token: &TokenAsset,
) -> Result<Decimal, TradeError> {
  let decimals = decimals.decimals_of(token).await?;
  let raw = ledger
    .get_balance(owner, token.address)
    .await
    .map_err(|e| TradeError::query(Stage::Balance, e))?;
  from_raw_units(raw, decimals)
}

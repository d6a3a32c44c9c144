//! Ledger Gateway Port - On-chain Interaction Interface
//!
//! The narrow capability set the trading core needs from the ledger:
//! ERC-20 reads, router quotes, and signed transaction submission with
//! receipt confirmation. Network, signing, and fee details stay behind
//! the adapter.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::domain::receipt::{PendingTx, TransactionReceipt};

/// A contract function call the gateway knows how to encode and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
  /// `token.approve(spender, amount)`
  Approve {
    token: Address,
    spender: Address,
    amount: U256,
  },
  /// `router.swapExactTokensForTokens(amountIn, amountOutMin, path, to, deadline)`
  SwapExactTokensForTokens {
    router: Address,
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
  },
}

impl ContractCall {
  /// Short label for logs and metrics.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Approve { .. } => "approve",
      Self::SwapExactTokensForTokens { .. } => "swap",
    }
  }
}

/// Trait for ledger access.
///
/// Reads may be retried by the implementation; an `Err` means it gave up.
/// Nothing here retries a submission.
#[async_trait]
pub trait LedgerGateway: Send + Sync + 'static {
  /// `decimals()` of an ERC-20 token.
  async fn resolve_decimals(&self, token: Address) -> anyhow::Result<u8>;

  /// `balanceOf(owner)` in raw units.
  async fn get_balance(&self, owner: Address, token: Address) -> anyhow::Result<U256>;

  /// `allowance(owner, spender)` in raw units.
  async fn get_allowance(
    &self,
    owner: Address,
    spender: Address,
    token: Address,
  ) -> anyhow::Result<U256>;

  /// Router `getAmountsOut(amountIn, path)`: one raw amount per hop.
  async fn simulate_amounts_out(
    &self,
    amount_in: U256,
    path: &[Address],
  ) -> anyhow::Result<Vec<U256>>;

  /// Build, sign with the held credential, and broadcast `call` from `owner`.
  ///
  /// `gas_limit` caps gas in gas units; `None` leaves it to estimation.
  async fn submit(
    &self,
    call: &ContractCall,
    owner: Address,
    gas_limit: Option<u64>,
  ) -> anyhow::Result<PendingTx>;

  /// Block until the transaction is confirmed and return its receipt.
  async fn wait_for_receipt(&self, pending: &PendingTx) -> anyhow::Result<TransactionReceipt>;
}

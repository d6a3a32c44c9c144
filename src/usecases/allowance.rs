//! Allowance Manager - Router Spend Authorization
//!
//! Makes sure the router may move the wallet's input token before a
//! swap. Approves `U256::MAX` once and leaves it alone until more than
//! half of it has been consumed, so repeated runs do not pay for
//! redundant approvals.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{info, instrument, warn};

use crate::domain::error::{Stage, TradeError};
use crate::domain::receipt::TransactionReceipt;
use crate::domain::token::TokenAsset;
use crate::ports::ledger::{ContractCall, LedgerGateway};

/// Allowances at or above this value are left untouched.
///
/// Half of `U256::MAX`, rounded up: `2^255`.
pub fn approval_threshold() -> U256 {
  U256::from(1u8) << 255_usize
}

/// Allowance the wallet has granted a spender, as read just now.
#[derive(Debug, Clone)]
pub struct AllowanceState {
  pub owner: Address,
  pub spender: Address,
  pub token: TokenAsset,
  pub granted: U256,
}

impl AllowanceState {
  pub fn is_sufficient(&self) -> bool {
    self.granted >= approval_threshold()
  }
}

/// What `ensure_allowance` did.
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
  /// Allowance was already sufficient; nothing submitted.
  Skipped { granted: U256 },
  /// An approval was submitted and confirmed with SUCCESS.
  Approved(TransactionReceipt),
}

impl ApprovalOutcome {
  pub fn receipt(&self) -> Option<&TransactionReceipt> {
    match self {
      Self::Skipped { .. } => None,
      Self::Approved(receipt) => Some(receipt),
    }
  }
}

pub struct AllowanceManager<L: LedgerGateway> {
  ledger: Arc<L>,
  /// Wallet that owns the tokens.
  owner: Address,
  /// Exchange router being authorized.
  spender: Address,
  /// Gas cap for approval transactions.
  gas_limit: Option<u64>,
}

impl<L: LedgerGateway> AllowanceManager<L> {
  pub fn new(ledger: Arc<L>, owner: Address, spender: Address, gas_limit: Option<u64>) -> Self {
    Self {
      ledger,
      owner,
      spender,
      gas_limit,
    }
  }

  /// Read the current allowance. Never cached; it can change out-of-band.
  pub async fn allowance_state(&self, token: &TokenAsset) -> Result<AllowanceState, TradeError> {
    let granted = self
      .ledger
      .get_allowance(self.owner, self.spender, token.address)
      .await
      .map_err(|e| TradeError::query(Stage::AllowanceCheck, e))?;

    Ok(AllowanceState {
      owner: self.owner,
      spender: self.spender,
      token: token.clone(),
      granted,
    })
  }

  /// Approve the router for `token` unless it already holds enough allowance.
  ///
  /// A confirmed approval with any status other than SUCCESS is returned
  /// as `TradeError::ApprovalRejected`.
  #[instrument(skip(self), fields(token = %token.symbol))]
  pub async fn ensure_allowance(&self, token: &TokenAsset) -> Result<ApprovalOutcome, TradeError> {
    let state = self.allowance_state(token).await?;

    if state.is_sufficient() {
      info!(granted = %state.granted, "Allowance sufficient, approval skipped");
      return Ok(ApprovalOutcome::Skipped {
        granted: state.granted,
      });
    }

    info!(
      current = %state.granted,
      spender = %self.spender,
      "Submitting max approval"
    );

    let call = ContractCall::Approve {
      token: token.address,
      spender: self.spender,
      amount: U256::MAX,
    };

    let pending = self
      .ledger
      .submit(&call, self.owner, self.gas_limit)
      .await
      .map_err(|e| TradeError::submission(Stage::Approval, e))?;

    let receipt = self
      .ledger
      .wait_for_receipt(&pending)
      .await
      .map_err(|e| TradeError::submission(Stage::Approval, e))?;

    if receipt.is_success() {
      info!(tx = %receipt.tx_hash, "Approval confirmed");
      Ok(ApprovalOutcome::Approved(receipt))
    } else {
      warn!(tx = %receipt.tx_hash, payload = %receipt.payload, "Approval failed on-chain");
      Err(TradeError::ApprovalRejected {
        token: token.symbol.clone(),
        receipt,
      })
    }
  }
}

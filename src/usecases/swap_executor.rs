//! Swap Executor - Slippage-bounded Router Swaps
//!
//! One swap attempt, start to finish:
//! 1. Validate the amount against the input token's decimals
//! 2. Ensure the router allowance (fatal on a rejected approval)
//! 3. Quote the exact raw input along the route
//! 4. Floor the quote by 0.8% (0.5% slippage + 0.3% fee)
//! 5. Stamp a deadline five minutes out
//! 6. Submit `swapExactTokensForTokens` and wait for the receipt
//!
//! The receipt comes back unclassified and nothing is retried. The
//! router enforces both the minimum output and the deadline.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::domain::error::{Stage, TradeError};
use crate::domain::order::{to_raw_units, SwapOrder};
use crate::domain::receipt::{ReceiptStatus, TransactionReceipt};
use crate::domain::route::TradeRoute;
use crate::ports::ledger::{ContractCall, LedgerGateway};

use super::allowance::{AllowanceManager, ApprovalOutcome};
use super::decimals::DecimalsCache;

/// Position of a swap attempt in its lifecycle. Every failure is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
  Start,
  ApprovalCheck,
  ApprovalSubmitted,
  ApprovalSkipped,
  SwapBuilt,
  SwapSubmitted,
  Confirmed(ReceiptStatus),
}

impl fmt::Display for SwapStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Start => write!(f, "START"),
      Self::ApprovalCheck => write!(f, "APPROVAL_CHECK"),
      Self::ApprovalSubmitted => write!(f, "APPROVAL_SUBMITTED"),
      Self::ApprovalSkipped => write!(f, "APPROVAL_SKIPPED"),
      Self::SwapBuilt => write!(f, "SWAP_BUILT"),
      Self::SwapSubmitted => write!(f, "SWAP_SUBMITTED"),
      Self::Confirmed(status) => write!(f, "CONFIRMED_{status}"),
    }
  }
}

/// Everything that happened during one swap attempt.
#[derive(Debug, Clone)]
pub struct SwapExecution {
  pub approval: ApprovalOutcome,
  pub order: SwapOrder,
  pub receipt: TransactionReceipt,
}

pub struct SwapExecutor<L: LedgerGateway> {
  ledger: Arc<L>,
  decimals: Arc<DecimalsCache<L>>,
  allowance: AllowanceManager<L>,
  /// Router contract the swap goes through.
  router: Address,
  /// Wallet that pays and receives.
  wallet: Address,
  gas_limit: Option<u64>,
}

impl<L: LedgerGateway> SwapExecutor<L> {
  pub fn new(
    ledger: Arc<L>,
    decimals: Arc<DecimalsCache<L>>,
    wallet: Address,
    router: Address,
    gas_limit: Option<u64>,
  ) -> Self {
    let allowance = AllowanceManager::new(Arc::clone(&ledger), wallet, router, gas_limit);
    Self {
      ledger,
      decimals,
      allowance,
      router,
      wallet,
      gas_limit,
    }
  }

  /// Raw input amount for `amount_in` of the route's first asset.
  async fn raw_amount_in(&self, amount_in: Decimal, route: &TradeRoute) -> Result<U256, TradeError> {
    let decimals = self.decimals.decimals_for_route(route).await?;
    to_raw_units(amount_in, decimals[0])
  }

  /// Quote `amount_in_raw` along the route and build a fresh order.
  async fn build_order(
    &self,
    amount_in: Decimal,
    amount_in_raw: U256,
    route: &TradeRoute,
  ) -> Result<SwapOrder, TradeError> {
    let amounts = self
      .ledger
      .simulate_amounts_out(amount_in_raw, &route.addresses())
      .await
      .map_err(|e| TradeError::query(Stage::Quote, e))?;

    let simulated_out = match amounts.as_slice() {
      [_, .., last] => *last,
      _ => {
        return Err(TradeError::query(
          Stage::Quote,
          anyhow::anyhow!("router returned {} amounts for a {}-hop route", amounts.len(), route.hops().len()),
        ));
      }
    };

    Ok(SwapOrder::build(
      amount_in,
      amount_in_raw,
      route.clone(),
      simulated_out,
      Utc::now(),
    ))
  }

  /// Build the order that would be submitted right now, without touching
  /// allowances or submitting anything.
  pub async fn quote(&self, amount_in: Decimal, route: &TradeRoute) -> Result<SwapOrder, TradeError> {
    let amount_in_raw = self.raw_amount_in(amount_in, route).await?;
    self.build_order(amount_in, amount_in_raw, route).await
  }

  /// Run one swap attempt and return its receipt, whatever its status.
  ///
  /// If the approval confirmed and a later step fails, the error is
  /// `TradeError::AfterApproval` carrying the approval receipt.
  #[instrument(skip(self), fields(route = %route, amount_in = %amount_in))]
  pub async fn execute_swap(
    &self,
    amount_in: Decimal,
    route: &TradeRoute,
  ) -> Result<SwapExecution, TradeError> {
    debug!(stage = %SwapStage::Start, "Swap attempt started");

    // Reject bad input before any ledger mutation.
    let amount_in_raw = self.raw_amount_in(amount_in, route).await?;

    debug!(stage = %SwapStage::ApprovalCheck, token = %route.first().symbol);
    let approval = self.allowance.ensure_allowance(route.first()).await?;
    let stage = match approval {
      ApprovalOutcome::Approved(_) => SwapStage::ApprovalSubmitted,
      ApprovalOutcome::Skipped { .. } => SwapStage::ApprovalSkipped,
    };
    debug!(%stage);

    match self.submit_swap(amount_in, amount_in_raw, route).await {
      Ok((order, receipt)) => Ok(SwapExecution {
        approval,
        order,
        receipt,
      }),
      Err(source) => Err(match approval {
        ApprovalOutcome::Approved(approval) => TradeError::AfterApproval {
          approval,
          source: Box::new(source),
        },
        ApprovalOutcome::Skipped { .. } => source,
      }),
    }
  }

  /// Quote, build, submit, and confirm the swap itself.
  async fn submit_swap(
    &self,
    amount_in: Decimal,
    amount_in_raw: U256,
    route: &TradeRoute,
  ) -> Result<(SwapOrder, TransactionReceipt), TradeError> {
    let order = self.build_order(amount_in, amount_in_raw, route).await?;
    info!(
      stage = %SwapStage::SwapBuilt,
      amount_in_raw = %order.amount_in_raw,
      simulated_out = %order.simulated_out,
      minimum_amount_out = %order.minimum_amount_out,
      deadline = %order.deadline,
      "Swap order built"
    );

    let call = ContractCall::SwapExactTokensForTokens {
      router: self.router,
      amount_in: order.amount_in_raw,
      amount_out_min: order.minimum_amount_out,
      path: route.addresses(),
      to: self.wallet,
      deadline: order.deadline_unix(),
    };

    let pending = self
      .ledger
      .submit(&call, self.wallet, self.gas_limit)
      .await
      .map_err(|e| TradeError::submission(Stage::Swap, e))?;
    info!(stage = %SwapStage::SwapSubmitted, tx = %pending.tx_hash, "Swap broadcast");

    let receipt = self
      .ledger
      .wait_for_receipt(&pending)
      .await
      .map_err(|e| TradeError::submission(Stage::Swap, e))?;
    info!(stage = %SwapStage::Confirmed(receipt.status), tx = %receipt.tx_hash, "Swap confirmed");

    Ok((order, receipt))
  }
}

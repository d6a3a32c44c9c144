//! Trading Loop - Monitor, Then Swap Once
//!
//! Composes the price monitor and swap executor into the bot's single
//! run: wait for the price to reach the threshold, execute one swap,
//! classify the receipt, stop. A rejected swap is reported, never
//! retried; trying again means a new run with a fresh price, minimum
//! output, and deadline.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::TradeError;
use crate::domain::order::SwapOrder;
use crate::domain::receipt::TransactionReceipt;
use crate::domain::route::TradeRoute;
use crate::domain::token::TokenAsset;
use crate::ports::ledger::LedgerGateway;

use super::allowance::ApprovalOutcome;
use super::balances::token_balance;
use super::decimals::DecimalsCache;
use super::price_monitor::{MonitorOutcome, PriceMonitor};
use super::swap_executor::SwapExecutor;

/// Wallet and router settings held for the whole run.
#[derive(Debug, Clone)]
pub struct TradingSettings {
  /// Wallet that signs, pays, and receives.
  pub wallet: Address,
  /// Exchange router.
  pub router: Address,
  /// Gas cap for every transaction; `None` lets the provider estimate.
  pub gas_limit: Option<u64>,
  /// Compute the order on trigger but submit nothing.
  pub dry_run: bool,
}

/// Final status of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  /// Swap confirmed with SUCCESS.
  Swapped,
  /// Triggered in dry-run mode; order built, nothing submitted.
  DryRun,
  /// Shutdown arrived before the price triggered.
  Cancelled,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
  pub status: RunStatus,
  /// Number of price observations made.
  pub polls: u64,
  /// Price that fired the trigger.
  pub trigger_price: Option<Decimal>,
  pub approval: Option<ApprovalOutcome>,
  pub order: Option<SwapOrder>,
  /// Receipt of the last confirmed transaction.
  pub last_receipt: Option<TransactionReceipt>,
}

impl RunReport {
  fn cancelled(polls: u64) -> Self {
    Self {
      status: RunStatus::Cancelled,
      polls,
      trigger_price: None,
      approval: None,
      order: None,
      last_receipt: None,
    }
  }
}

pub struct TradingLoop<L: LedgerGateway> {
  ledger: Arc<L>,
  decimals: Arc<DecimalsCache<L>>,
  monitor: PriceMonitor<L>,
  executor: SwapExecutor<L>,
  settings: TradingSettings,
  metrics: Option<Arc<MetricsRegistry>>,
  shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl<L: LedgerGateway> TradingLoop<L> {
  pub fn new(ledger: Arc<L>, settings: TradingSettings) -> Self {
    let decimals = Arc::new(DecimalsCache::new(Arc::clone(&ledger)));
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::clone(&decimals));
    let executor = SwapExecutor::new(
      Arc::clone(&ledger),
      Arc::clone(&decimals),
      settings.wallet,
      settings.router,
      settings.gas_limit,
    );

    Self {
      ledger,
      decimals,
      monitor,
      executor,
      settings,
      metrics: None,
      shutdown_rx: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.monitor = self.monitor.with_metrics(Arc::clone(&metrics));
    self.metrics = Some(metrics);
    self
  }

  /// Stop monitoring when a message arrives on `shutdown_rx`.
  pub fn with_shutdown(mut self, shutdown_rx: broadcast::Receiver<()>) -> Self {
    self.shutdown_rx = Some(shutdown_rx);
    self
  }

  pub fn executor(&self) -> &SwapExecutor<L> {
    &self.executor
  }

  /// The wallet's balance of `token`, token-denominated.
  pub async fn balance_of(&self, token: &TokenAsset) -> Result<Decimal, TradeError> {
    token_balance(self.ledger.as_ref(), self.decimals.as_ref(), self.settings.wallet, token).await
  }

  /// Monitor `route` until its price is `<= threshold_price`, then swap
  /// `amount_in` of its first asset once.
  #[instrument(
    skip(self),
    fields(wallet = %self.settings.wallet, route = %route, dry_run = self.settings.dry_run)
  )]
  pub async fn run(
    &mut self,
    route: &TradeRoute,
    threshold_price: Decimal,
    amount_in: Decimal,
    poll_interval: Duration,
  ) -> Result<RunReport, TradeError> {
    if threshold_price <= Decimal::ZERO {
      return Err(TradeError::InvalidAmount(format!(
        "threshold price must be positive, got {threshold_price}"
      )));
    }

    info!(
      threshold = %threshold_price,
      amount_in = %amount_in,
      "If the price of {} is at or below {} {}/{}, buy {} {} of {}",
      route.last().symbol,
      threshold_price,
      route.first().symbol,
      route.last().symbol,
      amount_in,
      route.first().symbol,
      route.last().symbol,
    );

    let outcome = self
      .monitor
      .monitor_and_trigger(route, threshold_price, poll_interval, self.shutdown_rx.as_mut())
      .await?;

    let (price, polls) = match outcome {
      MonitorOutcome::Triggered { price, polls } => (price, polls),
      MonitorOutcome::Cancelled { polls } => return Ok(RunReport::cancelled(polls)),
    };

    if self.settings.dry_run {
      let order = self.executor.quote(amount_in, route).await?;
      warn!(
        minimum_amount_out = %order.minimum_amount_out,
        deadline = %order.deadline,
        "Dry-run mode: swap order built but NOT submitted"
      );
      return Ok(RunReport {
        status: RunStatus::DryRun,
        polls,
        trigger_price: Some(price),
        approval: None,
        order: Some(order),
        last_receipt: None,
      });
    }

    info!(price = %price, "Price ok, buying {} {} of {}", amount_in, route.first().symbol, route.last().symbol);

    let execution = match self.executor.execute_swap(amount_in, route).await {
      Ok(execution) => execution,
      Err(e) => {
        self.record_failure(&e);
        error!(error = %e, stage = ?e.stage(), "Swap attempt failed");
        return Err(e);
      }
    };

    self.record_execution(&execution.approval, &execution.receipt, route.first());

    if !execution.receipt.is_success() {
      error!(
        tx = %execution.receipt.tx_hash,
        payload = %execution.receipt.payload,
        "Transaction error"
      );
      return Err(TradeError::SwapRejected {
        receipt: execution.receipt,
      });
    }

    info!(tx = %execution.receipt.tx_hash, "Transaction ok");

    Ok(RunReport {
      status: RunStatus::Swapped,
      polls,
      trigger_price: Some(price),
      approval: Some(execution.approval),
      order: Some(execution.order),
      last_receipt: Some(execution.receipt),
    })
  }

  fn record_execution(
    &self,
    approval: &ApprovalOutcome,
    receipt: &TransactionReceipt,
    token: &TokenAsset,
  ) {
    let Some(metrics) = &self.metrics else {
      return;
    };
    match approval {
      ApprovalOutcome::Approved(r) => metrics.observe_transaction("approve", &r.status.to_string()),
      ApprovalOutcome::Skipped { .. } => metrics
        .approvals_skipped
        .with_label_values(&[token.symbol.as_str()])
        .inc(),
    }
    metrics.observe_transaction("swap", &receipt.status.to_string());
  }

  fn record_failure(&self, err: &TradeError) {
    if let Some(metrics) = &self.metrics {
      observe_failure(metrics, err);
    }
  }
}

fn observe_failure(metrics: &MetricsRegistry, err: &TradeError) {
  match err {
    TradeError::ApprovalRejected { receipt, .. } => {
      metrics.observe_transaction("approve", &receipt.status.to_string());
    }
    TradeError::AfterApproval { approval, source } => {
      metrics.observe_transaction("approve", &approval.status.to_string());
      observe_failure(metrics, source);
    }
    TradeError::TransientQuery { stage, .. } => {
      let stage = stage.to_string();
      metrics
        .query_failures
        .with_label_values(&[stage.as_str()])
        .inc();
    }
    _ => {}
  }
}

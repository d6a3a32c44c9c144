//! Price Monitor - Spot Price Polling
//!
//! Quotes one whole unit of the route's first asset through the router
//! and turns the simulated legs into a price. `monitor_and_trigger`
//! polls that price until it drops to the threshold. There is no
//! iteration cap and no timeout: the loop ends on trigger, on a failed
//! read, or on the optional shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::{Stage, TradeError};
use crate::domain::order::{pow10, spot_price};
use crate::domain::route::TradeRoute;
use crate::ports::ledger::LedgerGateway;

use super::decimals::DecimalsCache;

/// How a monitoring session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
  /// Observed price was at or below the threshold.
  Triggered { price: Decimal, polls: u64 },
  /// Shutdown was requested while waiting for the next poll.
  Cancelled { polls: u64 },
}

pub struct PriceMonitor<L: LedgerGateway> {
  ledger: Arc<L>,
  decimals: Arc<DecimalsCache<L>>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<L: LedgerGateway> PriceMonitor<L> {
  pub fn new(ledger: Arc<L>, decimals: Arc<DecimalsCache<L>>) -> Self {
    Self {
      ledger,
      decimals,
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Units of the route's first asset paid per unit of its last asset.
  ///
  /// Each call is a fresh router quote.
  pub async fn query_price(&self, route: &TradeRoute) -> Result<Decimal, TradeError> {
    let decimals = self.decimals.decimals_for_route(route).await?;
    let decimals_in = decimals[0];
    let decimals_out = decimals[decimals.len() - 1];

    let one_unit = pow10(u32::from(decimals_in)).ok_or_else(|| {
      TradeError::InvalidRoute(format!("{} has unusable decimals {decimals_in}", route.first()))
    })?;

    let amounts = self
      .ledger
      .simulate_amounts_out(one_unit, &route.addresses())
      .await
      .map_err(|e| TradeError::query(Stage::PriceQuery, e))?;

    spot_price(&amounts, decimals_in, decimals_out)
  }

  /// Poll the price every `poll_interval` until it is `<= threshold`.
  #[instrument(skip(self, shutdown), fields(route = %route, threshold = %threshold))]
  pub async fn monitor_and_trigger(
    &self,
    route: &TradeRoute,
    threshold: Decimal,
    poll_interval: Duration,
    mut shutdown: Option<&mut broadcast::Receiver<()>>,
  ) -> Result<MonitorOutcome, TradeError> {
    let label = route.to_string();
    let mut polls: u64 = 0;

    loop {
      let price = match self.query_price(route).await {
        Ok(price) => price,
        Err(e) => {
          if let (Some(metrics), Some(stage)) = (&self.metrics, e.stage()) {
            let stage = stage.to_string();
            metrics
              .query_failures
              .with_label_values(&[stage.as_str()])
              .inc();
          }
          warn!(error = %e, polls, "Price query failed");
          return Err(e);
        }
      };
      polls += 1;

      if let Some(metrics) = &self.metrics {
        metrics.observe_price(&label, price);
      }
      info!(
        price = %price,
        unit = %format!("{}/{}", route.first().symbol, route.last().symbol),
        polls,
        "Price observed"
      );

      if price <= threshold {
        info!(price = %price, threshold = %threshold, "Price at or below threshold, triggering");
        return Ok(MonitorOutcome::Triggered { price, polls });
      }

      let Some(rx) = shutdown.as_mut() else {
        tokio::time::sleep(poll_interval).await;
        continue;
      };

      let sleep = tokio::time::sleep(poll_interval);
      tokio::pin!(sleep);
      let closed = tokio::select! {
        biased;
        received = rx.recv() => match received {
          Err(RecvError::Closed) => true,
          _ => {
            info!(polls, "Shutdown requested, monitoring stopped");
            return Ok(MonitorOutcome::Cancelled { polls });
          }
        },
        () = &mut sleep => false,
      };

      if closed {
        // Every sender is gone; nothing can cancel from here on.
        debug!(polls, "Shutdown channel closed, polling continues");
        shutdown = None;
        sleep.await;
      }
    }
  }
}

//! EVM Ledger Gateway - `LedgerGateway` over an alloy Provider
//!
//! Implements the ledger port for any EVM JSON-RPC endpoint and any
//! Uniswap-V2 compatible router:
//! - ERC-20 reads (decimals, balanceOf, allowance) via `eth_call`
//! - Router quotes via `getAmountsOut`
//! - Signed submission through the provider's wallet filler
//! - Receipt polling with a timeout
//!
//! Reads are retried with exponential backoff; submissions are not.

use std::marker::PhantomData;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::Transport;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::receipt::{PendingTx, ReceiptStatus, TransactionReceipt};
use crate::ports::ledger::{ContractCall, LedgerGateway};

use super::contracts::{encode_call, IUniswapV2Router02, IERC20};
use super::retry::RetryPolicy;

/// Gateway settings that do not come from the provider itself.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Router answering `getAmountsOut`.
    pub router: Address,
    /// Retry policy for reads.
    pub retry: RetryPolicy,
    /// Interval between receipt polls.
    pub receipt_poll: Duration,
    /// Give up waiting for a receipt after this long.
    pub receipt_timeout: Duration,
}

/// `LedgerGateway` backed by an alloy provider with a signing wallet.
pub struct EvmLedgerGateway<T, P> {
    provider: P,
    settings: GatewaySettings,
    _transport: PhantomData<fn() -> T>,
}

impl<T, P> EvmLedgerGateway<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    pub fn new(provider: P, settings: GatewaySettings) -> Self {
        Self {
            provider,
            settings,
            _transport: PhantomData,
        }
    }

    /// Check the RPC connection with a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }

    /// `eth_call` `call` on `to` and decode its return value, with retries.
    async fn read<C>(&self, to: Address, call: C, what: &str) -> Result<C::Return>
    where
        C: SolCall + Send,
        C::Return: Send,
    {
        let input = Bytes::from(call.abi_encode());
        let provider = &self.provider;

        self.settings
            .retry
            .run(what, || {
                let tx = TransactionRequest::default()
                    .with_to(to)
                    .with_input(input.clone());
                async move {
                    let output = provider.call(&tx).await?;
                    let decoded = C::abi_decode_returns(&output, true)?;
                    Ok::<_, anyhow::Error>(decoded)
                }
            })
            .await
    }
}

/// Unsigned request for `call`; nonce, fees, and (when `gas_limit` is
/// `None`) gas are left to the provider's fillers.
fn transaction_request(call: &ContractCall, owner: Address, gas_limit: Option<u64>) -> TransactionRequest {
    let (to, input) = encode_call(call);
    let mut tx = TransactionRequest::default()
        .with_from(owner)
        .with_to(to)
        .with_input(input);
    if let Some(limit) = gas_limit {
        tx.set_gas_limit(limit);
    }
    tx
}

#[async_trait]
impl<T, P> LedgerGateway for EvmLedgerGateway<T, P>
where
    T: Transport + Clone,
    P: Provider<T> + 'static,
{
    #[instrument(skip(self))]
    async fn resolve_decimals(&self, token: Address) -> Result<u8> {
        let ret = self
            .read(token, IERC20::decimalsCall {}, "decimals")
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, owner: Address, token: Address) -> Result<U256> {
        let ret = self
            .read(token, IERC20::balanceOfCall { owner }, "balanceOf")
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self))]
    async fn get_allowance(&self, owner: Address, spender: Address, token: Address) -> Result<U256> {
        let ret = self
            .read(token, IERC20::allowanceCall { owner, spender }, "allowance")
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self), fields(hops = path.len()))]
    async fn simulate_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        let call = IUniswapV2Router02::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };
        let ret = self
            .read(self.settings.router, call, "getAmountsOut")
            .await?;

        if ret.amounts.len() != path.len() {
            bail!(
                "getAmountsOut returned {} amounts for a {}-token path",
                ret.amounts.len(),
                path.len()
            );
        }
        debug!(amounts = ?ret.amounts, "Router quote");
        Ok(ret.amounts)
    }

    #[instrument(skip(self, call), fields(kind = call.kind()))]
    async fn submit(&self, call: &ContractCall, owner: Address, gas_limit: Option<u64>) -> Result<PendingTx> {
        let tx = transaction_request(call, owner, gas_limit);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("Failed to broadcast {} transaction", call.kind()))?;

        let tx_hash = *pending.tx_hash();
        info!(tx = %tx_hash, "Transaction broadcast");
        Ok(PendingTx { tx_hash })
    }

    #[instrument(skip(self), fields(tx = %pending.tx_hash))]
    async fn wait_for_receipt(&self, pending: &PendingTx) -> Result<TransactionReceipt> {
        let started = Instant::now();

        loop {
            match self.provider.get_transaction_receipt(pending.tx_hash).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status() {
                        ReceiptStatus::Success
                    } else {
                        ReceiptStatus::Failure
                    };
                    let payload = serde_json::to_value(&receipt)
                        .context("Failed to serialize receipt")?;
                    return Ok(TransactionReceipt {
                        tx_hash: pending.tx_hash,
                        status,
                        payload,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Receipt query failed, still waiting"),
            }

            if started.elapsed() >= self.settings.receipt_timeout {
                bail!(
                    "No receipt for {} after {:?}",
                    pending.tx_hash,
                    self.settings.receipt_timeout
                );
            }
            sleep(self.settings.receipt_poll).await;
        }
    }
}

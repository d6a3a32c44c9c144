//! Transaction receipts as seen by the trading core.

use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Final on-ledger outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Success,
    Failure,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Receipt returned by the ledger gateway once a transaction confirmed.
///
/// `payload` is the gateway's raw receipt, kept verbatim so operators can
/// diagnose reverts. Receipts are consumed once and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub status: ReceiptStatus,
    pub payload: serde_json::Value,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Handle for a broadcast transaction that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub tx_hash: B256,
}

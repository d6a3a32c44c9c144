//! Failure taxonomy for a monitor-then-swap run.
//!
//! Every variant names the stage it came from and, where a transaction was
//! confirmed, carries the receipt so the operator can see the raw result.

use std::fmt;

use super::receipt::TransactionReceipt;

/// Step of the run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decimals,
    Balance,
    PriceQuery,
    AllowanceCheck,
    Approval,
    Quote,
    Swap,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decimals => "decimals",
            Self::Balance => "balance",
            Self::PriceQuery => "price_query",
            Self::AllowanceCheck => "allowance_check",
            Self::Approval => "approval",
            Self::Quote => "quote",
            Self::Swap => "swap",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    /// A ledger read failed after the gateway gave up retrying.
    #[error("{stage} query failed: {source:#}")]
    TransientQuery {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// Signing, broadcasting, or waiting for a receipt failed.
    #[error("{stage} submission failed: {source:#}")]
    Submission {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("approval of {token} confirmed with status {}", receipt.status)]
    ApprovalRejected {
        token: String,
        receipt: TransactionReceipt,
    },

    #[error("swap {} confirmed with status {}", receipt.tx_hash, receipt.status)]
    SwapRejected { receipt: TransactionReceipt },

    /// A step after a SUCCESS approval failed. The approval stays on the
    /// ledger, so its receipt is kept.
    #[error("{source} (approval {} already confirmed)", approval.tx_hash)]
    AfterApproval {
        approval: TransactionReceipt,
        #[source]
        source: Box<TradeError>,
    },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl TradeError {
    pub fn query(stage: Stage, source: anyhow::Error) -> Self {
        Self::TransientQuery { stage, source }
    }

    pub fn submission(stage: Stage, source: anyhow::Error) -> Self {
        Self::Submission { stage, source }
    }

    /// Stage that failed, if the error is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::TransientQuery { stage, .. } | Self::Submission { stage, .. } => Some(*stage),
            Self::ApprovalRejected { .. } => Some(Stage::Approval),
            Self::SwapRejected { .. } => Some(Stage::Swap),
            Self::AfterApproval { source, .. } => source.stage(),
            Self::InvalidRoute(_) | Self::InvalidAmount(_) => None,
        }
    }

    /// Receipt of the last confirmed transaction, if the failure has one.
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            Self::ApprovalRejected { receipt, .. } | Self::SwapRejected { receipt } => Some(receipt),
            Self::AfterApproval { approval, source } => source.receipt().or(Some(approval)),
            _ => None,
        }
    }
}

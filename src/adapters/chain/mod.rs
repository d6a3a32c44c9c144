//! Chain Adapters - EVM Ledger Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider construction with a signing wallet
//! - ERC-20 and Uniswap-V2 router ABIs
//! - The `LedgerGateway` implementation with read retries
//! - Wallet credentials from the environment

pub mod contracts;
pub mod gateway;
pub mod provider;
pub mod retry;
pub mod wallet;

pub use gateway::{EvmLedgerGateway, GatewaySettings};
pub use retry::RetryPolicy;
pub use wallet::WalletCredentials;

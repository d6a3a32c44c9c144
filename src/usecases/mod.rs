//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with the ledger port to implement the
//! bot's single workflow: watch a price, then swap once.
//!
//! Use cases:
//! - `AllowanceManager`: Idempotent router approval
//! - `PriceMonitor`: Spot price query and threshold polling
//! - `SwapExecutor`: Slippage-bounded swap with deadline
//! - `TradingLoop`: Monitor-then-swap run entry point

pub mod allowance;
pub mod balances;
pub mod decimals;
pub mod price_monitor;
pub mod swap_executor;
pub mod trading_loop;

pub use allowance::{AllowanceManager, AllowanceState, ApprovalOutcome};
pub use decimals::DecimalsCache;
pub use price_monitor::{MonitorOutcome, PriceMonitor};
pub use swap_executor::{SwapExecution, SwapExecutor, SwapStage};
pub use trading_loop::{RunReport, RunStatus, TradingLoop, TradingSettings};

//! Domain layer - tokens, routes, swap orders, receipts, errors.
//!
//! Pure types and arithmetic with no I/O. Raw on-ledger amounts are
//! `U256`, human amounts are `Decimal`.

pub mod error;
pub mod order;
pub mod receipt;
pub mod route;
pub mod token;

// Re-export core types for convenience
pub use error::{Stage, TradeError};
pub use order::SwapOrder;
pub use receipt::{PendingTx, ReceiptStatus, TransactionReceipt};
pub use route::TradeRoute;
pub use token::{TokenAsset, TokenRegistry};

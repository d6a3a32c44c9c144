//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, HTTP servers).
//!
//! Adapter categories:
//! - `chain`: EVM ledger interaction via alloy-rs
//! - `metrics`: Prometheus metrics export and health checks

pub mod chain;
pub mod metrics;

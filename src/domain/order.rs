//! Swap order construction and raw-unit arithmetic.
//!
//! All amounts that reach the router are integers (`U256`) in raw token
//! units. Human-facing amounts are `Decimal`. Conversions between the two
//! never touch floating point.

use alloy::primitives::U256;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::{Stage, TradeError};
use super::route::TradeRoute;

/// Slippage allowance in basis points (0.5%).
pub const SLIPPAGE_BPS: u64 = 50;

/// Pool fee allowance in basis points (0.3%).
pub const FEE_BPS: u64 = 30;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Seconds between building a swap and the router-enforced deadline.
pub const DEADLINE_SECS: i64 = 300;

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u32 = 28;

/// `10^exp` as a `U256`, or `None` when it does not fit.
pub fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Convert a token-denominated amount into raw units, truncating any
/// precision finer than one raw unit.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<U256, TradeError> {
    if amount <= Decimal::ZERO {
        return Err(TradeError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }

    let mantissa = u128::try_from(amount.mantissa())
        .map_err(|_| TradeError::InvalidAmount(format!("amount {amount} out of range")))?;
    let mantissa = U256::from(mantissa);
    let scale = amount.scale();
    let decimals = u32::from(decimals);

    let raw = if decimals >= scale {
        pow10(decimals - scale).and_then(|factor| mantissa.checked_mul(factor))
    } else {
        pow10(scale - decimals).map(|divisor| mantissa / divisor)
    }
    .ok_or_else(|| {
        TradeError::InvalidAmount(format!("amount {amount} overflows {decimals} decimals"))
    })?;

    if raw.is_zero() {
        return Err(TradeError::InvalidAmount(format!(
            "amount {amount} is smaller than one raw unit at {decimals} decimals"
        )));
    }
    Ok(raw)
}

/// Convert raw units into a token-denominated `Decimal`.
///
/// Values with more significant digits than `Decimal` holds lose their
/// least significant digits; integer parts that do not fit are an error.
pub fn from_raw_units(raw: U256, decimals: u8) -> Result<Decimal, TradeError> {
    let ten = U256::from(10u8);
    let mut raw = raw;
    let mut scale = u32::from(decimals);

    while scale > MAX_DECIMAL_SCALE {
        raw /= ten;
        scale -= 1;
    }

    loop {
        let candidate = u128::try_from(raw)
            .ok()
            .and_then(|v| i128::try_from(v).ok())
            .and_then(|v| Decimal::try_from_i128_with_scale(v, scale).ok());
        if let Some(value) = candidate {
            return Ok(value.normalize());
        }
        if scale == 0 {
            return Err(TradeError::InvalidAmount(format!(
                "raw amount {raw} does not fit a decimal"
            )));
        }
        raw /= ten;
        scale -= 1;
    }
}

/// Units of the first asset paid per unit of the last asset, from a router
/// quote of `amounts` (one entry per hop).
pub fn spot_price(amounts: &[U256], decimals_in: u8, decimals_out: u8) -> Result<Decimal, TradeError> {
    let (Some(&raw_in), Some(&raw_out)) = (amounts.first(), amounts.last()) else {
        return Err(TradeError::query(
            Stage::PriceQuery,
            anyhow::anyhow!("router returned no amounts"),
        ));
    };
    if amounts.len() < 2 {
        return Err(TradeError::query(
            Stage::PriceQuery,
            anyhow::anyhow!("router returned a single amount"),
        ));
    }

    let amount_in = from_raw_units(raw_in, decimals_in)?;
    let amount_out = from_raw_units(raw_out, decimals_out)?;
    if amount_out.is_zero() {
        return Err(TradeError::query(
            Stage::PriceQuery,
            anyhow::anyhow!("router quoted zero output"),
        ));
    }

    amount_in.checked_div(amount_out).ok_or_else(|| {
        TradeError::InvalidAmount(format!("price {amount_in}/{amount_out} overflows"))
    })
}

/// `floor(simulated_out * (1 - 0.008))`, exact for every `U256`.
pub fn minimum_amount_out(simulated_out: U256) -> U256 {
    let denominator = U256::from(BPS_DENOMINATOR);
    let keep = U256::from(BPS_DENOMINATOR - SLIPPAGE_BPS - FEE_BPS);
    let whole = simulated_out / denominator;
    let rest = simulated_out % denominator;
    whole * keep + rest * keep / denominator
}

/// Router deadline for a swap built at `submitted_at`.
pub fn deadline_for(submitted_at: DateTime<Utc>) -> DateTime<Utc> {
    submitted_at + Duration::seconds(DEADLINE_SECS)
}

/// A fully priced swap, built once per trade attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SwapOrder {
    /// Amount of the first asset, token-denominated.
    pub amount_in: Decimal,
    /// Same amount in raw units, as sent to the router.
    pub amount_in_raw: U256,
    #[serde(skip)]
    pub route: TradeRoute,
    /// Router quote for the last leg at build time.
    pub simulated_out: U256,
    pub minimum_amount_out: U256,
    pub deadline: DateTime<Utc>,
}

impl SwapOrder {
    pub fn build(
        amount_in: Decimal,
        amount_in_raw: U256,
        route: TradeRoute,
        simulated_out: U256,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            amount_in,
            amount_in_raw,
            route,
            simulated_out,
            minimum_amount_out: minimum_amount_out(simulated_out),
            deadline: deadline_for(submitted_at),
        }
    }

    /// Deadline as the unix timestamp the router expects.
    pub fn deadline_unix(&self) -> U256 {
        U256::from(self.deadline.timestamp().max(0).unsigned_abs())
    }
}

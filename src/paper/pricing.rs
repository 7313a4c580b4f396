//! Black-Scholes premiums for the paper market
//!
//! One board-level IV scaled by a per-strike skew. No surface interpolation
//! and no Greeks caching.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::common::errors::{Result, StraddleError};
use crate::common::types::OptionType;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Inputs for pricing one contract
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs {
    pub spot: Decimal,
    pub strike: Decimal,
    /// Volatility after skew
    pub volatility: Decimal,
    pub seconds_to_expiry: i64,
    pub rate: Decimal,
}

/// Premium of one contract, rounded to 18 decimals
pub fn option_price(inputs: &PricingInputs, option_type: OptionType) -> Result<Decimal> {
    let spot = to_f64(inputs.spot, "spot")?;
    let strike = to_f64(inputs.strike, "strike")?;
    let vol = to_f64(inputs.volatility, "volatility")?;
    let rate = to_f64(inputs.rate, "rate")?;
    let t = inputs.seconds_to_expiry.max(0) as f64 / SECONDS_PER_YEAR;

    let price = match option_type {
        OptionType::LongCall => bs_call(spot, strike, vol, t, rate),
        OptionType::LongPut => bs_put(spot, strike, vol, t, rate),
    };

    Decimal::from_f64(price.max(0.0))
        .map(|p| p.round_dp(18))
        .ok_or_else(|| StraddleError::Internal(format!("unrepresentable premium {}", price)))
}

/// Payoff of one expired contract
pub fn intrinsic_value(spot: Decimal, strike: Decimal, option_type: OptionType) -> Decimal {
    match option_type {
        OptionType::LongCall => (spot - strike).max(Decimal::ZERO),
        OptionType::LongPut => (strike - spot).max(Decimal::ZERO),
    }
}

fn to_f64(value: Decimal, name: &str) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| StraddleError::Internal(format!("{} {} out of range", name, value)))
}

fn bs_call(spot: f64, strike: f64, vol: f64, t: f64, rate: f64) -> f64 {
    let discount = (-rate * t).exp();
    let vol_sqrt_t = vol * t.sqrt();
    if vol_sqrt_t < 1e-10 {
        return (spot - strike * discount).max(0.0);
    }

    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * t) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;
    spot * norm_cdf(d1) - strike * discount * norm_cdf(d2)
}

fn bs_put(spot: f64, strike: f64, vol: f64, t: f64, rate: f64) -> f64 {
    // put-call parity
    let discount = (-rate * t).exp();
    bs_call(spot, strike, vol, t, rate) - spot + strike * discount
}

fn norm_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

use rust_decimal::Decimal;

use crate::common::types::{round_cost, round_proceeds, LegQuote, OptionType};
use crate::config::types::MarketConfig;

/// Fee configuration for the market
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFees {
    /// Fee as a fraction of the option premium
    pub option_price_fee_coefficient: Decimal,
    /// Fee as a fraction of the spot price, charged per contract
    pub spot_price_fee_coefficient: Decimal,
}

impl MarketFees {
    pub fn from_config(config: &MarketConfig) -> Self {
        Self {
            option_price_fee_coefficient: config.option_price_fee_coefficient,
            spot_price_fee_coefficient: config.spot_price_fee_coefficient,
        }
    }

    /// No fees at all
    pub fn zero() -> Self {
        Self {
            option_price_fee_coefficient: Decimal::ZERO,
            spot_price_fee_coefficient: Decimal::ZERO,
        }
    }

    /// Fee for one contract
    pub fn per_contract(&self, premium: Decimal, spot: Decimal) -> Decimal {
        self.option_price_fee_coefficient * premium + self.spot_price_fee_coefficient * spot
    }
}

/// Fee-inclusive trade arithmetic
///
/// Buyers pay premium plus fee; sellers receive premium minus fee, floored at zero.
pub struct FeeCalculator;

impl FeeCalculator {
    /// Collateral required to open `contracts` at `premium` each
    ///
    /// # Arguments
    /// * `fees` - Market fee coefficients
    /// * `option_type` - Leg being priced
    /// * `premium` - Premium of one contract
    /// * `spot` - Current spot price
    /// * `contracts` - Whole-contract quantity
    pub fn open_cost(
        fees: &MarketFees,
        option_type: OptionType,
        premium: Decimal,
        spot: Decimal,
        contracts: Decimal,
    ) -> LegQuote {
        let premium_total = round_cost(premium * contracts);
        let fee_total = round_cost(fees.per_contract(premium, spot) * contracts);

        LegQuote {
            option_type,
            premium: premium_total,
            fee: fee_total,
            total_cost: premium_total + fee_total,
        }
    }

    /// Proceeds from closing `contracts` at `premium` each
    ///
    /// # Returns
    /// (proceeds, fee)
    pub fn close_proceeds(
        fees: &MarketFees,
        premium: Decimal,
        spot: Decimal,
        contracts: Decimal,
    ) -> (Decimal, Decimal) {
        let gross = premium * contracts;
        let fee = round_cost(fees.per_contract(premium, spot) * contracts);
        let proceeds = round_proceeds((gross - fee).max(Decimal::ZERO));
        (proceeds, fee)
    }

    /// Payout for `contracts` settled at expiry. Settlement charges no fee.
    pub fn settlement_proceeds(intrinsic: Decimal, contracts: Decimal) -> Decimal {
        round_proceeds(intrinsic.max(Decimal::ZERO) * contracts)
    }
}

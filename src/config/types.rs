//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::errors::{Result, StraddleError};
use crate::common::types::Address;

/// Longest board the paper market will list: ten years
pub const MAX_BOARD_LIFETIME_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Board the paper market lists
    #[serde(default)]
    pub market: MarketConfig,
    /// Vault ownership and funding
    #[serde(default)]
    pub vault: VaultConfig,
    /// Straddle strategy policies
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Reject boards and policies that cannot be traded
    pub fn validate(&self) -> Result<()> {
        let market = &self.market;
        if market.spot_price <= Decimal::ZERO {
            return Err(StraddleError::Configuration("spot_price must be positive".into()));
        }
        if market.base_iv <= Decimal::ZERO {
            return Err(StraddleError::Configuration("base_iv must be positive".into()));
        }
        if market.expires_in_seconds <= 0 || market.expires_in_seconds > MAX_BOARD_LIFETIME_SECONDS {
            return Err(StraddleError::Configuration(format!(
                "expires_in_seconds must be in 1..={}",
                MAX_BOARD_LIFETIME_SECONDS
            )));
        }
        if market.strike_prices.is_empty() {
            return Err(StraddleError::Configuration("board needs at least one strike".into()));
        }
        if market.strike_prices.len() != market.skews.len() {
            return Err(StraddleError::Configuration(format!(
                "{} strike prices but {} skews",
                market.strike_prices.len(),
                market.skews.len()
            )));
        }
        if market.strike_prices.iter().any(|p| *p <= Decimal::ZERO)
            || market.skews.iter().any(|s| *s <= Decimal::ZERO)
        {
            return Err(StraddleError::Configuration(
                "strike prices and skews must be positive".into(),
            ));
        }
        if self.vault.owner.is_zero() {
            return Err(StraddleError::Configuration("vault owner must be set".into()));
        }
        if self.strategy.call_timeout_ms == 0 {
            return Err(StraddleError::Configuration("call_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Options board listed by the paper market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Spot price of the base asset in quote units
    #[serde(default = "default_spot_price")]
    pub spot_price: Decimal,
    /// Seconds until the board expires
    #[serde(default = "default_expires_in")]
    pub expires_in_seconds: i64,
    /// Board implied volatility
    #[serde(default = "default_base_iv")]
    pub base_iv: Decimal,
    /// Per-strike skew multipliers, same order as `strike_prices`
    #[serde(default = "default_skews")]
    pub skews: Vec<Decimal>,
    #[serde(default = "default_strike_prices")]
    pub strike_prices: Vec<Decimal>,
    /// Annualized risk-free rate
    #[serde(default)]
    pub risk_free_rate: Decimal,
    /// Fee charged as a fraction of the option premium
    #[serde(default = "default_option_price_fee")]
    pub option_price_fee_coefficient: Decimal,
    /// Fee charged as a fraction of the spot price, per contract
    #[serde(default)]
    pub spot_price_fee_coefficient: Decimal,
    /// Quote asset seeded into the market's pool
    #[serde(default = "default_pool_deposit")]
    pub pool_deposit: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            spot_price: default_spot_price(),
            expires_in_seconds: default_expires_in(),
            base_iv: default_base_iv(),
            skews: default_skews(),
            strike_prices: default_strike_prices(),
            risk_free_rate: Decimal::ZERO,
            option_price_fee_coefficient: default_option_price_fee(),
            spot_price_fee_coefficient: Decimal::ZERO,
            pool_deposit: default_pool_deposit(),
        }
    }
}

fn default_spot_price() -> Decimal {
    dec!(1000)
}

fn default_expires_in() -> i64 {
    3 * 24 * 60 * 60
}

fn default_base_iv() -> Decimal {
    dec!(0.9)
}

fn default_skews() -> Vec<Decimal> {
    vec![dec!(0.9), dec!(0.8), dec!(0.7)]
}

fn default_strike_prices() -> Vec<Decimal> {
    vec![dec!(900), dec!(1000), dec!(1100)]
}

fn default_option_price_fee() -> Decimal {
    dec!(0.01)
}

fn default_pool_deposit() -> Decimal {
    dec!(1500000)
}

/// Vault ownership and initial funding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Account allowed to trade through the vault
    #[serde(default = "default_owner")]
    pub owner: Address,
    /// Quote asset minted into a fresh vault
    #[serde(default = "default_initial_quote")]
    pub initial_quote_balance: Decimal,
    /// Base asset minted into a fresh vault
    #[serde(default)]
    pub initial_base_balance: Decimal,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            initial_quote_balance: default_initial_quote(),
            initial_base_balance: Decimal::ZERO,
        }
    }
}

fn default_owner() -> Address {
    Address::from_low_u64(0xD3)
}

fn default_initial_quote() -> Decimal {
    dec!(1500000)
}

/// Whether fee-counter trust gates trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustPolicy {
    /// Untrusted strategies may not trade
    #[default]
    Required,
    /// Untrusted strategies trade without incentive credit
    Advisory,
}

/// Straddle strategy policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub trust_policy: TrustPolicy,
    /// Refuse a new round while another is open
    #[serde(default = "default_single_open_round")]
    pub single_open_round: bool,
    /// Deadline for each market call in milliseconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            trust_policy: TrustPolicy::default(),
            single_open_round: default_single_open_round(),
            call_timeout_ms: default_call_timeout(),
        }
    }
}

fn default_single_open_round() -> bool {
    true
}

fn default_call_timeout() -> u64 {
    5000
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// JSON snapshot of the paper environment
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            state_path: default_state_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_state_path() -> String {
    "straddle-state.json".to_string()
}

//! Straddle Vault Library
//!
//! A vault-funded strategy that buys option straddles (a long call and a long
//! put at one strike) from an options market, with an in-process paper
//! environment for exercising it.

pub mod common;
pub mod config;
pub mod paper;
pub mod strategy;
pub mod trust;
pub mod vault;

// Re-export commonly used types
pub use common::errors::{Result, StraddleError};
pub use common::traits::{AssetLedger, FeeCounterRegistry, Market, SpotOracle};
pub use common::types::{
    Address, Asset, BoardId, Leg, LegQuote, OpenPositionParams, OptionPosition, OptionType,
    PositionId, PositionState, Strike, StrikeId, TradeResult,
};
pub use config::types::AppConfig;

// Strategy and vault types
pub use strategy::{
    CollateralSizer, MarketAdapters, RoundStatus, SharedStrategy, StraddlePosition,
    StraddleQuote, StraddleStrategy, VaultStrategy,
};
pub use trust::{InMemoryFeeCounter, TrustDecision, TrustGate};
pub use vault::{CollateralVault, VaultBalances};

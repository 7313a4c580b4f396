//! Paper collaborators
//!
//! In-process implementations of the asset ledger, options market and spot
//! oracle, plus the environment that wires them to a strategy and vault and
//! persists the result between CLI invocations.

mod environment;
mod fees;
mod ledger;
mod market;
mod pricing;
mod state;

pub use environment::{
    PaperEnvironment, StrikeListing, MARKET_ADDRESS, ONE_CONTRACT, STRATEGY_ADDRESS, VAULT_ADDRESS,
};
pub use fees::{FeeCalculator, MarketFees};
pub use ledger::{AssetBook, LedgerSnapshot, PaperLedger};
pub use market::{MarketSnapshot, PaperMarket};
pub use pricing::{intrinsic_value, option_price, PricingInputs};
pub use state::{PaperSnapshot, StateStore};

//! Strategy module for straddle execution
//!
//! This module provides the strategy abstraction the vault delegates to, and
//! the straddle implementation that opens a long call and a long put at one
//! strike.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CollateralVault                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  - Custody of quote/base balances                           │
//! │  - Approves exactly the quoted collateral, revokes after    │
//! └─────────────────────────────────────────────────────────────┘
//!                           │ buy_straddle / close_straddle
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StraddleStrategy                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CollateralSizer   fresh quote of both legs, max-cost check │
//! │  TrustGate         fee counter policy                       │
//! │  Market            open call, open put, unwind on failure   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`VaultStrategy`]: Trait the vault calls into
//! - [`StraddleStrategy`]: Paired long call + long put executor
//! - [`CollateralSizer`]: Prices both legs from the market's own quote
//! - [`StraddlePosition`]: One round, recorded only once both legs exist

mod sizing;
mod straddle;
mod traits;
mod types;

pub use sizing::CollateralSizer;
pub use straddle::StraddleStrategy;
pub use traits::{SharedStrategy, VaultStrategy};
pub use types::{MarketAdapters, RoundStatus, StraddlePosition, StraddleQuote};

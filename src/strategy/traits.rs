use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::common::errors::Result;
use crate::common::types::{Address, StrikeId};
use crate::strategy::types::{StraddlePosition, StraddleQuote};

/// Strategy the vault delegates straddle decisions to
///
/// The vault keeps custody of funds and only ever reaches the market through
/// this interface, so collateral sizing and trust checks cannot be skipped.
///
/// # Implementation Notes
///
/// - Fund-bearing calls must reject any caller other than [`VaultStrategy::vault`]
/// - `buy_straddle` either records a round with both legs or leaves no round behind
#[async_trait]
pub trait VaultStrategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &str;

    /// Account that holds leg positions and pulls collateral
    fn address(&self) -> Address;

    /// The only vault allowed to fund this strategy
    fn vault(&self) -> Address;

    /// Index of the round that has not been closed yet, if any
    async fn open_round(&self) -> Option<u64>;

    /// Collateral needed for `amount` of both legs, read fresh from the market
    async fn quote_cost(&self, strike_id: StrikeId, amount: u128) -> Result<StraddleQuote>;

    /// Pull collateral from the vault and open both legs
    async fn buy_straddle(
        &self,
        caller: &Address,
        strike_id: StrikeId,
        amount: u128,
        max_cost: Decimal,
    ) -> Result<StraddlePosition>;

    /// Close both legs of a round and return proceeds to the vault
    async fn close_straddle(&self, caller: &Address, round_index: u64) -> Result<StraddlePosition>;

    /// Read-only lookup of a round
    async fn view_position(&self, round_index: u64) -> Result<StraddlePosition>;

    /// Current owners of the call and put positions of a round
    async fn leg_owners(&self, round_index: u64) -> Result<(Address, Address)>;
}

/// Shared strategy for dynamic dispatch
pub type SharedStrategy = Arc<dyn VaultStrategy>;

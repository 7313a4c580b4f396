//! Trait definitions for the external collaborators
//!
//! The core never reimplements these; it only consumes their contracts.
//! Every privileged call names its caller explicitly.

use async_trait::async_trait;
use rust_decimal::Decimal;

#[cfg(test)]
use mockall::automock;

use super::errors::Result;
use super::types::{
    Address, Asset, BoardId, LegQuote, OpenPositionParams, OptionPosition, OptionType,
    PositionId, Strike, StrikeId, TradeResult,
};

/// Fungible balances with transfer and approval semantics
#[async_trait]
pub trait AssetLedger: Send + Sync {
    /// Current balance of `owner`, read-only
    async fn balance_of(&self, asset: Asset, owner: &Address) -> Result<Decimal>;

    /// Remaining amount `spender` may debit from `owner`
    async fn allowance(&self, asset: Asset, owner: &Address, spender: &Address) -> Result<Decimal>;

    /// Grant `spender` permission to debit up to `amount` from `caller`
    async fn approve(&self, caller: &Address, asset: Asset, spender: &Address, amount: Decimal) -> Result<()>;

    /// Move `amount` from `caller` to `to`
    async fn transfer(&self, caller: &Address, asset: Asset, to: &Address, amount: Decimal) -> Result<()>;

    /// Move `amount` from `from` to `to` using the allowance granted to `caller`
    async fn transfer_from(
        &self,
        caller: &Address,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<()>;
}

/// Options market / AMM
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Market: Send + Sync {
    /// Account that collects premiums; callers approve it before opening
    fn address(&self) -> Address;

    /// Boards that are currently tradable
    async fn live_boards(&self) -> Result<Vec<BoardId>>;

    /// Strikes listed on a board
    async fn board_strikes(&self, board_id: BoardId) -> Result<Vec<StrikeId>>;

    /// Look up a live strike, failing with `MarketUnavailable` otherwise
    async fn strike(&self, strike_id: StrikeId) -> Result<Strike>;

    /// Cost of opening `amount` contracts of `option_type` at `strike_id`
    async fn quote(&self, strike_id: StrikeId, amount: u128, option_type: OptionType) -> Result<LegQuote>;

    /// Open a position owned by `caller`, debiting its approved quote asset
    async fn open_position(&self, caller: &Address, params: OpenPositionParams) -> Result<TradeResult>;

    /// Close a position owned by `caller`, crediting proceeds to it
    async fn close_position(
        &self,
        caller: &Address,
        position_id: PositionId,
        min_total_proceeds: Decimal,
    ) -> Result<TradeResult>;

    /// Fetch a position token
    async fn position(&self, position_id: PositionId) -> Result<OptionPosition>;

    /// Current owner of a position token
    async fn owner_of(&self, position_id: PositionId) -> Result<Address>;
}

/// Spot price feed for the underlying
#[async_trait]
pub trait SpotOracle: Send + Sync {
    async fn spot_price(&self) -> Result<Decimal>;
}

/// Trust list gating incentive accounting for trade volume
#[async_trait]
pub trait FeeCounterRegistry: Send + Sync {
    /// Owner-only. Returns true if the stored flag changed.
    async fn set_trusted_counter(&self, caller: &Address, counter: &Address, trusted: bool) -> Result<bool>;

    async fn is_trusted_counter(&self, counter: &Address) -> Result<bool>;

    /// Credit a trade to `trader`; only trusted counters may report
    async fn track_fee(
        &self,
        counter: &Address,
        trader: &Address,
        amount: u128,
        total_cost: Decimal,
        total_fee: Decimal,
    ) -> Result<()>;
}

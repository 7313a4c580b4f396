//! Paper options market
//!
//! Lists a single board from configuration and settles trades against a
//! shared [`AssetLedger`]. Market time only moves through [`PaperMarket::fast_forward`],
//! so quotes stay stable between a read and the trade that follows it.
//!
//! Once the board expires nothing new can be opened or quoted, but open
//! positions can still be closed: they settle at intrinsic value with no fee.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::fees::{FeeCalculator, MarketFees};
use super::pricing::{intrinsic_value, option_price, PricingInputs};
use crate::common::errors::{Result, StraddleError};
use crate::common::traits::{AssetLedger, Market, SpotOracle};
use crate::common::types::{
    contracts_from_units, Address, Asset, BoardId, LegQuote, OpenPositionParams,
    OptionPosition, OptionType, PositionId, PositionState, Strike, StrikeId, TradeResult,
};
use crate::config::types::MarketConfig;

const BOARD_ID: BoardId = BoardId(1);

/// Serializable market state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub spot: Decimal,
    /// Market clock
    pub now: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub board_live: bool,
    pub positions: Vec<OptionPosition>,
}

/// One-shot failures for exercising error paths
#[derive(Debug, Default)]
struct FaultInjection {
    reject_opens: Vec<OptionType>,
    reject_closes: bool,
}

/// In-process options market
pub struct PaperMarket {
    address: Address,
    config: MarketConfig,
    fees: MarketFees,
    ledger: Arc<dyn AssetLedger>,
    state: RwLock<MarketSnapshot>,
    faults: RwLock<FaultInjection>,
}

impl PaperMarket {
    /// List a fresh board expiring `expires_in_seconds` after `now`
    pub fn new(
        address: Address,
        config: MarketConfig,
        ledger: Arc<dyn AssetLedger>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let expiry = advance(now, config.expires_in_seconds)?;
        let state = MarketSnapshot {
            spot: config.spot_price,
            now,
            expiry,
            board_live: true,
            positions: Vec::new(),
        };
        Ok(Self::from_snapshot(address, config, ledger, state))
    }

    /// Rebuild a market from persisted state
    pub fn from_snapshot(
        address: Address,
        config: MarketConfig,
        ledger: Arc<dyn AssetLedger>,
        snapshot: MarketSnapshot,
    ) -> Self {
        Self {
            address,
            fees: MarketFees::from_config(&config),
            config,
            ledger,
            state: RwLock::new(snapshot),
            faults: RwLock::new(FaultInjection::default()),
        }
    }

    pub async fn snapshot(&self) -> MarketSnapshot {
        self.state.read().await.clone()
    }

    /// Move the spot price
    pub async fn set_spot(&self, spot: Decimal) -> Result<()> {
        if spot <= Decimal::ZERO {
            return Err(StraddleError::InvalidArgument(format!("spot {} must be positive", spot)));
        }
        self.state.write().await.spot = spot;
        info!(%spot, "Spot price updated");
        Ok(())
    }

    /// Advance the market clock by `seconds`. The clock never moves backwards.
    pub async fn fast_forward(&self, seconds: i64) -> Result<DateTime<Utc>> {
        if seconds < 0 {
            return Err(StraddleError::InvalidArgument(format!(
                "cannot rewind the market clock by {}s",
                -(seconds as i128)
            )));
        }
        let mut state = self.state.write().await;
        state.now = advance(state.now, seconds)?;
        debug!(now = %state.now, "Market clock advanced");
        Ok(state.now)
    }

    /// Take the board offline
    pub async fn expire_board(&self) {
        self.state.write().await.board_live = false;
        info!(board = %BOARD_ID, "Board expired");
    }

    /// Reject the next open of `option_type`
    pub async fn reject_next_open(&self, option_type: OptionType) {
        self.faults.write().await.reject_opens.push(option_type);
    }

    /// Reject every close until cleared
    pub async fn reject_closes(&self, reject: bool) {
        self.faults.write().await.reject_closes = reject;
    }

    fn strike_ids(&self) -> Vec<StrikeId> {
        (1..=self.config.strike_prices.len() as u64).map(StrikeId).collect()
    }

    /// Strike terms from the board, live or not
    fn board_strike(&self, strike_id: StrikeId, state: &MarketSnapshot) -> Option<Strike> {
        let index = strike_id.0.checked_sub(1)? as usize;
        let price = self.config.strike_prices.get(index)?;
        let skew = self.config.skews.get(index)?;
        Some(Strike {
            id: strike_id,
            board_id: BOARD_ID,
            strike_price: *price,
            skew: *skew,
            expiry: state.expiry,
        })
    }

    fn listed_strike(&self, strike_id: StrikeId, state: &MarketSnapshot) -> Result<Strike> {
        match self.board_strike(strike_id, state) {
            Some(strike) if is_live(state) => Ok(strike),
            _ => Err(StraddleError::MarketUnavailable(format!(
                "strike {} is not on a live board",
                strike_id
            ))),
        }
    }

    /// (proceeds, fee) for closing `position` at the current market state
    fn price_close(&self, position: &OptionPosition, state: &MarketSnapshot) -> Result<(Decimal, Decimal)> {
        let contracts = contracts_from_units(position.amount)?;
        if is_live(state) {
            let strike = self.listed_strike(position.strike_id, state)?;
            let premium = self.premium(&strike, position.option_type, state)?;
            return Ok(FeeCalculator::close_proceeds(&self.fees, premium, state.spot, contracts));
        }

        let strike = self.board_strike(position.strike_id, state).ok_or_else(|| {
            StraddleError::Internal(format!(
                "position {} references unlisted strike {}",
                position.id, position.strike_id
            ))
        })?;
        let intrinsic = intrinsic_value(state.spot, strike.strike_price, position.option_type);
        Ok((FeeCalculator::settlement_proceeds(intrinsic, contracts), Decimal::ZERO))
    }

    fn premium(&self, strike: &Strike, option_type: OptionType, state: &MarketSnapshot) -> Result<Decimal> {
        let inputs = PricingInputs {
            spot: state.spot,
            strike: strike.strike_price,
            volatility: self.config.base_iv * strike.skew,
            seconds_to_expiry: (state.expiry - state.now).num_seconds(),
            rate: self.config.risk_free_rate,
        };
        option_price(&inputs, option_type)
    }

    fn price_open(
        &self,
        strike_id: StrikeId,
        amount: u128,
        option_type: OptionType,
        state: &MarketSnapshot,
    ) -> Result<LegQuote> {
        if amount == 0 {
            return Err(StraddleError::InvalidArgument("amount must be positive".into()));
        }
        let strike = self.listed_strike(strike_id, state)?;
        let contracts = contracts_from_units(amount)?;
        let premium = self.premium(&strike, option_type, state)?;
        Ok(FeeCalculator::open_cost(&self.fees, option_type, premium, state.spot, contracts))
    }
}

#[async_trait]
impl Market for PaperMarket {
    fn address(&self) -> Address {
        self.address
    }

    async fn live_boards(&self) -> Result<Vec<BoardId>> {
        let state = self.state.read().await;
        if is_live(&state) {
            Ok(vec![BOARD_ID])
        } else {
            Ok(Vec::new())
        }
    }

    async fn board_strikes(&self, board_id: BoardId) -> Result<Vec<StrikeId>> {
        if board_id != BOARD_ID {
            return Err(StraddleError::NotFound(format!("board {}", board_id)));
        }
        Ok(self.strike_ids())
    }

    async fn strike(&self, strike_id: StrikeId) -> Result<Strike> {
        let state = self.state.read().await;
        self.listed_strike(strike_id, &state)
    }

    async fn quote(&self, strike_id: StrikeId, amount: u128, option_type: OptionType) -> Result<LegQuote> {
        let state = self.state.read().await;
        self.price_open(strike_id, amount, option_type, &state)
    }

    #[instrument(skip(self), fields(market = %self.address))]
    async fn open_position(&self, caller: &Address, params: OpenPositionParams) -> Result<TradeResult> {
        let mut state = self.state.write().await;
        let quote = self.price_open(params.strike_id, params.amount, params.option_type, &state)?;

        if quote.total_cost > params.max_total_cost {
            return Err(StraddleError::SlippageExceeded {
                quoted: quote.total_cost,
                max_cost: params.max_total_cost,
            });
        }

        {
            let mut faults = self.faults.write().await;
            if let Some(pos) = faults.reject_opens.iter().position(|t| *t == params.option_type) {
                faults.reject_opens.remove(pos);
                warn!(option_type = %params.option_type, "Open rejected by fault injection");
                return Err(StraddleError::MarketUnavailable(format!(
                    "{} open reverted",
                    params.option_type
                )));
            }
        }

        self.ledger
            .transfer_from(&self.address, Asset::Quote, caller, &self.address, quote.total_cost)
            .await?;

        let position_id = PositionId(state.positions.len() as u64 + 1);
        state.positions.push(OptionPosition {
            id: position_id,
            strike_id: params.strike_id,
            option_type: params.option_type,
            amount: params.amount,
            owner: *caller,
            state: PositionState::Active,
        });

        info!(
            %position_id,
            strike_id = %params.strike_id,
            option_type = %params.option_type,
            total_cost = %quote.total_cost,
            "Position opened"
        );

        Ok(TradeResult {
            position_id,
            total_cost: quote.total_cost,
            total_fee: quote.fee,
        })
    }

    #[instrument(skip(self), fields(market = %self.address))]
    async fn close_position(
        &self,
        caller: &Address,
        position_id: PositionId,
        min_total_proceeds: Decimal,
    ) -> Result<TradeResult> {
        let mut state = self.state.write().await;

        if self.faults.read().await.reject_closes {
            warn!(%position_id, "Close rejected by fault injection");
            return Err(StraddleError::MarketUnavailable(format!(
                "close of position {} reverted",
                position_id
            )));
        }

        let index = position_index(&state, position_id)?;
        let position = state.positions[index].clone();
        if position.owner != *caller {
            return Err(StraddleError::NotAuthorized(format!(
                "{} does not own position {}",
                caller, position_id
            )));
        }
        if position.state != PositionState::Active {
            return Err(StraddleError::InvalidArgument(format!(
                "position {} is already closed",
                position_id
            )));
        }

        let settled = !is_live(&state);
        let (proceeds, fee) = self.price_close(&position, &state)?;

        if proceeds < min_total_proceeds {
            return Err(StraddleError::SlippageExceeded {
                quoted: proceeds,
                max_cost: min_total_proceeds,
            });
        }

        self.ledger
            .transfer(&self.address, Asset::Quote, caller, proceeds)
            .await?;
        state.positions[index].state = PositionState::Closed;

        info!(%position_id, %proceeds, settled, "Position closed");

        Ok(TradeResult {
            position_id,
            total_cost: proceeds,
            total_fee: fee,
        })
    }

    async fn position(&self, position_id: PositionId) -> Result<OptionPosition> {
        let state = self.state.read().await;
        let index = position_index(&state, position_id)?;
        Ok(state.positions[index].clone())
    }

    async fn owner_of(&self, position_id: PositionId) -> Result<Address> {
        Ok(self.position(position_id).await?.owner)
    }
}

#[async_trait]
impl SpotOracle for PaperMarket {
    async fn spot_price(&self) -> Result<Decimal> {
        Ok(self.state.read().await.spot)
    }
}

fn is_live(state: &MarketSnapshot) -> bool {
    state.board_live && state.now < state.expiry
}

fn advance(from: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(seconds)
        .and_then(|delta| from.checked_add_signed(delta))
        .ok_or_else(|| {
            StraddleError::InvalidArgument(format!("{}s past {} is out of range", seconds, from))
        })
}

fn position_index(state: &MarketSnapshot, position_id: PositionId) -> Result<usize> {
    position_id
        .0
        .checked_sub(1)
        .map(|i| i as usize)
        .filter(|i| *i < state.positions.len())
        .ok_or_else(|| StraddleError::NotFound(format!("position {}", position_id)))
}

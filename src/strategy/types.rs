use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::common::traits::{AssetLedger, FeeCounterRegistry, Market, SpotOracle};
use crate::common::types::{LegQuote, PositionId, StrikeId};

/// Lifecycle of a straddle round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    /// Both legs are held
    Open,
    /// Both legs were closed on the market
    Closed,
}

/// A paired long call + long put at one strike
///
/// Only ever constructed once both legs have position ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraddlePosition {
    pub round_index: u64,
    pub strike_id: StrikeId,
    pub long_call_position_id: PositionId,
    pub long_put_position_id: PositionId,
    /// Fixed-point contract amount of each leg
    pub size_amount: u128,
    /// Quote asset debited from the vault
    pub collateral_paid: Decimal,
    /// Market fees included in `collateral_paid`
    pub fees_paid: Decimal,
    /// Spot price read from the oracle when the round opened
    pub spot_at_open: Decimal,
    /// Whether the trade counted toward fee incentives
    pub incentive_eligible: bool,
    pub status: RoundStatus,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Quote asset returned to the vault on close
    #[serde(default)]
    pub close_proceeds: Option<Decimal>,
}

impl StraddlePosition {
    pub fn is_open(&self) -> bool {
        self.status == RoundStatus::Open
    }

    pub fn position_ids(&self) -> [PositionId; 2] {
        [self.long_call_position_id, self.long_put_position_id]
    }
}

/// Freshly read price of both legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraddleQuote {
    pub strike_id: StrikeId,
    pub amount: u128,
    pub call: LegQuote,
    pub put: LegQuote,
    /// Collateral needed for both legs
    pub total: Decimal,
    pub quoted_at: DateTime<Utc>,
}

impl StraddleQuote {
    pub fn new(strike_id: StrikeId, amount: u128, call: LegQuote, put: LegQuote) -> Self {
        let total = call.total_cost + put.total_cost;
        Self {
            strike_id,
            amount,
            call,
            put,
            total,
            quoted_at: Utc::now(),
        }
    }

    pub fn total_fee(&self) -> Decimal {
        self.call.fee + self.put.fee
    }
}

/// Collaborators wired into a strategy
#[derive(Clone)]
pub struct MarketAdapters {
    /// Asset registry: custody of quote/base balances
    pub ledger: Arc<dyn AssetLedger>,
    pub market: Arc<dyn Market>,
    pub oracle: Arc<dyn SpotOracle>,
    pub fee_counter: Arc<dyn FeeCounterRegistry>,
}

impl std::fmt::Debug for MarketAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketAdapters")
            .field("market", &self.market.address())
            .finish_non_exhaustive()
    }
}

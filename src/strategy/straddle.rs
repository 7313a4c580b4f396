//! Straddle strategy: one long call and one long put at the same strike
//!
//! # Purchase flow
//!
//! ```text
//! vault ──buy_straddle──▶ validate ─▶ trust check ─▶ fresh quote ─▶ max-cost check
//!                                                                       │
//!        ◀── release leftover ◀── open put ◀── open call ◀── pull collateral
//! ```
//!
//! The market gives no all-or-nothing guarantee across the two legs, so a put
//! failure after the call committed is compensated by closing the call. If
//! that close fails too the caller gets `PartiallyExecutedStraddle` naming the
//! orphaned position.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::{Result, StraddleError};
use crate::common::types::{
    Address, Asset, Leg, OpenPositionParams, PositionId, PositionState, StrikeId, TradeResult,
};
use crate::config::types::StrategyConfig;
use crate::strategy::sizing::CollateralSizer;
use crate::strategy::traits::VaultStrategy;
use crate::strategy::types::{MarketAdapters, RoundStatus, StraddlePosition, StraddleQuote};
use crate::trust::{TrustDecision, TrustGate};

#[derive(Clone)]
struct Wiring {
    adapters: MarketAdapters,
    trust: TrustGate,
}

/// Vault-funded straddle executor
pub struct StraddleStrategy {
    address: Address,
    owner: Address,
    vault: Address,
    config: StrategyConfig,
    wiring: RwLock<Option<Wiring>>,
    /// Rounds indexed by `round_index`; the lock serializes purchases
    rounds: Mutex<Vec<StraddlePosition>>,
}

impl StraddleStrategy {
    /// Create an unwired strategy that only `vault` may fund
    pub fn new(address: Address, owner: Address, vault: Address, config: StrategyConfig) -> Self {
        Self {
            address,
            owner,
            vault,
            config,
            wiring: RwLock::new(None),
            rounds: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// One-time wiring of collaborators. A second call fails with `AlreadyInitialized`.
    #[instrument(skip(self, adapters), fields(strategy = %self.address))]
    pub async fn init_adapter(&self, caller: &Address, adapters: MarketAdapters) -> Result<()> {
        if *caller != self.owner {
            return Err(StraddleError::NotAuthorized(format!(
                "{} is not the strategy owner",
                caller
            )));
        }

        let mut wiring = self.wiring.write().await;
        if wiring.is_some() {
            return Err(StraddleError::AlreadyInitialized(format!(
                "strategy {} is already wired",
                self.address
            )));
        }

        let trust = TrustGate::new(adapters.fee_counter.clone(), self.config.trust_policy);
        info!(market = %adapters.market.address(), policy = ?self.config.trust_policy, "Strategy adapters initialized");
        *wiring = Some(Wiring { adapters, trust });
        Ok(())
    }

    /// Whether this strategy is a registered fee counter
    pub async fn is_trusted(&self) -> Result<bool> {
        self.wiring().await?.trust.is_trusted(&self.address).await
    }

    /// Every round opened so far
    pub async fn holdings(&self) -> Vec<StraddlePosition> {
        self.rounds.lock().await.clone()
    }

    /// Reload rounds from persisted state. Owner-only, and only before any round exists.
    pub async fn restore_rounds(&self, caller: &Address, restored: Vec<StraddlePosition>) -> Result<()> {
        if *caller != self.owner {
            return Err(StraddleError::NotAuthorized(format!(
                "{} is not the strategy owner",
                caller
            )));
        }
        if restored
            .iter()
            .enumerate()
            .any(|(i, r)| r.round_index != i as u64)
        {
            return Err(StraddleError::InvalidArgument(
                "restored rounds must be contiguous from 0".into(),
            ));
        }

        let mut rounds = self.rounds.lock().await;
        if !rounds.is_empty() {
            return Err(StraddleError::AlreadyInitialized("strategy already has rounds".into()));
        }
        *rounds = restored;
        Ok(())
    }

    async fn wiring(&self) -> Result<Wiring> {
        self.wiring.read().await.clone().ok_or_else(|| {
            StraddleError::NotInitialized(format!("strategy {} has no adapters", self.address))
        })
    }

    async fn with_deadline<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = Duration::from_millis(self.config.call_timeout_ms);
        tokio::time::timeout(limit, fut).await.map_err(|_| {
            StraddleError::Timeout(format!("{} exceeded {}ms", what, self.config.call_timeout_ms))
        })?
    }

    fn ensure_vault(&self, caller: &Address) -> Result<()> {
        if *caller != self.vault {
            return Err(StraddleError::NotAuthorized(format!(
                "{} is not the vault bound to strategy {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    /// Take exactly `amount` from the vault and let the market debit it
    async fn pull_collateral(&self, adapters: &MarketAdapters, amount: Decimal) -> Result<()> {
        let ledger = &adapters.ledger;
        let balance = ledger.balance_of(Asset::Quote, &self.vault).await?;
        let allowance = ledger.allowance(Asset::Quote, &self.vault, &self.address).await?;
        let available = balance.min(allowance);
        if available < amount {
            return Err(StraddleError::InsufficientCollateral {
                required: amount,
                available,
            });
        }

        ledger
            .transfer_from(&self.address, Asset::Quote, &self.vault, &self.address, amount)
            .await?;

        if let Err(e) = ledger
            .approve(&self.address, Asset::Quote, &adapters.market.address(), amount)
            .await
        {
            self.release_collateral(adapters, amount).await;
            return Err(e);
        }

        debug!(%amount, "Collateral pulled from vault");
        Ok(())
    }

    /// Revoke the market's allowance and send `amount` back to the vault
    async fn release_collateral(&self, adapters: &MarketAdapters, amount: Decimal) {
        let ledger = &adapters.ledger;
        if let Err(e) = ledger
            .approve(&self.address, Asset::Quote, &adapters.market.address(), Decimal::ZERO)
            .await
        {
            error!(error = %e, "Failed to revoke market allowance");
        }

        if amount > Decimal::ZERO {
            match ledger.transfer(&self.address, Asset::Quote, &self.vault, amount).await {
                Ok(()) => debug!(%amount, "Collateral returned to vault"),
                Err(e) => error!(%amount, error = %e, "Failed to return collateral to vault"),
            }
        }
    }

    async fn open_leg(
        &self,
        adapters: &MarketAdapters,
        leg: Leg,
        quote: &StraddleQuote,
        max_cost: Decimal,
        call_cost: Option<Decimal>,
    ) -> Result<TradeResult> {
        let params = OpenPositionParams {
            strike_id: quote.strike_id,
            amount: quote.amount,
            option_type: leg.option_type(),
            max_total_cost: CollateralSizer::leg_bound(leg, quote, max_cost, call_cost),
        };
        let what = format!("{} open", leg);
        self.with_deadline(&what, adapters.market.open_position(&self.address, params))
            .await
    }

    /// Close the committed call after the put failed
    async fn unwind_call(
        &self,
        adapters: &MarketAdapters,
        quote: &StraddleQuote,
        call: &TradeResult,
        cause: StraddleError,
    ) -> StraddleError {
        warn!(position_id = %call.position_id, error = %cause, "Put leg failed, unwinding call leg");

        let unspent = quote.total - call.total_cost;
        let close = self
            .with_deadline(
                "call unwind",
                adapters
                    .market
                    .close_position(&self.address, call.position_id, Decimal::ZERO),
            )
            .await;

        match close {
            Ok(closed) => {
                self.release_collateral(adapters, unspent + closed.total_cost).await;
                info!(position_id = %call.position_id, proceeds = %closed.total_cost, "Call leg unwound");
                StraddleError::LegExecutionFailed {
                    leg: Leg::Put,
                    reason: format!("{}; call position {} unwound", cause, call.position_id),
                }
            }
            Err(close_err) => {
                self.release_collateral(adapters, unspent).await;
                error!(
                    position_id = %call.position_id,
                    error = %close_err,
                    "Call unwind failed, straddle left half open"
                );
                StraddleError::PartiallyExecutedStraddle {
                    orphaned_leg: Leg::Call,
                    position_id: call.position_id,
                    reason: format!("put failed: {}; unwind failed: {}", cause, close_err),
                }
            }
        }
    }

    /// Close one leg, leaving its proceeds with the strategy until swept
    async fn close_leg(&self, adapters: &MarketAdapters, leg: Leg, position_id: PositionId) -> Result<Option<Decimal>> {
        let position = adapters.market.position(position_id).await?;
        if position.state == PositionState::Closed {
            debug!(%position_id, "Leg already closed");
            return Ok(None);
        }

        let what = format!("{} close", leg);
        let closed = self
            .with_deadline(
                &what,
                adapters
                    .market
                    .close_position(&self.address, position_id, Decimal::ZERO),
            )
            .await
            .map_err(|e| StraddleError::LegExecutionFailed {
                leg,
                reason: e.to_string(),
            })?;
        Ok(Some(closed.total_cost))
    }

    /// Send every quote unit the strategy holds to the vault
    ///
    /// The strategy holds nothing between calls, so anything found here is
    /// close proceeds owed to the vault, including any a failed earlier close
    /// left behind.
    async fn sweep_to_vault(&self, adapters: &MarketAdapters) -> Result<Decimal> {
        let ledger = &adapters.ledger;
        let held = ledger.balance_of(Asset::Quote, &self.address).await?;
        if held.is_zero() {
            return Ok(held);
        }

        if let Err(e) = ledger.transfer(&self.address, Asset::Quote, &self.vault, held).await {
            error!(stranded = %held, error = %e, "Proceeds stranded in strategy, retry the close");
            return Err(e);
        }
        debug!(amount = %held, "Proceeds swept to vault");
        Ok(held)
    }
}

#[async_trait]
impl VaultStrategy for StraddleStrategy {
    fn name(&self) -> &str {
        "straddle"
    }

    fn address(&self) -> Address {
        self.address
    }

    fn vault(&self) -> Address {
        self.vault
    }

    async fn open_round(&self) -> Option<u64> {
        self.rounds
            .lock()
            .await
            .iter()
            .find(|r| r.is_open())
            .map(|r| r.round_index)
    }

    async fn quote_cost(&self, strike_id: StrikeId, amount: u128) -> Result<StraddleQuote> {
        let wiring = self.wiring().await?;
        self.with_deadline(
            "quote",
            CollateralSizer::quote(wiring.adapters.market.as_ref(), strike_id, amount),
        )
        .await
    }

    #[instrument(skip(self), fields(strategy = %self.address))]
    async fn buy_straddle(
        &self,
        caller: &Address,
        strike_id: StrikeId,
        amount: u128,
        max_cost: Decimal,
    ) -> Result<StraddlePosition> {
        self.ensure_vault(caller)?;
        let wiring = self.wiring().await?;
        let adapters = &wiring.adapters;
        let mut rounds = self.rounds.lock().await;

        if amount == 0 {
            return Err(StraddleError::InvalidArgument("amount must be positive".into()));
        }
        if max_cost < Decimal::ZERO {
            return Err(StraddleError::InvalidArgument(format!(
                "max cost {} must not be negative",
                max_cost
            )));
        }
        match self
            .with_deadline("strike lookup", adapters.market.strike(strike_id))
            .await
        {
            Ok(_) => {}
            Err(StraddleError::MarketUnavailable(reason)) => {
                return Err(StraddleError::InvalidArgument(reason))
            }
            Err(e) => return Err(e),
        }

        if self.config.single_open_round {
            if let Some(open) = rounds.iter().find(|r| r.is_open()) {
                return Err(StraddleError::RoundStillOpen(open.round_index));
            }
        }

        let decision = wiring.trust.check(&self.address).await?;

        let quote = self
            .with_deadline(
                "quote",
                CollateralSizer::quote(adapters.market.as_ref(), strike_id, amount),
            )
            .await?;
        CollateralSizer::ensure_within(&quote, max_cost)?;
        let spot = self
            .with_deadline("spot", adapters.oracle.spot_price())
            .await?;

        info!(total = %quote.total, call = %quote.call.total_cost, put = %quote.put.total_cost, %spot, "Quoted straddle");

        self.pull_collateral(adapters, quote.total).await?;

        let call = match self.open_leg(adapters, Leg::Call, &quote, max_cost, None).await {
            Ok(result) => result,
            Err(e) => {
                self.release_collateral(adapters, quote.total).await;
                warn!(error = %e, "Call leg failed, collateral returned");
                return Err(StraddleError::LegExecutionFailed {
                    leg: Leg::Call,
                    reason: e.to_string(),
                });
            }
        };

        let put = match self
            .open_leg(adapters, Leg::Put, &quote, max_cost, Some(call.total_cost))
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.unwind_call(adapters, &quote, &call, e).await),
        };

        let spent = call.total_cost + put.total_cost;
        self.release_collateral(adapters, quote.total - spent).await;

        let fees_paid = call.total_fee + put.total_fee;
        if decision == TrustDecision::Eligible {
            if let Err(e) = adapters
                .fee_counter
                .track_fee(&self.address, &self.vault, amount, spent, fees_paid)
                .await
            {
                warn!(error = %e, "Fee tracking failed, trade stands");
            }
        }

        let position = StraddlePosition {
            round_index: rounds.len() as u64,
            strike_id,
            long_call_position_id: call.position_id,
            long_put_position_id: put.position_id,
            size_amount: amount,
            collateral_paid: spent,
            fees_paid,
            spot_at_open: spot,
            incentive_eligible: decision.is_eligible(),
            status: RoundStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            close_proceeds: None,
        };
        rounds.push(position.clone());

        info!(
            round = position.round_index,
            long_call = %position.long_call_position_id,
            long_put = %position.long_put_position_id,
            collateral = %position.collateral_paid,
            "Straddle opened"
        );
        Ok(position)
    }

    #[instrument(skip(self), fields(strategy = %self.address))]
    async fn close_straddle(&self, caller: &Address, round_index: u64) -> Result<StraddlePosition> {
        self.ensure_vault(caller)?;
        let wiring = self.wiring().await?;
        let mut rounds = self.rounds.lock().await;

        let index = round_index as usize;
        let round = rounds
            .get(index)
            .cloned()
            .ok_or_else(|| StraddleError::NotFound(format!("round {}", round_index)))?;
        if !round.is_open() {
            return Err(StraddleError::InvalidArgument(format!(
                "round {} is already closed",
                round_index
            )));
        }

        let legs = [
            (Leg::Call, round.long_call_position_id),
            (Leg::Put, round.long_put_position_id),
        ];
        let mut failure = None;
        for (leg, position_id) in legs {
            match self.close_leg(&wiring.adapters, leg, position_id).await {
                Ok(Some(proceeds)) => {
                    let entry = &mut rounds[index];
                    entry.close_proceeds = Some(entry.close_proceeds.unwrap_or_default() + proceeds);
                }
                Ok(None) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // proceeds of legs that did close go to the vault even when the other leg failed
        let swept = self.sweep_to_vault(&wiring.adapters).await;
        if let Some(e) = failure {
            return Err(e);
        }
        swept?;

        let entry = &mut rounds[index];
        entry.status = RoundStatus::Closed;
        entry.closed_at = Some(Utc::now());
        info!(round = round_index, proceeds = ?entry.close_proceeds, "Straddle closed");
        Ok(entry.clone())
    }

    async fn view_position(&self, round_index: u64) -> Result<StraddlePosition> {
        self.rounds
            .lock()
            .await
            .get(round_index as usize)
            .cloned()
            .ok_or_else(|| StraddleError::NotFound(format!("no straddle opened for round {}", round_index)))
    }

    async fn leg_owners(&self, round_index: u64) -> Result<(Address, Address)> {
        let round = self.view_position(round_index).await?;
        let market = self.wiring().await?.adapters.market;
        let call_owner = market.owner_of(round.long_call_position_id).await?;
        let put_owner = market.owner_of(round.long_put_position_id).await?;
        Ok((call_owner, put_owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::{AssetLedger, FeeCounterRegistry, Market, MockMarket, SpotOracle};
    use crate::common::types::{BoardId, LegQuote, OptionType, Strike};
    use crate::config::types::{MarketConfig, TrustPolicy};
    use crate::paper::{PaperLedger, PaperMarket};
    use crate::trust::InMemoryFeeCounter;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FixedSpot;

    #[async_trait]
    impl SpotOracle for FixedSpot {
        async fn spot_price(&self) -> Result<Decimal> {
            Ok(dec!(1000))
        }
    }

    fn owner() -> Address {
        Address::from_low_u64(0xD3)
    }

    fn vault() -> Address {
        Address::from_low_u64(0x1001)
    }

    fn strategy_address() -> Address {
        Address::from_low_u64(0x2001)
    }

    fn leg_quote(option_type: OptionType, total: Decimal) -> LegQuote {
        LegQuote {
            option_type,
            premium: total,
            fee: Decimal::ZERO,
            total_cost: total,
        }
    }

    /// Market whose call fills at 30, put quotes at 20 and then fails to open
    fn failing_put_market(close_succeeds: bool) -> MockMarket {
        let mut market = MockMarket::new();
        market
            .expect_address()
            .return_const(Address::from_low_u64(0x3001));
        market.expect_strike().returning(|id| {
            Ok(Strike {
                id,
                board_id: BoardId(1),
                strike_price: dec!(1000),
                skew: dec!(0.8),
                expiry: Utc::now(),
            })
        });
        market.expect_quote().returning(|_, _, t| match t {
            OptionType::LongCall => Ok(leg_quote(t, dec!(30))),
            OptionType::LongPut => Ok(leg_quote(t, dec!(20))),
        });
        market
            .expect_open_position()
            .returning(|_, params| match params.option_type {
                OptionType::LongCall => Ok(TradeResult {
                    position_id: PositionId(11),
                    total_cost: dec!(30),
                    total_fee: Decimal::ZERO,
                }),
                OptionType::LongPut => Err(StraddleError::MarketUnavailable("board stale".into())),
            });
        market
            .expect_close_position()
            .returning(move |_, id, _| {
                if close_succeeds {
                    Ok(TradeResult {
                        position_id: id,
                        total_cost: Decimal::ZERO,
                        total_fee: Decimal::ZERO,
                    })
                } else {
                    Err(StraddleError::MarketUnavailable("close reverted".into()))
                }
            });
        market
    }

    async fn wired(market: MockMarket, policy: TrustPolicy) -> (StraddleStrategy, Arc<PaperLedger>) {
        let ledger = Arc::new(PaperLedger::new());
        ledger.mint(Asset::Quote, &vault(), dec!(1000)).await.unwrap();
        ledger
            .approve(&vault(), Asset::Quote, &strategy_address(), dec!(1000))
            .await
            .unwrap();

        let fee_counter = Arc::new(InMemoryFeeCounter::new(owner()));
        fee_counter
            .set_trusted_counter(&owner(), &strategy_address(), true)
            .await
            .unwrap();

        let config = StrategyConfig {
            trust_policy: policy,
            ..StrategyConfig::default()
        };
        let strategy = StraddleStrategy::new(strategy_address(), owner(), vault(), config);
        strategy
            .init_adapter(
                &owner(),
                MarketAdapters {
                    ledger: ledger.clone(),
                    market: Arc::new(market),
                    oracle: Arc::new(FixedSpot),
                    fee_counter,
                },
            )
            .await
            .unwrap();
        (strategy, ledger)
    }

    #[tokio::test]
    async fn test_init_adapter_twice_fails() {
        let (strategy, ledger) = wired(failing_put_market(true), TrustPolicy::Required).await;
        let err = strategy
            .init_adapter(
                &owner(),
                MarketAdapters {
                    ledger,
                    market: Arc::new(failing_put_market(true)),
                    oracle: Arc::new(FixedSpot),
                    fee_counter: Arc::new(InMemoryFeeCounter::new(owner())),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::AlreadyInitialized(_)));
    }

    #[tokio::test]
    async fn test_unwired_strategy_cannot_quote() {
        let strategy = StraddleStrategy::new(strategy_address(), owner(), vault(), StrategyConfig::default());
        let err = strategy.quote_cost(StrikeId(2), 100).await.unwrap_err();
        assert!(matches!(err, StraddleError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_only_vault_may_buy() {
        let (strategy, ledger) = wired(failing_put_market(true), TrustPolicy::Required).await;
        let err = strategy
            .buy_straddle(&owner(), StrikeId(2), 100, dec!(50))
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::NotAuthorized(_)));
        assert_eq!(ledger.balance_of(Asset::Quote, &vault()).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn test_put_failure_unwinds_call() {
        let (strategy, ledger) = wired(failing_put_market(true), TrustPolicy::Required).await;

        let err = strategy
            .buy_straddle(&vault(), StrikeId(2), 100, dec!(50))
            .await
            .unwrap_err();

        assert!(matches!(err, StraddleError::LegExecutionFailed { leg: Leg::Put, .. }));
        assert!(strategy.holdings().await.is_empty());
        // mock market never debits, so the strategy still holds the call cost
        assert_eq!(ledger.balance_of(Asset::Quote, &vault()).await.unwrap(), dec!(970));
        assert_eq!(
            ledger
                .allowance(Asset::Quote, &strategy_address(), &Address::from_low_u64(0x3001))
                .await
                .unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_failed_unwind_reports_orphaned_leg() {
        let (strategy, _) = wired(failing_put_market(false), TrustPolicy::Required).await;

        let err = strategy
            .buy_straddle(&vault(), StrikeId(2), 100, dec!(50))
            .await
            .unwrap_err();

        assert!(err.requires_operator());
        match err {
            StraddleError::PartiallyExecutedStraddle {
                orphaned_leg,
                position_id,
                ..
            } => {
                assert_eq!(orphaned_leg, Leg::Call);
                assert_eq!(position_id, PositionId(11));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(strategy.open_round().await, None);
    }

    #[tokio::test]
    async fn test_slippage_checked_before_funds_move() {
        let (strategy, ledger) = wired(failing_put_market(true), TrustPolicy::Required).await;
        let err = strategy
            .buy_straddle(&vault(), StrikeId(2), 100, dec!(49))
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::SlippageExceeded { quoted, .. } if quoted == dec!(50)));
        assert_eq!(ledger.balance_of(Asset::Quote, &vault()).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn test_restore_rounds_requires_contiguous_indices() {
        let strategy = StraddleStrategy::new(strategy_address(), owner(), vault(), StrategyConfig::default());
        let round = StraddlePosition {
            round_index: 1,
            strike_id: StrikeId(2),
            long_call_position_id: PositionId(1),
            long_put_position_id: PositionId(2),
            size_amount: 100,
            collateral_paid: dec!(50),
            fees_paid: Decimal::ZERO,
            spot_at_open: dec!(1000),
            incentive_eligible: true,
            status: RoundStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            close_proceeds: None,
        };
        let err = strategy
            .restore_rounds(&owner(), vec![round.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::InvalidArgument(_)));

        let round = StraddlePosition { round_index: 0, ..round };
        strategy.restore_rounds(&owner(), vec![round.clone()]).await.unwrap();
        assert_eq!(strategy.view_position(0).await.unwrap(), round);
        assert_eq!(strategy.open_round().await, Some(0));
    }

    /// Ledger that can refuse transfers sent by one address
    struct BlockingLedger {
        inner: PaperLedger,
        blocked: Address,
        blocking: AtomicBool,
    }

    impl BlockingLedger {
        fn check(&self, caller: &Address) -> Result<()> {
            if *caller == self.blocked && self.blocking.load(Ordering::SeqCst) {
                return Err(StraddleError::Internal(format!("transfers from {} frozen", caller)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AssetLedger for BlockingLedger {
        async fn balance_of(&self, asset: Asset, owner: &Address) -> Result<Decimal> {
            self.inner.balance_of(asset, owner).await
        }

        async fn allowance(&self, asset: Asset, owner: &Address, spender: &Address) -> Result<Decimal> {
            self.inner.allowance(asset, owner, spender).await
        }

        async fn approve(&self, caller: &Address, asset: Asset, spender: &Address, amount: Decimal) -> Result<()> {
            self.inner.approve(caller, asset, spender, amount).await
        }

        async fn transfer(&self, caller: &Address, asset: Asset, to: &Address, amount: Decimal) -> Result<()> {
            self.check(caller)?;
            self.inner.transfer(caller, asset, to, amount).await
        }

        async fn transfer_from(
            &self,
            caller: &Address,
            asset: Asset,
            from: &Address,
            to: &Address,
            amount: Decimal,
        ) -> Result<()> {
            self.inner.transfer_from(caller, asset, from, to, amount).await
        }
    }

    #[tokio::test]
    async fn test_proceeds_swept_after_failed_transfer() {
        let ledger = Arc::new(BlockingLedger {
            inner: PaperLedger::new(),
            blocked: strategy_address(),
            blocking: AtomicBool::new(false),
        });
        let market_address = Address::from_low_u64(0x3001);
        ledger.inner.mint(Asset::Quote, &market_address, dec!(1500000)).await.unwrap();
        ledger.inner.mint(Asset::Quote, &vault(), dec!(1000)).await.unwrap();
        ledger
            .approve(&vault(), Asset::Quote, &strategy_address(), dec!(1000))
            .await
            .unwrap();

        let market = Arc::new(
            PaperMarket::new(market_address, MarketConfig::default(), ledger.clone(), Utc::now()).unwrap(),
        );
        let fee_counter = Arc::new(InMemoryFeeCounter::new(owner()));
        fee_counter
            .set_trusted_counter(&owner(), &strategy_address(), true)
            .await
            .unwrap();
        let strategy = StraddleStrategy::new(strategy_address(), owner(), vault(), StrategyConfig::default());
        strategy
            .init_adapter(
                &owner(),
                MarketAdapters {
                    ledger: ledger.clone(),
                    market: market.clone(),
                    oracle: market.clone(),
                    fee_counter,
                },
            )
            .await
            .unwrap();

        let opened = strategy
            .buy_straddle(&vault(), StrikeId(2), 100_000, dec!(1000))
            .await
            .unwrap();
        let after_open = ledger.balance_of(Asset::Quote, &vault()).await.unwrap();

        ledger.blocking.store(true, Ordering::SeqCst);
        let err = strategy.close_straddle(&vault(), 0).await.unwrap_err();
        assert!(matches!(err, StraddleError::Internal(_)));
        assert_eq!(strategy.open_round().await, Some(0));
        let stranded = ledger.balance_of(Asset::Quote, &strategy_address()).await.unwrap();
        assert!(stranded > Decimal::ZERO);
        assert_eq!(
            market.position(opened.long_call_position_id).await.unwrap().state,
            PositionState::Closed
        );

        ledger.blocking.store(false, Ordering::SeqCst);
        let closed = strategy.close_straddle(&vault(), 0).await.unwrap();
        assert_eq!(closed.status, RoundStatus::Closed);
        assert_eq!(closed.close_proceeds, Some(stranded));
        assert_eq!(ledger.balance_of(Asset::Quote, &strategy_address()).await.unwrap(), Decimal::ZERO);
        assert_eq!(
            ledger.balance_of(Asset::Quote, &vault()).await.unwrap(),
            after_open + stranded
        );
    }
}

//! Wiring of the paper collaborators, strategy and vault

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::ledger::PaperLedger;
use super::market::PaperMarket;
use super::state::PaperSnapshot;
use crate::common::errors::Result;
use crate::common::traits::{FeeCounterRegistry, Market};
use crate::common::types::{Address, Asset, LegQuote, OptionType, Strike};
use crate::config::AppConfig;
use crate::strategy::{MarketAdapters, StraddleStrategy};
use crate::trust::InMemoryFeeCounter;
use crate::vault::CollateralVault;

pub const VAULT_ADDRESS: u64 = 0x1001;
pub const STRATEGY_ADDRESS: u64 = 0x2001;
pub const MARKET_ADDRESS: u64 = 0x3001;

/// Fixed-point amount of one contract
pub const ONE_CONTRACT: u128 = 1_000_000_000_000_000_000;

/// A live strike with both legs priced for one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeListing {
    pub strike: Strike,
    pub call: LegQuote,
    pub put: LegQuote,
}

/// Every component of a straddle deployment, in process
pub struct PaperEnvironment {
    pub ledger: Arc<PaperLedger>,
    pub market: Arc<PaperMarket>,
    pub fee_counter: Arc<InMemoryFeeCounter>,
    pub strategy: Arc<StraddleStrategy>,
    pub vault: Arc<CollateralVault>,
    owner: Address,
}

impl PaperEnvironment {
    /// Deploy a fresh environment with market time starting now
    pub async fn bootstrap(config: &AppConfig) -> Result<Self> {
        Self::bootstrap_at(config, Utc::now()).await
    }

    /// Deploy a fresh environment with market time starting at `now`
    ///
    /// Funds the market pool and the vault from configuration. The strategy is
    /// wired but not yet a trusted fee counter.
    pub async fn bootstrap_at(config: &AppConfig, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let ledger = Arc::new(PaperLedger::new());
        let market_address = Address::from_low_u64(MARKET_ADDRESS);
        let vault_address = Address::from_low_u64(VAULT_ADDRESS);

        ledger
            .mint(Asset::Quote, &market_address, config.market.pool_deposit)
            .await?;
        ledger
            .mint(Asset::Quote, &vault_address, config.vault.initial_quote_balance)
            .await?;
        ledger
            .mint(Asset::Base, &vault_address, config.vault.initial_base_balance)
            .await?;

        let market = Arc::new(PaperMarket::new(
            market_address,
            config.market.clone(),
            ledger.clone(),
            now,
        )?);
        let fee_counter = Arc::new(InMemoryFeeCounter::new(config.vault.owner));

        info!(
            vault = %vault_address,
            quote = %config.vault.initial_quote_balance,
            strikes = config.market.strike_prices.len(),
            "Paper environment deployed"
        );
        Self::wire(config, ledger, market, fee_counter).await
    }

    /// Rebuild an environment from a persisted snapshot
    pub async fn restore(config: &AppConfig, snapshot: PaperSnapshot) -> Result<Self> {
        config.validate()?;
        let ledger = Arc::new(PaperLedger::new());
        ledger.restore(snapshot.ledger).await;

        let market = Arc::new(PaperMarket::from_snapshot(
            Address::from_low_u64(MARKET_ADDRESS),
            config.market.clone(),
            ledger.clone(),
            snapshot.market,
        ));
        let fee_counter = Arc::new(InMemoryFeeCounter::new(config.vault.owner));
        fee_counter.restore(snapshot.fee_counter).await;

        let env = Self::wire(config, ledger, market, fee_counter).await?;
        env.strategy
            .restore_rounds(&env.owner, snapshot.rounds)
            .await?;
        Ok(env)
    }

    async fn wire(
        config: &AppConfig,
        ledger: Arc<PaperLedger>,
        market: Arc<PaperMarket>,
        fee_counter: Arc<InMemoryFeeCounter>,
    ) -> Result<Self> {
        let owner = config.vault.owner;
        let vault_address = Address::from_low_u64(VAULT_ADDRESS);

        let strategy = Arc::new(StraddleStrategy::new(
            Address::from_low_u64(STRATEGY_ADDRESS),
            owner,
            vault_address,
            config.strategy.clone(),
        ));
        strategy
            .init_adapter(
                &owner,
                MarketAdapters {
                    ledger: ledger.clone(),
                    market: market.clone(),
                    oracle: market.clone(),
                    fee_counter: fee_counter.clone(),
                },
            )
            .await?;

        let vault = Arc::new(CollateralVault::new(vault_address, owner, ledger.clone()));
        vault.set_strategy(&owner, strategy.clone()).await?;

        Ok(Self {
            ledger,
            market,
            fee_counter,
            strategy,
            vault,
            owner,
        })
    }

    /// Deployer: owns the vault, the strategy and the fee counter registry
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub async fn snapshot(&self) -> PaperSnapshot {
        PaperSnapshot::new(
            self.ledger.snapshot().await,
            self.market.snapshot().await,
            self.fee_counter.snapshot().await,
            self.strategy.holdings().await,
        )
    }

    /// Register or revoke the strategy as a trusted fee counter
    ///
    /// Returns true if the stored flag changed.
    pub async fn set_strategy_trusted(&self, trusted: bool) -> Result<bool> {
        let strategy = Address::from_low_u64(STRATEGY_ADDRESS);
        self.fee_counter
            .set_trusted_counter(&self.owner, &strategy, trusted)
            .await
    }

    /// Live strikes with both legs priced for one contract
    pub async fn strikes(&self) -> Result<Vec<StrikeListing>> {
        let mut listings = Vec::new();
        for board in self.market.live_boards().await? {
            for strike_id in self.market.board_strikes(board).await? {
                let strike = self.market.strike(strike_id).await?;
                let call = self
                    .market
                    .quote(strike_id, ONE_CONTRACT, OptionType::LongCall)
                    .await?;
                let put = self
                    .market
                    .quote(strike_id, ONE_CONTRACT, OptionType::LongPut)
                    .await?;
                listings.push(StrikeListing { strike, call, put });
            }
        }
        Ok(listings)
    }
}

//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use straddle_vault::config::{AppConfig, TrustPolicy};
use straddle_vault::paper::PaperEnvironment;
use straddle_vault::{Address, Asset, AssetLedger, Market, StrikeId, VaultStrategy};

/// Strike the scenario trades: 1000 on the default board
pub const STRIKE: StrikeId = StrikeId(2);

/// Fixed-point contract amount used by the scenario
pub const AMOUNT: u128 = 100_000;

/// Market clock used by every fixture
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Fresh deployment with the default board and a 1.5m vault, strategy untrusted
pub async fn deploy() -> PaperEnvironment {
    deploy_with(AppConfig::default()).await
}

pub async fn deploy_with(config: AppConfig) -> PaperEnvironment {
    PaperEnvironment::bootstrap_at(&config, fixed_now())
        .await
        .expect("paper environment deploys")
}

/// Fresh deployment with the strategy registered as a trusted fee counter
pub async fn deploy_trusted() -> PaperEnvironment {
    let env = deploy().await;
    env.set_strategy_trusted(true).await.unwrap();
    env
}

/// Deployment under the advisory trust policy, strategy untrusted
pub async fn deploy_advisory() -> PaperEnvironment {
    let mut config = AppConfig::default();
    config.strategy.trust_policy = TrustPolicy::Advisory;
    deploy_with(config).await
}

pub async fn vault_quote_balance(env: &PaperEnvironment) -> Decimal {
    env.vault.balances().await.unwrap().quote
}

pub async fn quote_balance(env: &PaperEnvironment, owner: &Address) -> Decimal {
    env.ledger.balance_of(Asset::Quote, owner).await.unwrap()
}

/// Strategy holds nothing and may spend nothing between calls
pub async fn assert_strategy_flat(env: &PaperEnvironment) {
    assert_address_flat(env, &env.strategy.address()).await;
}

/// `strategy` holds no quote asset and has no open allowances with the vault or market
pub async fn assert_address_flat(env: &PaperEnvironment, strategy: &Address) {
    let strategy = *strategy;
    assert_eq!(quote_balance(env, &strategy).await, Decimal::ZERO);
    assert_eq!(
        env.ledger
            .allowance(Asset::Quote, &env.vault.address(), &strategy)
            .await
            .unwrap(),
        Decimal::ZERO
    );
    assert_eq!(
        env.ledger
            .allowance(Asset::Quote, &strategy, &env.market.address())
            .await
            .unwrap(),
        Decimal::ZERO
    );
}

use futures_util::future::try_join;
use rust_decimal::Decimal;

use crate::common::errors::{Result, StraddleError};
use crate::common::traits::Market;
use crate::common::types::{Leg, OptionType, StrikeId};
use crate::strategy::types::StraddleQuote;

/// Collateral sizing from the market's own pricing function
///
/// Quotes are never cached: every call reads both legs from the market so a
/// purchase always sizes collateral against current prices.
pub struct CollateralSizer;

impl CollateralSizer {
    /// Price both legs of a straddle
    pub async fn quote(market: &dyn Market, strike_id: StrikeId, amount: u128) -> Result<StraddleQuote> {
        if amount == 0 {
            return Err(StraddleError::InvalidArgument("amount must be positive".into()));
        }

        let (call, put) = try_join(
            market.quote(strike_id, amount, OptionType::LongCall),
            market.quote(strike_id, amount, OptionType::LongPut),
        )
        .await?;

        Ok(StraddleQuote::new(strike_id, amount, call, put))
    }

    /// Fail with `SlippageExceeded` if the fresh quote exceeds the caller's bound
    pub fn ensure_within(quote: &StraddleQuote, max_cost: Decimal) -> Result<()> {
        if quote.total > max_cost {
            return Err(StraddleError::SlippageExceeded {
                quoted: quote.total,
                max_cost,
            });
        }
        Ok(())
    }

    /// Most a leg may cost without pushing the straddle over `max_cost`
    ///
    /// The call leg reserves the put's quoted cost; the put leg gets whatever
    /// the call actually left over.
    ///
    /// # Arguments
    /// * `leg` - Leg about to be opened
    /// * `quote` - Fresh quote for both legs
    /// * `max_cost` - Caller's bound for the whole straddle
    /// * `call_cost` - Actual cost of the call leg, once it has executed
    pub fn leg_bound(leg: Leg, quote: &StraddleQuote, max_cost: Decimal, call_cost: Option<Decimal>) -> Decimal {
        let reserved = match leg {
            Leg::Call => quote.put.total_cost,
            Leg::Put => call_cost.unwrap_or(quote.call.total_cost),
        };
        (max_cost - reserved).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockMarket;
    use crate::common::types::LegQuote;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn leg(option_type: OptionType, total: Decimal) -> LegQuote {
        LegQuote {
            option_type,
            premium: total,
            fee: Decimal::ZERO,
            total_cost: total,
        }
    }

    fn sample_quote() -> StraddleQuote {
        StraddleQuote::new(
            StrikeId(2),
            100,
            leg(OptionType::LongCall, dec!(30)),
            leg(OptionType::LongPut, dec!(20)),
        )
    }

    #[tokio::test]
    async fn test_quote_sums_both_legs() {
        let mut market = MockMarket::new();
        market
            .expect_quote()
            .with(eq(StrikeId(2)), eq(100u128), eq(OptionType::LongCall))
            .times(1)
            .returning(|_, _, t| Ok(leg(t, dec!(30))));
        market
            .expect_quote()
            .with(eq(StrikeId(2)), eq(100u128), eq(OptionType::LongPut))
            .times(1)
            .returning(|_, _, t| Ok(leg(t, dec!(20))));

        let quote = CollateralSizer::quote(&market, StrikeId(2), 100).await.unwrap();
        assert_eq!(quote.total, dec!(50));
    }

    #[tokio::test]
    async fn test_zero_amount_never_reaches_market() {
        let market = MockMarket::new();
        let err = CollateralSizer::quote(&market, StrikeId(2), 0).await.unwrap_err();
        assert!(matches!(err, StraddleError::InvalidArgument(_)));
    }

    #[test]
    fn test_ensure_within() {
        let quote = sample_quote();
        assert!(CollateralSizer::ensure_within(&quote, dec!(50)).is_ok());
        assert!(matches!(
            CollateralSizer::ensure_within(&quote, dec!(49.99)),
            Err(StraddleError::SlippageExceeded { .. })
        ));
    }

    #[test]
    fn test_leg_bounds() {
        let quote = sample_quote();
        assert_eq!(CollateralSizer::leg_bound(Leg::Call, &quote, dec!(55), None), dec!(35));
        assert_eq!(CollateralSizer::leg_bound(Leg::Put, &quote, dec!(55), Some(dec!(31))), dec!(24));
        assert_eq!(CollateralSizer::leg_bound(Leg::Put, &quote, dec!(10), Some(dec!(31))), dec!(0));
    }
}

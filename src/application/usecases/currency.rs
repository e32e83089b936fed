use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use tracing::warn;

/// Every provider charge is expressed in this currency, whatever the cart was
/// priced in.
pub const SETTLEMENT_CURRENCY: &str = "USD";

/// Currency cart totals arrive in.
pub const SOURCE_CURRENCY: &str = "MAD";

#[async_trait]
#[automock]
pub trait ExchangeRateSource: Send + Sync {
    /// Latest exchange rates for `base`, keyed by target currency code.
    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, Decimal>>;
}

pub struct CurrencyConverter<R>
where
    R: ExchangeRateSource + Send + Sync,
{
    rate_source: Arc<R>,
    fallback_rate: Decimal,
}

impl<R> CurrencyConverter<R>
where
    R: ExchangeRateSource + Send + Sync,
{
    pub fn new(rate_source: Arc<R>) -> Self {
        Self {
            rate_source,
            // 1 MAD ~ 0.10 USD
            fallback_rate: Decimal::new(10, 2),
        }
    }

    /// Converts `amount` from `from` into the settlement currency, rounded to
    /// two decimal places. This never fails: a failed lookup or a response
    /// missing the settlement rate falls back to the fixed rate, so payment
    /// creation is never blocked by the pricing dependency.
    pub async fn to_settlement(&self, amount: Decimal, from: &str) -> Decimal {
        let rate = match self.rate_source.latest_rates(from).await {
            Ok(rates) => match rates.get(SETTLEMENT_CURRENCY) {
                Some(rate) => *rate,
                None => {
                    warn!(
                        from,
                        "currency: {} missing from rate response, using fallback rate",
                        SETTLEMENT_CURRENCY
                    );
                    self.fallback_rate
                }
            },
            Err(err) => {
                warn!(
                    from,
                    error = ?err,
                    "currency: rate lookup failed, using fallback rate"
                );
                self.fallback_rate
            }
        };

        (amount * rate).round_dp(2)
    }
}

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::usecases::payments::{GatewayError, StripeGateway},
    config::config_model::Stripe,
    domain::value_objects::payments::StripeIntent,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Minimal Stripe PaymentIntents client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

impl StripeClient {
    pub fn new(config: Stripe, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            secret_key: config.secret_key,
        })
    }
}

/// Stripe amounts are integers in the currency's minor unit. Sub-cent
/// remainders are truncated, matching the original integration.
fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::from(100))
        .trunc()
        .to_i64()
        .ok_or_else(|| anyhow!("amount {amount} does not fit in minor units"))
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<StripeIntent, GatewayError> {
        let amount_minor = to_minor_units(amount).map_err(GatewayError::Transport)?;

        // https://stripe.com/docs/api/payment_intents/create
        let body = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_lowercase()),
            ("payment_method_types[]", "card".to_string()),
            ("description", description.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/v1/payment_intents"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await
            .map_err(|err| {
                GatewayError::Transport(
                    anyhow::Error::new(err).context("stripe create intent request failed"),
                )
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = match resp.text().await {
                Ok(text) if !text.is_empty() => serde_json::from_str(&text)
                    .unwrap_or_else(|_| serde_json::Value::String(text)),
                Ok(_) => serde_json::Value::Null,
                Err(err) => {
                    serde_json::Value::String(format!("<failed to read response body: {err}>"))
                }
            };

            error!(
                status,
                response_body = %body,
                "stripe api request failed"
            );

            return Err(GatewayError::Provider { status, body });
        }

        let parsed: IntentResponse = resp.json().await.map_err(|err| {
            GatewayError::Transport(
                anyhow::Error::new(err).context("stripe intent response was unreadable"),
            )
        })?;

        Ok(StripeIntent {
            intent_id: parsed.id,
            client_secret: parsed.client_secret,
        })
    }
}

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::usecases::payments::{GatewayError, PaypalGateway},
    config::config_model::Paypal,
    domain::value_objects::payments::{PaypalCapture, PaypalOrder},
};

/// Minimal PayPal Orders API client built on reqwest. A fresh
/// client-credentials token is obtained before every privileged call; no
/// token is cached between requests.
pub struct PaypalClient {
    http: reqwest::Client,
    config: Paypal,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    links: Vec<OrderLink>,
}

#[derive(Debug, Deserialize)]
struct OrderLink {
    rel: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: Option<String>,
    payer: Option<CapturePayer>,
}

#[derive(Debug, Deserialize)]
struct CapturePayer {
    email_address: Option<String>,
    payer_id: Option<String>,
}

impl PaypalClient {
    pub fn new(config: Paypal, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// Client-credentials exchange. A failure here is a generic gateway
    /// failure, not a provider rejection to forward.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| transport(err, "paypal token request failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(status = %status, "paypal token endpoint rejected the credentials");
            return Err(GatewayError::Transport(anyhow!(
                "paypal token endpoint returned status {status}"
            )));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|err| transport(err, "paypal token response was unreadable"))?;
        Ok(parsed.access_token)
    }
}

#[async_trait]
impl PaypalGateway for PaypalClient {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<PaypalOrder, GatewayError> {
        let token = self.access_token().await?;

        // https://developer.paypal.com/docs/api/orders/v2/#orders_create
        let payload = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency,
                    "value": amount.to_string(),
                },
                "description": description,
            }],
            "application_context": {
                "return_url": self.config.return_url,
                "cancel_url": self.config.cancel_url,
            },
        });

        let resp = self
            .http
            .post(format!("{}/v2/checkout/orders", self.config.api_base))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport(err, "paypal create order request failed"))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp, "create order").await);
        }

        let parsed: OrderResponse = resp
            .json()
            .await
            .map_err(|err| transport(err, "paypal create order response was unreadable"))?;

        let approval_url = parsed
            .links
            .into_iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href);

        Ok(PaypalOrder {
            order_id: parsed.id,
            approval_url,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<PaypalCapture, GatewayError> {
        let token = self.access_token().await?;

        // https://developer.paypal.com/docs/api/orders/v2/#orders_capture
        let resp = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.config.api_base, order_id
            ))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|err| transport(err, "paypal capture request failed"))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp, "capture order").await);
        }

        let parsed: CaptureResponse = resp
            .json()
            .await
            .map_err(|err| transport(err, "paypal capture response was unreadable"))?;

        let payer = parsed.payer.unwrap_or(CapturePayer {
            email_address: None,
            payer_id: None,
        });

        Ok(PaypalCapture {
            payer_email: payer.email_address,
            payer_id: payer.payer_id,
            provider_status: parsed.status,
        })
    }
}

fn transport(err: reqwest::Error, context: &'static str) -> GatewayError {
    GatewayError::Transport(anyhow::Error::new(err).context(context))
}

/// Turns a non-success provider response into a `GatewayError::Provider`
/// preserving the status and body for verbatim passthrough to the caller.
async fn provider_error(resp: reqwest::Response, context: &str) -> GatewayError {
    let status = resp.status().as_u16();
    let body = match resp.text().await {
        Ok(text) if !text.is_empty() => serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text)),
        Ok(_) => serde_json::Value::Null,
        Err(err) => serde_json::Value::String(format!("<failed to read response body: {err}>")),
    };

    error!(
        status,
        response_body = %body,
        context,
        "paypal api request failed"
    );

    GatewayError::Provider { status, body }
}

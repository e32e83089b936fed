use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    application::usecases::currency::ExchangeRateSource, config::config_model::ExchangeRate,
};

/// Client for the free exchange-rate API the original integration used
/// (`GET /v4/latest/{base}`). Failures bubble up as plain errors; the
/// converter decides what to do with them.
pub struct ExchangeRateHttpClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, Decimal>,
}

impl ExchangeRateHttpClient {
    pub fn new(config: ExchangeRate, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: config.api_base,
        })
    }
}

#[async_trait]
impl ExchangeRateSource for ExchangeRateHttpClient {
    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, Decimal>> {
        let resp = self
            .http
            .get(format!("{}/v4/latest/{}", self.api_base, base))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("rate lookup returned status {}", resp.status());
        }

        let parsed: RatesResponse = resp.json().await?;
        Ok(parsed.rates)
    }
}

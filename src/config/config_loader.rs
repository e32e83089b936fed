use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let paypal = super::config_model::Paypal {
        api_base: std::env::var("PAYPAL_API_BASE")
            .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
        client_id: std::env::var("PAYPAL_CLIENT_ID").expect("PAYPAL_CLIENT_ID is invalid"),
        secret: std::env::var("PAYPAL_SECRET").expect("PAYPAL_SECRET is invalid"),
        return_url: std::env::var("PAYPAL_RETURN_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment-success".to_string()),
        cancel_url: std::env::var("PAYPAL_CANCEL_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment-cancel".to_string()),
    };

    let stripe = super::config_model::Stripe {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
    };

    let exchange_rate = super::config_model::ExchangeRate {
        api_base: std::env::var("EXCHANGE_RATE_API_BASE")
            .unwrap_or_else(|_| "https://api.exchangerate-api.com".to_string()),
    };

    let gateway_http = super::config_model::GatewayHttp {
        timeout: std::env::var("GATEWAY_HTTP_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        paypal,
        stripe,
        exchange_rate,
        gateway_http,
    })
}

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub paypal: Paypal,
    pub stripe: Stripe,
    pub exchange_rate: ExchangeRate,
    pub gateway_http: GatewayHttp,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

/// Credentials and endpoints for the redirect (order/capture) provider.
/// Injected into the client at construction; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct Paypal {
    pub api_base: String,
    pub client_id: String,
    pub secret: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct ExchangeRate {
    pub api_base: String,
}

/// Bounded timeout applied to every outbound gateway/rate-lookup call.
#[derive(Debug, Clone)]
pub struct GatewayHttp {
    pub timeout: u64,
}

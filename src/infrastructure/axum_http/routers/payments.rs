use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::{
    application::usecases::{
        currency::{CurrencyConverter, ExchangeRateSource},
        payments::{PaymentError, PaymentUseCase, PaypalGateway, StripeGateway},
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{
            carts::CartRepository, payments::PaymentRepository, users::UserRepository,
        },
        value_objects::payments::{
            CaptureOrderRequest, ConfirmStripePaymentRequest, CreateOrderRequest,
            CreateStripePaymentRequest,
        },
    },
    infrastructure::{
        gateways::{
            exchange_rate::ExchangeRateHttpClient, paypal::PaypalClient, stripe::StripeClient,
        },
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                carts::CartPostgres, payments::PaymentPostgres, users::UserPostgres,
            },
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Result<Router> {
    let timeout = Duration::from_secs(config.gateway_http.timeout);

    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let cart_repository = CartPostgres::new(Arc::clone(&db_pool));
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));

    let paypal_client = PaypalClient::new(config.paypal.clone(), timeout)?;
    let stripe_client = StripeClient::new(config.stripe.clone(), timeout)?;
    let rate_client = ExchangeRateHttpClient::new(config.exchange_rate.clone(), timeout)?;
    let converter = CurrencyConverter::new(Arc::new(rate_client));

    let payments_usecase = PaymentUseCase::new(
        Arc::new(user_repository),
        Arc::new(cart_repository),
        Arc::new(payment_repository),
        Arc::new(paypal_client),
        Arc::new(stripe_client),
        Arc::new(converter),
    );

    Ok(Router::new()
        .route("/create-order", post(create_order))
        .route("/capture-order", post(capture_order))
        .route("/create-payment-stripe", post(create_payment_stripe))
        .route("/confirm-stripe-payment", post(confirm_stripe_payment))
        .with_state(Arc::new(payments_usecase)))
}

pub async fn create_order<U, C, P, Pp, St, R>(
    State(payments_usecase): State<Arc<PaymentUseCase<U, C, P, Pp, St, R>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, PaymentError>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    let dto = payments_usecase
        .create_paypal_order(req.email, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

pub async fn capture_order<U, C, P, Pp, St, R>(
    State(payments_usecase): State<Arc<PaymentUseCase<U, C, P, Pp, St, R>>>,
    Json(req): Json<CaptureOrderRequest>,
) -> Result<impl IntoResponse, PaymentError>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    let dto = payments_usecase.capture_paypal_order(req.order_id).await?;
    Ok((StatusCode::OK, Json(dto)))
}

pub async fn create_payment_stripe<U, C, P, Pp, St, R>(
    State(payments_usecase): State<Arc<PaymentUseCase<U, C, P, Pp, St, R>>>,
    Json(req): Json<CreateStripePaymentRequest>,
) -> Result<impl IntoResponse, PaymentError>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    let dto = payments_usecase
        .create_stripe_payment(req.email, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

pub async fn confirm_stripe_payment<U, C, P, Pp, St, R>(
    State(payments_usecase): State<Arc<PaymentUseCase<U, C, P, Pp, St, R>>>,
    Json(req): Json<ConfirmStripePaymentRequest>,
) -> Result<impl IntoResponse, PaymentError>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    let dto = payments_usecase
        .confirm_stripe_payment(req.payment_intent_id)
        .await?;
    Ok((StatusCode::OK, Json(dto)))
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::payments::PaymentEntity;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub email: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureOrderRequest {
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStripePaymentRequest {
    pub email: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmStripePaymentRequest {
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderDto {
    pub order_id: String,
    pub approval_url: Option<String>,
    pub amount_mad: Decimal,
    pub amount_usd: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureOrderDto {
    pub message: String,
    /// `None` when no local record matches the captured order. The capture
    /// itself still succeeded at the provider.
    pub payment: Option<PaymentDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStripePaymentDto {
    pub client_secret: String,
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub provider: String,
    pub external_id: String,
    pub amount_source: Decimal,
    pub currency_source: String,
    pub amount_settlement: Decimal,
    pub currency_settlement: String,
    pub status: String,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            cart_id: entity.cart_id,
            provider: entity.provider,
            external_id: entity.external_id,
            amount_source: entity.amount_source,
            currency_source: entity.currency_source,
            amount_settlement: entity.amount_settlement,
            currency_settlement: entity.currency_settlement,
            status: entity.status,
            payer_email: entity.payer_email,
            payer_id: entity.payer_id,
        }
    }
}

/// Result of a PayPal order creation: the provider order id plus the link the
/// payer must visit to approve the charge.
#[derive(Debug, Clone)]
pub struct PaypalOrder {
    pub order_id: String,
    pub approval_url: Option<String>,
}

/// Payer details returned by a successful PayPal capture.
#[derive(Debug, Clone)]
pub struct PaypalCapture {
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
    pub provider_status: Option<String>,
}

/// Result of a Stripe payment-intent creation.
#[derive(Debug, Clone)]
pub struct StripeIntent {
    pub intent_id: String,
    pub client_secret: String,
}

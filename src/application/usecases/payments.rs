use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::usecases::currency::{
    CurrencyConverter, ExchangeRateSource, SETTLEMENT_CURRENCY, SOURCE_CURRENCY,
};
use crate::domain::{
    entities::payments::InsertPaymentEntity,
    repositories::{
        carts::CartRepository, payments::PaymentRepository, users::UserRepository,
    },
    value_objects::{
        enums::{payment_providers::PaymentProvider, payment_statuses::PaymentStatus},
        payments::{
            CaptureOrderDto, CreateOrderDto, CreateStripePaymentDto, MessageDto, PaymentDto,
            PaypalCapture, PaypalOrder, StripeIntent,
        },
    },
};

/// Failure of an outbound provider call. `Provider` carries the provider's
/// own status and body so the caller can forward them verbatim.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider returned status {status}")]
    Provider { status: u16, body: serde_json::Value },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Redirect-flow provider: the payer approves on an external page, then the
/// order is captured server-side.
#[async_trait]
#[automock]
pub trait PaypalGateway: Send + Sync {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<PaypalOrder, GatewayError>;

    async fn capture_order(&self, order_id: &str) -> Result<PaypalCapture, GatewayError>;
}

/// Direct-charge provider: a payment intent is created and later confirmed
/// with the client secret, no redirect involved.
#[async_trait]
#[automock]
pub trait StripeGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<StripeIntent, GatewayError>;
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("a payment with external id {0} already exists")]
    DuplicateOrder(String),

    #[error("payment provider rejected the request with status {status}")]
    Gateway { status: u16, body: serde_json::Value },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::DuplicateOrder(_) => StatusCode::CONFLICT,
            PaymentError::Gateway { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Provider { status, body } => PaymentError::Gateway { status, body },
            GatewayError::Transport(err) => PaymentError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

/// Owns the payment state machine: resolves the user and cart, converts the
/// amount to the settlement currency, delegates to the selected provider and
/// keeps the local record in sync. Records start PENDING and only ever move
/// to a terminal state once.
pub struct PaymentUseCase<U, C, P, Pp, St, R>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    cart_repo: Arc<C>,
    payment_repo: Arc<P>,
    paypal: Arc<Pp>,
    stripe: Arc<St>,
    converter: Arc<CurrencyConverter<R>>,
}

impl<U, C, P, Pp, St, R> PaymentUseCase<U, C, P, Pp, St, R>
where
    U: UserRepository + Send + Sync + 'static,
    C: CartRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pp: PaypalGateway + Send + Sync + 'static,
    St: StripeGateway + Send + Sync + 'static,
    R: ExchangeRateSource + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        cart_repo: Arc<C>,
        payment_repo: Arc<P>,
        paypal: Arc<Pp>,
        stripe: Arc<St>,
        converter: Arc<CurrencyConverter<R>>,
    ) -> Self {
        Self {
            user_repo,
            cart_repo,
            payment_repo,
            paypal,
            stripe,
            converter,
        }
    }

    pub async fn create_paypal_order(
        &self,
        email: Option<String>,
        amount: Option<Decimal>,
    ) -> UseCaseResult<CreateOrderDto> {
        let amount_mad = amount.ok_or_else(|| {
            let err = PaymentError::Validation("amount is required".to_string());
            warn!(
                status = err.status_code().as_u16(),
                "payments: create order rejected, missing amount"
            );
            err
        })?;

        let (user, cart) = self.resolve_user_and_cart(email).await?;
        let amount_usd = self.converter.to_settlement(amount_mad, SOURCE_CURRENCY).await;
        let description =
            format!("Marketplace purchase ({amount_mad} MAD ~ {amount_usd} USD)");

        info!(
            user_id = %user.id,
            %amount_mad,
            %amount_usd,
            "payments: creating paypal order"
        );

        let order = self
            .paypal
            .create_order(amount_usd, SETTLEMENT_CURRENCY, &description)
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.id,
                    %amount_usd,
                    error = %err,
                    "payments: paypal order creation failed"
                );
                PaymentError::from(err)
            })?;

        let inserted = self
            .payment_repo
            .insert(InsertPaymentEntity {
                user_id: user.id,
                cart_id: cart.map(|cart| cart.id),
                provider: PaymentProvider::Paypal.to_string(),
                external_id: order.order_id.clone(),
                amount_source: amount_mad,
                currency_source: SOURCE_CURRENCY.to_string(),
                amount_settlement: amount_usd,
                currency_settlement: SETTLEMENT_CURRENCY.to_string(),
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.id,
                    order_id = %order.order_id,
                    db_error = ?err,
                    "payments: failed to persist paypal payment record"
                );
                PaymentError::Internal(err)
            })?;

        if inserted.is_none() {
            let err = PaymentError::DuplicateOrder(order.order_id.clone());
            warn!(
                user_id = %user.id,
                order_id = %order.order_id,
                status = err.status_code().as_u16(),
                "payments: duplicate external order id on insert"
            );
            return Err(err);
        }

        info!(
            user_id = %user.id,
            order_id = %order.order_id,
            "payments: paypal order created and recorded as pending"
        );

        Ok(CreateOrderDto {
            order_id: order.order_id,
            approval_url: order.approval_url,
            amount_mad,
            amount_usd,
        })
    }

    pub async fn capture_paypal_order(
        &self,
        order_id: Option<String>,
    ) -> UseCaseResult<CaptureOrderDto> {
        let order_id = order_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            let err = PaymentError::Validation("order_id is required".to_string());
            warn!(
                status = err.status_code().as_u16(),
                "payments: capture rejected, missing order_id"
            );
            err
        })?;

        // A capture is only issued once per order: if the record already
        // reached COMPLETED, the provider call is skipped and the stored
        // outcome is returned untouched.
        let existing = self
            .payment_repo
            .find_by_external_id(&order_id)
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    db_error = ?err,
                    "payments: failed to load payment record before capture"
                );
                PaymentError::Internal(err)
            })?;

        if let Some(payment) =
            existing.filter(|payment| payment.status == PaymentStatus::Completed.to_string())
        {
            info!(
                %order_id,
                payment_id = %payment.id,
                "payments: order already captured, skipping provider call"
            );
            return Ok(CaptureOrderDto {
                message: "Payment captured successfully.".to_string(),
                payment: Some(PaymentDto::from(payment)),
            });
        }

        let capture = self.paypal.capture_order(&order_id).await.map_err(|err| {
            error!(
                %order_id,
                error = %err,
                "payments: paypal capture failed"
            );
            PaymentError::from(err)
        })?;

        let updated = self
            .payment_repo
            .complete_if_pending(
                &order_id,
                capture.payer_email.clone(),
                capture.payer_id.clone(),
            )
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    db_error = ?err,
                    "payments: failed to complete payment record after capture"
                );
                PaymentError::Internal(err)
            })?;

        // No conditional update happened: either a concurrent capture won the
        // race and the record is already terminal, or no record matches the
        // order at all. Neither is an error here.
        let payment = match updated {
            Some(payment) => {
                info!(
                    %order_id,
                    payment_id = %payment.id,
                    provider_status = ?capture.provider_status,
                    "payments: payment record completed"
                );
                Some(payment)
            }
            None => {
                let existing = self
                    .payment_repo
                    .find_by_external_id(&order_id)
                    .await
                    .map_err(|err| {
                        error!(
                            %order_id,
                            db_error = ?err,
                            "payments: failed to load payment record after capture"
                        );
                        PaymentError::Internal(err)
                    })?;
                if existing.is_none() {
                    warn!(%order_id, "payments: captured order has no local record");
                }
                existing
            }
        };

        Ok(CaptureOrderDto {
            message: "Payment captured successfully.".to_string(),
            payment: payment.map(PaymentDto::from),
        })
    }

    pub async fn create_stripe_payment(
        &self,
        email: Option<String>,
        amount: Option<Decimal>,
    ) -> UseCaseResult<CreateStripePaymentDto> {
        if email.as_deref().unwrap_or_default().is_empty() || amount.is_none() {
            let err = PaymentError::Validation("email and amount are required".to_string());
            warn!(
                status = err.status_code().as_u16(),
                "payments: create stripe payment rejected, missing fields"
            );
            return Err(err);
        }
        let amount_mad = amount.unwrap_or_default();

        let (user, cart) = self.resolve_user_and_cart(email).await?;
        let amount_usd = self.converter.to_settlement(amount_mad, SOURCE_CURRENCY).await;
        let description = format!("Marketplace purchase ({amount_mad} MAD)");

        info!(
            user_id = %user.id,
            %amount_mad,
            %amount_usd,
            "payments: creating stripe payment intent"
        );

        let intent = self
            .stripe
            .create_payment_intent(amount_usd, SETTLEMENT_CURRENCY, &description)
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.id,
                    %amount_usd,
                    error = %err,
                    "payments: stripe intent creation failed"
                );
                PaymentError::from(err)
            })?;

        let inserted = self
            .payment_repo
            .insert(InsertPaymentEntity {
                user_id: user.id,
                cart_id: cart.map(|cart| cart.id),
                provider: PaymentProvider::Stripe.to_string(),
                external_id: intent.intent_id.clone(),
                amount_source: amount_mad,
                currency_source: SOURCE_CURRENCY.to_string(),
                amount_settlement: amount_usd,
                currency_settlement: SETTLEMENT_CURRENCY.to_string(),
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.id,
                    intent_id = %intent.intent_id,
                    db_error = ?err,
                    "payments: failed to persist stripe payment record"
                );
                PaymentError::Internal(err)
            })?;

        let payment = inserted.ok_or_else(|| {
            let err = PaymentError::DuplicateOrder(intent.intent_id.clone());
            warn!(
                user_id = %user.id,
                intent_id = %intent.intent_id,
                status = err.status_code().as_u16(),
                "payments: duplicate external intent id on insert"
            );
            err
        })?;

        info!(
            user_id = %user.id,
            intent_id = %intent.intent_id,
            payment_id = %payment.id,
            "payments: stripe intent created and recorded as pending"
        );

        Ok(CreateStripePaymentDto {
            client_secret: intent.client_secret,
            payment_id: payment.id,
        })
    }

    /// Marks the matching record COMPLETED on the caller's word. No provider
    /// round-trip happens here; the original flow trusts the client-confirmed
    /// intent id, and that gap is preserved deliberately.
    pub async fn confirm_stripe_payment(
        &self,
        payment_intent_id: Option<String>,
    ) -> UseCaseResult<MessageDto> {
        let intent_id = payment_intent_id.unwrap_or_default();

        let updated = self
            .payment_repo
            .complete_if_pending(&intent_id, None, None)
            .await
            .map_err(|err| {
                error!(
                    %intent_id,
                    db_error = ?err,
                    "payments: failed to confirm stripe payment record"
                );
                PaymentError::Internal(err)
            })?;

        if updated.is_none() {
            let existing = self
                .payment_repo
                .find_by_external_id(&intent_id)
                .await
                .map_err(|err| {
                    error!(
                        %intent_id,
                        db_error = ?err,
                        "payments: failed to load payment record for confirmation"
                    );
                    PaymentError::Internal(err)
                })?;

            if existing.is_none() {
                let err =
                    PaymentError::NotFound(format!("no payment matches intent {intent_id}"));
                warn!(
                    %intent_id,
                    status = err.status_code().as_u16(),
                    "payments: stripe confirmation for unknown intent"
                );
                return Err(err);
            }
        }

        info!(%intent_id, "payments: stripe payment confirmed");

        Ok(MessageDto {
            message: "Stripe payment confirmed.".to_string(),
        })
    }

    async fn resolve_user_and_cart(
        &self,
        email: Option<String>,
    ) -> UseCaseResult<(
        crate::domain::entities::users::UserEntity,
        Option<crate::domain::entities::carts::CartEntity>,
    )> {
        let email = email.unwrap_or_default();

        let user = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(|err| {
                error!(
                    %email,
                    db_error = ?err,
                    "payments: failed to look up user"
                );
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = PaymentError::NotFound(format!("no user with email {email}"));
                warn!(
                    %email,
                    status = err.status_code().as_u16(),
                    "payments: user not found"
                );
                err
            })?;

        // Cart absence is fine: the payment record simply carries no cart ref.
        let cart = self
            .cart_repo
            .find_by_user_id(user.id)
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.id,
                    db_error = ?err,
                    "payments: failed to look up cart"
                );
                PaymentError::Internal(err)
            })?;

        Ok((user, cart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::usecases::currency::MockExchangeRateSource;
    use crate::domain::entities::carts::CartEntity;
    use crate::domain::entities::payments::PaymentEntity;
    use crate::domain::entities::users::UserEntity;
    use crate::domain::repositories::carts::MockCartRepository;
    use crate::domain::repositories::payments::MockPaymentRepository;
    use crate::domain::repositories::users::MockUserRepository;
    use anyhow::anyhow;
    use chrono::Utc;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn sample_user(email: &str) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id: Uuid::new_v4(),
            username: "amine".to_string(),
            email: email.to_string(),
            first_name: "Amine".to_string(),
            last_name: "B".to_string(),
            phone: None,
            city: Some("Rabat".to_string()),
            role: "STUDENT".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_payment(external_id: &str, status: PaymentStatus) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cart_id: None,
            provider: PaymentProvider::Paypal.to_string(),
            external_id: external_id.to_string(),
            amount_source: Decimal::new(100, 0),
            currency_source: SOURCE_CURRENCY.to_string(),
            amount_settlement: Decimal::new(1100, 2),
            currency_settlement: SETTLEMENT_CURRENCY.to_string(),
            status: status.to_string(),
            payer_email: None,
            payer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn live_rate_source(usd_rate: Decimal) -> MockExchangeRateSource {
        let mut rate_source = MockExchangeRateSource::new();
        rate_source.expect_latest_rates().returning(move |_| {
            Box::pin(async move { Ok(HashMap::from([("USD".to_string(), usd_rate)])) })
        });
        rate_source
    }

    fn usecase(
        user_repo: MockUserRepository,
        cart_repo: MockCartRepository,
        payment_repo: MockPaymentRepository,
        paypal: MockPaypalGateway,
        stripe: MockStripeGateway,
        rate_source: MockExchangeRateSource,
    ) -> PaymentUseCase<
        MockUserRepository,
        MockCartRepository,
        MockPaymentRepository,
        MockPaypalGateway,
        MockStripeGateway,
        MockExchangeRateSource,
    > {
        PaymentUseCase::new(
            Arc::new(user_repo),
            Arc::new(cart_repo),
            Arc::new(payment_repo),
            Arc::new(paypal),
            Arc::new(stripe),
            Arc::new(CurrencyConverter::new(Arc::new(rate_source))),
        )
    }

    #[tokio::test]
    async fn create_paypal_order_persists_pending_record() {
        let user = sample_user("a@x.com");
        let user_id = user.id;
        let cart = CartEntity {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
        };
        let cart_id = cart.id;

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .withf(|email| email == "a@x.com")
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });

        let mut cart_repo = MockCartRepository::new();
        cart_repo
            .expect_find_by_user_id()
            .with(eq(user_id))
            .returning(move |_| {
                let cart = cart.clone();
                Box::pin(async move { Ok(Some(cart)) })
            });

        let mut paypal = MockPaypalGateway::new();
        paypal
            .expect_create_order()
            .withf(|amount, currency, _| *amount == Decimal::new(1100, 2) && currency == "USD")
            .returning(|_, _, _| {
                Box::pin(async {
                    Ok(PaypalOrder {
                        order_id: "ORDER1".to_string(),
                        approval_url: Some("https://paypal.test/approve/ORDER1".to_string()),
                    })
                })
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_insert()
            .withf(move |payment| {
                payment.external_id == "ORDER1"
                    && payment.status == "PENDING"
                    && payment.provider == "paypal"
                    && payment.user_id == user_id
                    && payment.cart_id == Some(cart_id)
                    && payment.amount_settlement == Decimal::new(1100, 2)
            })
            .returning(|payment| {
                Box::pin(async move {
                    let mut entity = sample_payment("ORDER1", PaymentStatus::Pending);
                    entity.user_id = payment.user_id;
                    entity.cart_id = payment.cart_id;
                    Ok(Some(entity))
                })
            });

        let usecase = usecase(
            user_repo,
            cart_repo,
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            live_rate_source(Decimal::new(11, 2)),
        );

        let dto = usecase
            .create_paypal_order(Some("a@x.com".to_string()), Some(Decimal::new(100, 0)))
            .await
            .unwrap();

        assert_eq!(dto.order_id, "ORDER1");
        assert_eq!(dto.amount_usd, Decimal::new(1100, 2));
        assert_eq!(dto.amount_mad, Decimal::new(100, 0));
        assert!(dto.approval_url.is_some());
    }

    #[tokio::test]
    async fn create_paypal_order_requires_amount() {
        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            MockPaymentRepository::new(),
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .create_paypal_order(Some("a@x.com".to_string()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[tokio::test]
    async fn create_paypal_order_unknown_user_is_not_found() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            user_repo,
            MockCartRepository::new(),
            MockPaymentRepository::new(),
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .create_paypal_order(Some("ghost@x.com".to_string()), Some(Decimal::new(10, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::NotFound(_)));
        assert_eq!(err.status_code().as_u16(), 404);
    }

    #[tokio::test]
    async fn create_paypal_order_rejects_duplicate_external_id() {
        let user = sample_user("a@x.com");

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        let mut cart_repo = MockCartRepository::new();
        cart_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let mut paypal = MockPaypalGateway::new();
        paypal.expect_create_order().returning(|_, _, _| {
            Box::pin(async {
                Ok(PaypalOrder {
                    order_id: "ORDER1".to_string(),
                    approval_url: None,
                })
            })
        });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_insert()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            user_repo,
            cart_repo,
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            live_rate_source(Decimal::new(10, 2)),
        );

        let err = usecase
            .create_paypal_order(Some("a@x.com".to_string()), Some(Decimal::new(100, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::DuplicateOrder(_)));
        assert_eq!(err.status_code().as_u16(), 409);
    }

    #[tokio::test]
    async fn create_paypal_order_forwards_gateway_failure_without_insert() {
        let user = sample_user("a@x.com");

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        let mut cart_repo = MockCartRepository::new();
        cart_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let mut paypal = MockPaypalGateway::new();
        paypal.expect_create_order().returning(|_, _, _| {
            Box::pin(async {
                Err(GatewayError::Provider {
                    status: 422,
                    body: json!({"name": "UNPROCESSABLE_ENTITY"}),
                })
            })
        });

        // No insert expectation: a call would panic the mock.
        let payment_repo = MockPaymentRepository::new();

        let usecase = usecase(
            user_repo,
            cart_repo,
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            live_rate_source(Decimal::new(10, 2)),
        );

        let err = usecase
            .create_paypal_order(Some("a@x.com".to_string()), Some(Decimal::new(100, 0)))
            .await
            .unwrap_err();

        match err {
            PaymentError::Gateway { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, json!({"name": "UNPROCESSABLE_ENTITY"}));
            }
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_paypal_order_completes_pending_record() {
        let mut paypal = MockPaypalGateway::new();
        paypal
            .expect_capture_order()
            .withf(|order_id| order_id == "ORDER1")
            .returning(|_| {
                Box::pin(async {
                    Ok(PaypalCapture {
                        payer_email: Some("payer@x.com".to_string()),
                        payer_id: Some("PAYER9".to_string()),
                        provider_status: Some("COMPLETED".to_string()),
                    })
                })
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_id()
            .withf(|order_id| order_id == "ORDER1")
            .returning(|_| {
                Box::pin(async { Ok(Some(sample_payment("ORDER1", PaymentStatus::Pending))) })
            });
        payment_repo
            .expect_complete_if_pending()
            .withf(|order_id, payer_email, payer_id| {
                order_id == "ORDER1"
                    && payer_email.as_deref() == Some("payer@x.com")
                    && payer_id.as_deref() == Some("PAYER9")
            })
            .returning(|_, payer_email, payer_id| {
                Box::pin(async move {
                    let mut entity = sample_payment("ORDER1", PaymentStatus::Completed);
                    entity.payer_email = payer_email;
                    entity.payer_id = payer_id;
                    Ok(Some(entity))
                })
            });

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .capture_paypal_order(Some("ORDER1".to_string()))
            .await
            .unwrap();

        let payment = dto.payment.expect("payment should be present");
        assert_eq!(payment.status, "COMPLETED");
        assert_eq!(payment.payer_email.as_deref(), Some("payer@x.com"));
        assert_eq!(payment.payer_id.as_deref(), Some("PAYER9"));
    }

    #[tokio::test]
    async fn capture_paypal_order_skips_gateway_for_completed_record() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_id()
            .withf(|order_id| order_id == "ORDER1")
            .returning(|_| {
                Box::pin(async {
                    let mut entity = sample_payment("ORDER1", PaymentStatus::Completed);
                    entity.payer_email = Some("payer@x.com".to_string());
                    entity.payer_id = Some("PAYER9".to_string());
                    Ok(Some(entity))
                })
            });

        // No gateway or update expectations: a provider would reject a second
        // capture of the same order, so any call here panics the mock.
        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .capture_paypal_order(Some("ORDER1".to_string()))
            .await
            .unwrap();

        // First capture's payer details survive the repeated call.
        let payment = dto.payment.expect("payment should be present");
        assert_eq!(payment.status, "COMPLETED");
        assert_eq!(payment.payer_email.as_deref(), Some("payer@x.com"));
        assert_eq!(payment.payer_id.as_deref(), Some("PAYER9"));
    }

    #[tokio::test]
    async fn capture_paypal_order_keeps_winner_when_losing_race() {
        let mut paypal = MockPaypalGateway::new();
        paypal.expect_capture_order().returning(|_| {
            Box::pin(async {
                Ok(PaypalCapture {
                    payer_email: Some("late@x.com".to_string()),
                    payer_id: Some("LATE".to_string()),
                    provider_status: Some("COMPLETED".to_string()),
                })
            })
        });

        let mut payment_repo = MockPaymentRepository::new();
        // Still PENDING when the capture is issued...
        payment_repo
            .expect_find_by_external_id()
            .times(1)
            .returning(|_| {
                Box::pin(async { Ok(Some(sample_payment("ORDER1", PaymentStatus::Pending))) })
            });
        // ...but a concurrent capture wins the conditional update.
        payment_repo
            .expect_complete_if_pending()
            .returning(|_, _, _| Box::pin(async { Ok(None) }));
        payment_repo
            .expect_find_by_external_id()
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    let mut entity = sample_payment("ORDER1", PaymentStatus::Completed);
                    entity.payer_email = Some("payer@x.com".to_string());
                    entity.payer_id = Some("PAYER9".to_string());
                    Ok(Some(entity))
                })
            });

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .capture_paypal_order(Some("ORDER1".to_string()))
            .await
            .unwrap();

        // The racing winner's payer details stand, not this call's.
        let payment = dto.payment.expect("payment should be present");
        assert_eq!(payment.payer_email.as_deref(), Some("payer@x.com"));
        assert_eq!(payment.payer_id.as_deref(), Some("PAYER9"));
    }

    #[tokio::test]
    async fn capture_paypal_order_tolerates_missing_record() {
        let mut paypal = MockPaypalGateway::new();
        paypal.expect_capture_order().returning(|_| {
            Box::pin(async {
                Ok(PaypalCapture {
                    payer_email: None,
                    payer_id: None,
                    provider_status: Some("COMPLETED".to_string()),
                })
            })
        });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_complete_if_pending()
            .returning(|_, _, _| Box::pin(async { Ok(None) }));
        payment_repo
            .expect_find_by_external_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .capture_paypal_order(Some("ORDER-UNKNOWN".to_string()))
            .await
            .unwrap();

        assert!(dto.payment.is_none());
    }

    #[tokio::test]
    async fn capture_paypal_order_requires_order_id() {
        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            MockPaymentRepository::new(),
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase.capture_paypal_order(None).await.unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn capture_paypal_order_forwards_provider_error_without_mutation() {
        let mut paypal = MockPaypalGateway::new();
        paypal.expect_capture_order().returning(|_| {
            Box::pin(async {
                Err(GatewayError::Provider {
                    status: 404,
                    body: json!({"name": "RESOURCE_NOT_FOUND"}),
                })
            })
        });

        // Only the pre-capture lookup is expected: any write panics the mock.
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            paypal,
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .capture_paypal_order(Some("ORDER1".to_string()))
            .await
            .unwrap_err();

        match err {
            PaymentError::Gateway { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, json!({"name": "RESOURCE_NOT_FOUND"}));
            }
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_stripe_payment_returns_client_secret() {
        let user = sample_user("a@x.com");
        let user_id = user.id;

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let user = user.clone();
            Box::pin(async move { Ok(Some(user)) })
        });

        let mut cart_repo = MockCartRepository::new();
        cart_repo
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_payment_intent()
            .withf(|amount, currency, _| *amount == Decimal::new(1100, 2) && currency == "USD")
            .returning(|_, _, _| {
                Box::pin(async {
                    Ok(StripeIntent {
                        intent_id: "pi_123".to_string(),
                        client_secret: "pi_123_secret".to_string(),
                    })
                })
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_insert()
            .withf(move |payment| {
                payment.external_id == "pi_123"
                    && payment.provider == "stripe"
                    && payment.status == "PENDING"
                    && payment.user_id == user_id
            })
            .returning(|payment| {
                Box::pin(async move {
                    let mut entity = sample_payment("pi_123", PaymentStatus::Pending);
                    entity.provider = payment.provider.clone();
                    Ok(Some(entity))
                })
            });

        let usecase = usecase(
            user_repo,
            cart_repo,
            payment_repo,
            MockPaypalGateway::new(),
            stripe,
            live_rate_source(Decimal::new(11, 2)),
        );

        let dto = usecase
            .create_stripe_payment(Some("a@x.com".to_string()), Some(Decimal::new(100, 0)))
            .await
            .unwrap();

        assert_eq!(dto.client_secret, "pi_123_secret");
    }

    #[tokio::test]
    async fn create_stripe_payment_requires_both_fields() {
        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            MockPaymentRepository::new(),
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .create_stripe_payment(None, Some(Decimal::new(100, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        let err = usecase
            .create_stripe_payment(Some("a@x.com".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn confirm_stripe_payment_completes_pending_record() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_complete_if_pending()
            .withf(|intent_id, payer_email, payer_id| {
                intent_id == "pi_123" && payer_email.is_none() && payer_id.is_none()
            })
            .returning(|_, _, _| {
                Box::pin(async { Ok(Some(sample_payment("pi_123", PaymentStatus::Completed))) })
            });

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .confirm_stripe_payment(Some("pi_123".to_string()))
            .await
            .unwrap();

        assert_eq!(dto.message, "Stripe payment confirmed.");
    }

    #[tokio::test]
    async fn confirm_stripe_payment_is_idempotent_for_completed_record() {
        let mut payment_repo = MockPaymentRepository::new();
        // Already terminal: the conditional update is a no-op.
        payment_repo
            .expect_complete_if_pending()
            .returning(|_, _, _| Box::pin(async { Ok(None) }));
        payment_repo
            .expect_find_by_external_id()
            .withf(|intent_id| intent_id == "pi_123")
            .returning(|_| {
                Box::pin(async { Ok(Some(sample_payment("pi_123", PaymentStatus::Completed))) })
            });

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let dto = usecase
            .confirm_stripe_payment(Some("pi_123".to_string()))
            .await
            .unwrap();

        assert_eq!(dto.message, "Stripe payment confirmed.");
    }

    #[tokio::test]
    async fn confirm_stripe_payment_unknown_intent_is_not_found() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_complete_if_pending()
            .returning(|_, _, _| Box::pin(async { Ok(None) }));
        payment_repo
            .expect_find_by_external_id()
            .withf(|intent_id| intent_id == "pi_123")
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            MockUserRepository::new(),
            MockCartRepository::new(),
            payment_repo,
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .confirm_stripe_payment(Some("pi_123".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::NotFound(_)));
        assert_eq!(err.status_code().as_u16(), 404);
    }

    #[tokio::test]
    async fn internal_repo_failure_maps_to_internal_error() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .returning(|_| Box::pin(async { Err(anyhow!("pool exhausted")) }));

        let usecase = usecase(
            user_repo,
            MockCartRepository::new(),
            MockPaymentRepository::new(),
            MockPaypalGateway::new(),
            MockStripeGateway::new(),
            MockExchangeRateSource::new(),
        );

        let err = usecase
            .create_paypal_order(Some("a@x.com".to_string()), Some(Decimal::new(5, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Internal(_)));
        assert_eq!(err.status_code().as_u16(), 500);
    }
}

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::payments::{InsertPaymentEntity, PaymentEntity};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    /// Inserts a new payment record. Returns `None` when a record with the
    /// same `external_id` already exists; the store never produces two rows
    /// for one provider transaction.
    async fn insert(&self, payment: InsertPaymentEntity) -> Result<Option<PaymentEntity>>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<PaymentEntity>>;

    /// Conditionally transitions the record to COMPLETED and stores the payer
    /// details, but only while the current status is PENDING. Returns the
    /// updated row when the transition happened, `None` otherwise. Concurrent
    /// callers racing on the same `external_id` see at most one `Some`.
    async fn complete_if_pending(
        &self,
        external_id: &str,
        payer_email: Option<String>,
        payer_id: Option<String>,
    ) -> Result<Option<PaymentEntity>>;
}

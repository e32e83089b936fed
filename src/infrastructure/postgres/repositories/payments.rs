use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};

use crate::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::payments::PaymentRepository,
        value_objects::enums::payment_statuses::PaymentStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn insert(&self, payment: InsertPaymentEntity) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The unique index on external_id is the idempotency guarantee: a
        // retried create for the same provider transaction inserts nothing.
        let inserted = insert_into(payments::table)
            .values(&payment)
            .on_conflict(payments::external_id)
            .do_nothing()
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(inserted)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::external_id.eq(external_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn complete_if_pending(
        &self,
        external_id: &str,
        payer_email: Option<String>,
        payer_id: Option<String>,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Single conditional UPDATE: under concurrent captures of the same
        // order, exactly one caller gets the updated row back.
        let updated = update(
            payments::table
                .filter(payments::external_id.eq(external_id))
                .filter(payments::status.eq(PaymentStatus::Pending.to_string())),
        )
        .set((
            payments::status.eq(PaymentStatus::Completed.to_string()),
            payments::payer_email.eq(payer_email),
            payments::payer_id.eq(payer_id),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(PaymentEntity::as_returning())
        .get_result::<PaymentEntity>(&mut conn)
        .optional()?;

        Ok(updated)
    }
}

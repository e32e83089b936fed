use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

/// One row per payment attempt. `external_id` carries the provider-assigned
/// order/intent identifier and is unique across the table.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub provider: String,
    pub external_id: String,
    pub amount_source: Decimal,
    pub currency_source: String,
    pub amount_settlement: Decimal,
    pub currency_settlement: String,
    pub status: String,
}

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::carts;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = carts)]
pub struct CartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

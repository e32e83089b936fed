use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{entities::carts::CartEntity, repositories::carts::CartRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::carts},
};

pub struct CartPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CartPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CartRepository for CartPostgres {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<CartEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first::<CartEntity>(&mut conn)
            .optional()?;

        Ok(cart)
    }
}

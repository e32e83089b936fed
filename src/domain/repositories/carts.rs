use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::carts::CartEntity;

/// Read-only view of the cart table. Line-item management is out of scope;
/// payments only need the cart owned by a user, if any.
#[async_trait]
#[automock]
pub trait CartRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<CartEntity>>;
}

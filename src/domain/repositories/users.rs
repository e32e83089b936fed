use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::users::UserEntity;

/// Read-only view of the user table. Registration and profile management
/// live in another service; payments only resolve identities.
#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>>;
}

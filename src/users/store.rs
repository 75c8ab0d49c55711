use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserUpdate};

/// Field covered by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    EmailAddress,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::EmailAddress => f.write_str("email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {field}")]
    Duplicate { field: UniqueField },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for user records.
///
/// Uniqueness of username and email is enforced here, not by callers: a
/// `create` or `update` that loses a race still fails with `Duplicate`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<u64, StoreError>;
    async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError>;
}

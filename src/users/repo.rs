use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserUpdate};
use super::store::{StoreError, UniqueField, UserStore};

/// Postgres-backed user store. Uniqueness lives in the named constraints
/// of the users table; violations are decoded into `StoreError::Duplicate`
/// so the database stays the source of truth under concurrent writes.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn duplicate_field(err: &sqlx::Error) -> Option<UniqueField> {
    let db_err = err.as_database_error()?;
    match db_err.constraint()? {
        "users_username_key" => Some(UniqueField::Username),
        "users_email_address_key" => Some(UniqueField::EmailAddress),
        _ => None,
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match duplicate_field(&err) {
        Some(field) => StoreError::Duplicate { field },
        None => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email_address,
                   password_hash, created_at, updated_at
            FROM users
            WHERE email_address = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email_address,
                   password_hash, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email_address,
                   password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, first_name, last_name, email_address, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, first_name, last_name, email_address,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email_address)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, first_name = $3, last_name = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .execute(&self.db)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

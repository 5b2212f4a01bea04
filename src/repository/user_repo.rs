//! User repository (credential store)

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Persistence of user records.
///
/// `create` receives the raw password and hashes it itself. Reads return the
/// full row including the hash.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`AppError::Conflict`] if the email is taken
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError>;

    /// `None` if no user has this id
    async fn update_two_factor(
        &self,
        id: i32,
        enabled: bool,
        secret: Option<String>,
    ) -> Result<Option<User>, AppError>;
}

pub struct UserRepository {
    db: PgPool,
    hasher: PasswordHasher,
}

impl UserRepository {
    pub fn new(db: PgPool, hasher: PasswordHasher) -> Self {
        Self { db, hasher }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, two_factor_enabled, \
                            two_factor_secret, created_at, updated_at";

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let password_hash = self.hasher.hash_blocking(new_user.password).await?;

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = user.id, "User created");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AppError::Conflict("Email is already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn update_two_factor(
        &self,
        id: i32,
        enabled: bool,
        secret: Option<String>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET
                two_factor_enabled = $1,
                two_factor_secret = $2,
                updated_at = NOW()
            WHERE id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(enabled)
        .bind(&secret)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }
}

//! Authentication service: registration and login

use crate::{
    auth::{jwt::TokenService, password::PasswordHasher},
    error::AppError,
    models::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        user::{NewUser, Role, User},
    },
    repository::UserStore,
};
use std::sync::Arc;

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    /// Verified against when the email is unknown, so both login failures cost one bcrypt check
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash("dummy-password-for-unknown-accounts")?;
        Ok(Self {
            users,
            tokens,
            hasher,
            dummy_hash,
        })
    }

    /// Create an account and open a session for it
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let (credentials, name) = req.into_parts()?;

        if self.users.find_by_email(&credentials.email).await?.is_some() {
            metrics::counter!("auth_register_total", "outcome" => "conflict").increment(1);
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        // The store still reports a conflict if a concurrent request won the race
        let user = self
            .users
            .create(NewUser {
                email: credentials.email,
                password: credentials.password,
                name,
                role: Role::default(),
            })
            .await?;

        metrics::counter!("auth_register_total", "outcome" => "success").increment(1);
        self.issue(user)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let credentials = req.into_credentials()?;

        let Some(user) = self.users.find_by_email(&credentials.email).await? else {
            self.hasher
                .verify_blocking(credentials.password, self.dummy_hash.clone())
                .await?;
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            return Err(AppError::InvalidCredentials);
        };

        let matches = self
            .hasher
            .verify_blocking(credentials.password, user.password_hash.clone())
            .await?;

        if !matches {
            tracing::debug!(user_id = user.id, "Password mismatch");
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            return Err(AppError::InvalidCredentials);
        }

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = user.id, "User logged in");
        self.issue(user)
    }

    fn issue(&self, user: User) -> Result<AuthResponse, AppError> {
        let token = self.tokens.mint(&user)?;
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }
}

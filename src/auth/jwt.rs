//! Session token signing and verification (HS256 JWT)

use crate::{
    config::AppConfig,
    error::{AppError, AuthFailure},
    models::user::{Role, User},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        // Both kinds look the same from the outside
        AppError::Unauthorized(AuthFailure::InvalidToken)
    }
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub const MIN_SECRET_LEN: usize = 32;

    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, AppError> {
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs as i64),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.security.jwt_secret.expose_secret(),
            config.security.token_exp_secs,
        )
    }

    /// Token lifetime in seconds, also used as the cookie max-age
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn mint(&self, user: &User) -> Result<String, AppError> {
        self.mint_at(user, Utc::now())
    }

    /// Mint a token as if issued at `issued_at`
    pub fn mint_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode session token: {:?}", e);
            AppError::Internal(format!("Failed to encode session token: {}", e))
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_characters_long!";

    fn user() -> User {
        User {
            id: 42,
            email: "a@b.com".to_string(),
            password_hash: String::new(),
            name: None,
            role: Role::parse("admin").unwrap(),
            two_factor_enabled: false,
            two_factor_secret: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_mint_and_verify() {
        let service = TokenService::new(SECRET, 86400).unwrap();

        let token = service.mint(&user()).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role.as_str(), "admin");
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_expired_token_is_classified() {
        let service = TokenService::new(SECRET, 3600).unwrap();

        let token = service
            .mint_at(&user(), Utc::now() - Duration::hours(2))
            .unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = TokenService::new(SECRET, 3600).unwrap();
        let other = TokenService::new("another_secret_that_is_32_chars_long", 3600).unwrap();

        let token = issuer.mint(&user()).unwrap();
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let service = TokenService::new(SECRET, 3600).unwrap();
        assert_eq!(service.verify("invalid_token"), Err(TokenError::Invalid));
        assert_eq!(service.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(TokenService::new("short", 3600).is_err());
    }

    #[test]
    fn test_token_errors_map_to_same_response() {
        let invalid: AppError = TokenError::Invalid.into();
        let expired: AppError = TokenError::Expired.into();
        assert_eq!(invalid.user_message(), expired.user_message());
        assert_eq!(invalid.code(), 401);
    }
}

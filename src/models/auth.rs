//! Authentication-related request and response bodies

use crate::{auth::middleware::AuthContext, error::AppError, models::user::UserResponse};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

const MISSING_CREDENTIALS: &str = "Email and password are required";

/// Register request. Fields are optional so a missing one becomes a 400, not a
/// deserialization failure.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Email and password that are both present and non-blank
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    fn require(email: Option<String>, password: Option<String>) -> Result<Self, AppError> {
        match (email, password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok(Self { email, password })
            }
            _ => Err(AppError::validation(MISSING_CREDENTIALS)),
        }
    }
}

impl RegisterRequest {
    /// Validate and split into credentials plus the optional display name
    pub fn into_parts(self) -> Result<(Credentials, Option<String>), AppError> {
        let credentials = Credentials::require(self.email, self.password)?;

        if !credentials.email.validate_email() {
            return Err(AppError::validation("Email address is not valid"));
        }

        let name = self.name.filter(|n| !n.trim().is_empty());
        Ok((credentials, name))
    }
}

impl LoginRequest {
    pub fn into_credentials(self) -> Result<Credentials, AppError> {
        Credentials::require(self.email, self.password)
    }
}

/// Body of a successful register or login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Body of `GET /api/auth/me`
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: AuthContext,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(body: &str) -> RegisterRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_register_requires_email_and_password() {
        assert!(register(r#"{}"#).into_parts().is_err());
        assert!(register(r#"{"email":"a@b.com"}"#).into_parts().is_err());
        assert!(register(r#"{"password":"secret123"}"#).into_parts().is_err());
        assert!(register(r#"{"email":"  ","password":"secret123"}"#).into_parts().is_err());
        assert!(register(r#"{"email":"a@b.com","password":""}"#).into_parts().is_err());
    }

    #[test]
    fn test_register_rejects_malformed_email() {
        let err = register(r#"{"email":"not-an-email","password":"secret123"}"#)
            .into_parts()
            .err()
            .unwrap();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_register_blank_name_is_dropped() {
        let (credentials, name) =
            register(r#"{"email":"a@b.com","password":"secret123","name":" "}"#)
                .into_parts()
                .unwrap();
        assert_eq!(credentials.email, "a@b.com");
        assert!(name.is_none());
    }

    #[test]
    fn test_login_requires_both_fields() {
        let login: LoginRequest = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(login.into_credentials().err().unwrap().code(), 400);

        let login: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"x"}"#).unwrap();
        assert!(login.into_credentials().is_ok());
    }
}

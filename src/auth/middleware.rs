//! Session middleware

use crate::{
    auth::jwt::{Claims, TokenError, TokenService},
    error::{AppError, AuthFailure},
    models::user::Role,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Identity of the caller, attached to request extensions after verification
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthContext {
    pub id: i32,
    pub email: String,
    pub role: Role,
}

impl TryFrom<Claims> for AuthContext {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims.sub.parse::<i32>().map_err(|_| TokenError::Invalid)?;
        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized(AuthFailure::TokenAbsent))
    }
}

/// Find the session token: `Authorization: Bearer` first, then the cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid session; attach [`AuthContext`] otherwise
pub async fn session_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        extract_token(req.headers()).ok_or(AppError::Unauthorized(AuthFailure::TokenAbsent))?;

    let context = tokens.verify(&token).and_then(AuthContext::try_from)?;

    tracing::debug!(user_id = context.id, "Session verified");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

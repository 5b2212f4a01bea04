//! Authentication HTTP handlers

use crate::{
    auth::middleware::{AuthContext, SESSION_COOKIE},
    error::AppError,
    middleware::AppState,
    models::auth::*,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Register
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;

    let response = state.auth_service.register(req).await?;
    let jar = jar.add(session_cookie(&state, response.token.clone()));

    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// Login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;

    let response = state.auth_service.login(req).await?;
    let jar = jar.add(session_cookie(&state, response.token.clone()));

    Ok((jar, Json(response)))
}

/// Current user, as asserted by the session token
pub async fn me(auth_context: AuthContext) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse { user: auth_context })
}

/// Logout: clears the cookie only. The token stays valid until it expires.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    removal.make_removal();

    (
        jar.add(removal),
        Json(MessageResponse {
            message: "Session closed successfully".to_string(),
        }),
    )
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.environment.is_production())
        .max_age(time::Duration::seconds(state.token_service.ttl_secs()))
        .build()
}

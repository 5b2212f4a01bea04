//! HTTP middleware
//! Application state, request tracking, and the per-IP limiter for /api/auth

use crate::{
    auth::{jwt::TokenService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::{UserRepository, UserStore},
    services::AuthService,
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Application state shared by every request.
///
/// The pool is process-scoped: created before the router, closed after the
/// server stops. Handlers only check connections out and back in.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: sqlx::PgPool,
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    /// State backed by the Postgres user repository
    pub fn new(config: AppConfig, db: sqlx::PgPool) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.security.password_hash_cost);
        let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.clone(), hasher));
        Self::with_store(config, db, users)
    }

    /// State with a caller-supplied user store
    pub fn with_store(
        config: AppConfig,
        db: sqlx::PgPool,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.security.password_hash_cost);
        let token_service = Arc::new(TokenService::from_config(&config)?);
        let auth_service = Arc::new(AuthService::new(users, token_service.clone(), hasher)?);
        let rate_limiter = Arc::new(IpRateLimiter::new(
            config.security.auth_rate_limit_max_requests as usize,
            Duration::from_secs(config.security.auth_rate_limit_window_secs),
        ));

        Ok(Self {
            config,
            db,
            auth_service,
            token_service,
            rate_limiter,
        })
    }
}

/// Request tracking middleware
/// Assigns trace_id/request_id, opens a span, and records request metrics
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status();

        metrics::counter!(
            "http_requests_total",
            "method" => method.clone(),
            "status" => status.as_str().to_string()
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Rate limit for /api/auth, keyed by client IP
pub async fn auth_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = client_ip(&req, state.config.security.trust_proxy);

    if !state.rate_limiter.check(client_ip) {
        tracing::warn!(client_ip = %client_ip, "Auth rate limit exceeded");
        metrics::counter!("auth_rate_limited_total").increment(1);
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(req).await)
}

/// Client address: proxy headers when trusted, then the socket peer, then loopback
pub fn client_ip(req: &Request, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return ip;
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    tracing::debug!("Could not determine client IP, using loopback address");
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For may hold a chain; the first entry is the client
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

// ==================== Rate limiter ====================

/// Sliding-window limiter per IP address
pub struct IpRateLimiter {
    windows: DashMap<IpAddr, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl IpRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Record a request from `ip`; `false` once the window is full
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut requests = self.windows.entry(ip).or_default();

        while let Some(&front) = requests.front() {
            if now.duration_since(front) < self.window {
                break;
            }
            requests.pop_front();
        }

        if requests.len() < self.max_requests {
            requests.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop addresses with no request inside the current window
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.windows.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|&last| now.duration_since(last) < self.window)
        });
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

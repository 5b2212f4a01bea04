//! Database pool and migrations
//! The pool is created once at startup, shared through `AppState`, and closed on shutdown.

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::time::Duration;

/// Build connection options from either `database.url` or the discrete fields
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DbError> {
    if let Some(url) = &config.url {
        return url
            .expose_secret()
            .parse::<PgConnectOptions>()
            .map_err(|e| DbError::InvalidConfig(e.to_string()));
    }

    let host = resolve_host(config);
    let ssl = resolve_ssl(config);

    tracing::info!(
        host = %host,
        port = config.port,
        database = %config.name,
        ssl,
        "PostgreSQL connection settings (password omitted)"
    );

    Ok(PgConnectOptions::new()
        .host(&host)
        .port(config.port)
        .username(&config.user)
        .password(config.password.expose_secret())
        .database(&config.name)
        .ssl_mode(if ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        }))
}

/// Explicit host, else `db.<host>` of the Supabase project URL, else localhost
fn resolve_host(config: &DatabaseConfig) -> String {
    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        return host.to_string();
    }

    config
        .supabase_url
        .as_deref()
        .and_then(|raw| url::Url::parse(raw).ok())
        .and_then(|u| u.host_str().map(|h| format!("db.{}", h)))
        .unwrap_or_else(|| "localhost".to_string())
}

fn resolve_ssl(config: &DatabaseConfig) -> bool {
    config.ssl.unwrap_or(config.supabase_url.is_some())
}

/// Create the connection pool and verify one connection can be opened
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options = connect_options(config)?;

    tracing::debug!("Creating database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            DbError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created successfully"
    );

    Ok(pool)
}

/// Close every connection; waits for checked-out connections to be returned
pub async fn close_pool(pool: &PgPool) {
    tracing::info!("Closing database pool...");
    pool.close().await;
    tracing::info!("Database pool closed");
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        DbError::MigrationFailed(e.to_string())
    })?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> HealthStatus {
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => {
            tracing::debug!("Database health check: OK");
            HealthStatus::Healthy
        }
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn base_config() -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            host: None,
            port: 5432,
            user: "postgres".to_string(),
            password: Secret::new("postgres".to_string()),
            name: "postgres".to_string(),
            ssl: None,
            supabase_url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            run_migrations: false,
        }
    }

    #[test]
    fn test_host_defaults_to_localhost() {
        let config = base_config();
        assert_eq!(resolve_host(&config), "localhost");
        assert!(!resolve_ssl(&config));
    }

    #[test]
    fn test_host_derived_from_supabase_url() {
        let config = DatabaseConfig {
            supabase_url: Some("https://abcd.supabase.co".to_string()),
            ..base_config()
        };
        assert_eq!(resolve_host(&config), "db.abcd.supabase.co");
        assert!(resolve_ssl(&config));
    }

    #[test]
    fn test_explicit_settings_win() {
        let config = DatabaseConfig {
            host: Some("pg.internal".to_string()),
            ssl: Some(false),
            supabase_url: Some("https://abcd.supabase.co".to_string()),
            ..base_config()
        };
        assert_eq!(resolve_host(&config), "pg.internal");
        assert!(!resolve_ssl(&config));
    }

    #[test]
    fn test_unparseable_supabase_url_falls_back() {
        let config = DatabaseConfig {
            supabase_url: Some("not a url".to_string()),
            ..base_config()
        };
        assert_eq!(resolve_host(&config), "localhost");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = DatabaseConfig {
            url: Some(Secret::new("not a connection string".to_string())),
            ..base_config()
        };
        assert!(matches!(connect_options(&config), Err(DbError::InvalidConfig(_))));
    }
}

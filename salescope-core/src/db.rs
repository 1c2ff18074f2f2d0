use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::DatabaseConfig;
use crate::error::SalescopeError;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Startup connection with bounded backoff. The analytical store being
/// unreachable at startup is fatal to the whole surface, so the caller
/// should exit on `Err`.
pub async fn create_pool_with_retry(config: &DatabaseConfig) -> Result<PgPool, SalescopeError> {
    let retry_strategy = ExponentialBackoff::from_millis(500)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(config.connect_attempts);

    let pool = Retry::spawn(retry_strategy, || async {
        match create_pool(config).await {
            Ok(p) => Ok(p),
            Err(e) => {
                tracing::warn!(error = %e, "Analytical store connection attempt failed");
                Err(e)
            }
        }
    })
    .await?;

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

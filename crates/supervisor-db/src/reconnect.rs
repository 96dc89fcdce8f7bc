use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects with a bounded exponential backoff, capped at `max_backoff`
/// (`spec.md` §4.B: "on connection failure, retry with a fixed back-off
/// until reconnected; the supervisor loop may block on this"). Never gives
/// up — a misconfigured DSN is a startup error the caller should have
/// caught before reaching here.
pub async fn connect_with_retry(dsn: &str, max_backoff: Duration) -> PgPool {
    let mut backoff = Duration::from_secs(1);
    loop {
        match PgPoolOptions::new().max_connections(5).connect(dsn).await {
            Ok(pool) => return pool,
            Err(err) => {
                tracing::warn!(error = %err, backoff_secs = backoff.as_secs(), "database connect failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }
}

//! PostgreSQL connection helpers.

use sqlx::PgPool;

/// Verify the database is reachable.
pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Build a pool that only connects on first use.
pub fn lazy_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .connect_lazy(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_database_reports_unhealthy() {
        // Port 1 is never a PostgreSQL server.
        let pool = lazy_pool("postgres://gw2style@127.0.0.1:1/gw2style", 1).unwrap();
        assert!(!health_check(&pool).await);
    }
}

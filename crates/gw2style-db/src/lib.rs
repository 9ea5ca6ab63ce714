//! # gw2style-db
//!
//! Database layer for gw2style. All state lives in PostgreSQL: users, posts,
//! likes, the moderation audit log and user reports.

pub mod postgres;
pub mod repository;

use anyhow::Result;
use gw2style_common::config::DatabaseConfig;
use sqlx::PgPool;

/// Shared database state passed through Axum extractors.
#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    /// Connect to PostgreSQL.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pg = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(Self { pg })
    }

    /// Wrap a pool that was built elsewhere (tests use a lazy pool).
    pub fn from_pool(pg: PgPool) -> Self {
        Self { pg }
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}

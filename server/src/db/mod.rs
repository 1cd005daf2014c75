// harvesthub/server/src/db/mod.rs

//! Postgres-backed implementations of the core store traits.

mod accounts;
mod catalog;
mod orders;
mod rows;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct PgStore {
  pub(crate) pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Creates missing tables and indexes. Every statement is idempotent.
  pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
    info!("Database schema applied.");
    Ok(())
  }
}

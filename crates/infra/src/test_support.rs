//! Shared fixtures for the infra test modules.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::store::{PostgresInventoryStore, migrate};

/// A Postgres store on a fresh schema, or `None` when `DATABASE_URL` is unset.
pub(crate) async fn test_postgres_store() -> Option<PostgresInventoryStore> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(value) => value,
        Err(_) => return None,
    };

    // Each test gets its own schema for full isolation when running in parallel.
    let schema = format!("test_{}", uuid::Uuid::now_v7().simple());
    let mut opts: PgConnectOptions = database_url.parse().expect("parse DATABASE_URL");
    opts = opts.options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(opts)
        .await
        .expect("connect test database");
    sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
        .execute(&pool)
        .await
        .expect("create test schema");

    migrate(&pool).await.expect("apply schema");
    Some(PostgresInventoryStore::new(pool))
}

//! Database wiring: connection pool and schema bootstrap.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{StoreError, map_sqlx_error};

/// Statements are idempotent; safe to run on every start.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        api_key     TEXT NOT NULL,
        balance     NUMERIC(20, 4) NOT NULL DEFAULT 0,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_api_key_key ON accounts (api_key)",
    r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id           UUID PRIMARY KEY,
        account_id   UUID NOT NULL REFERENCES accounts (id),
        amount       NUMERIC(20, 4) NOT NULL CHECK (amount > 0),
        description  TEXT NOT NULL DEFAULT '',
        status       TEXT NOT NULL,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS invoices_account_id_idx ON invoices (account_id, created_at DESC)",
];

/// Open a connection pool for the configured database.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    info!(max_connections = config.max_connections, "connected to postgres");
    Ok(pool)
}

/// Create the gateway tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(*statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

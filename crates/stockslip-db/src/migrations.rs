//! Embedded schema migrations.
//!
//! Files under `migrations/sqlite/` are compiled into the binary and applied
//! in filename order on connect. Shipped files are append-only: schema
//! changes go in a new `NNN_description.sql`.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// ```text
/// migrations/sqlite/
/// └── 001_initial_schema.sql  # items, slips, slip_lines, income_entries
/// ```
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever the `_sqlx_migrations` table has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = (MIGRATOR.migrations.len(), pending_baseline(pool).await);
    info!(total, applied, "Applying schema migrations");

    MIGRATOR.run(pool).await?;

    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

// Fresh databases have no bookkeeping table yet.
async fn pending_baseline(pool: &SqlitePool) -> usize {
    migration_status(pool).await.map(|(_, applied)| applied).unwrap_or(0)
}

//! # Unit of Work
//!
//! One fulfillment request = one SQLite `IMMEDIATE` transaction. Writers
//! serialise on the database write lock; WAL readers are never blocked.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut uow = db.begin().await?;                                      │
//! │                                                                         │
//! │  ledger.reserve(uow.conn(), ..)      ─┐                                 │
//! │  SlipRepository::insert(uow.conn(), ..) ├─ all on the same connection   │
//! │  IncomeRepository::insert(uow.conn(), ..)┘                              │
//! │                                                                         │
//! │  uow.commit().await?   → every write visible at once                   │
//! │  uow.abort().await?    → none of them                                  │
//! │  drop(uow)             → same as abort (timeout, panic, early `?`)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// An open transaction shared by every collaborator of one request.
pub struct UnitOfWork {
    id: String,
    tx: Transaction<'static, Sqlite>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").field("id", &self.id).finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Begins a transaction on a pooled connection.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`): a second writer
    /// queues for up to the busy timeout instead of failing when its read
    /// snapshot cannot be upgraded.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let id = Uuid::new_v4().to_string();

        debug!(uow = %id, "Unit of work started");
        Ok(UnitOfWork { id, tx })
    }

    /// Identifier used to correlate log lines of one request.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The transaction's connection; pass it to every read and write.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Makes every write of this unit of work durable.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!(uow = %self.id, "Unit of work committed");
        Ok(())
    }

    /// Discards every write of this unit of work.
    pub async fn abort(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!(uow = %self.id, "Unit of work aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    async fn count_items(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn count_in(conn: &mut sqlx::SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(conn)
            .await
            .unwrap()
    }

    async fn insert_raw(conn: &mut sqlx::SqliteConnection, sku: &str) {
        sqlx::query(
            "INSERT INTO items (id, name, sku, created_at, last_updated)
             VALUES (?1, ?2, ?2, '2026-10-18T00:00:00Z', '2026-10-18T00:00:00Z')",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(sku)
        .execute(conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        insert_raw(uow.conn(), "A-1").await;
        uow.commit().await.unwrap();

        assert_eq!(count_items(&db).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_writer_waits_instead_of_failing() {
        let path = std::env::temp_dir().join(format!("stockslip-uow-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();

        // Both read before writing, the pattern that breaks deferred transactions.
        let mut first = db.begin().await.unwrap();
        count_in(first.conn()).await;

        let other = db.clone();
        let second = tokio::spawn(async move {
            let mut uow = other.begin().await?;
            count_in(uow.conn()).await;
            insert_raw(uow.conn(), "B-1").await;
            uow.commit().await
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        insert_raw(first.conn(), "A-1").await;
        first.commit().await.unwrap();

        second.await.unwrap().unwrap();
        assert_eq!(count_items(&db).await, 2);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_abort_and_drop_discard_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        insert_raw(uow.conn(), "A-1").await;
        uow.abort().await.unwrap();

        {
            let mut uow = db.begin().await.unwrap();
            insert_raw(uow.conn(), "A-2").await;
        }

        assert_eq!(count_items(&db).await, 0);
    }
}

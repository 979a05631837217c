//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create_sale ──► UnitOfWork on Conn1                                   │
//! │  edit_sale   ──► UnitOfWork on Conn2  (waits up to busy_timeout for    │
//! │                                         the SQLite write lock)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers don't block writers and writers don't block readers. SQLite
//! still admits a single writer at a time; the busy timeout is how long a
//! second writer waits before its unit of work fails.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::income::IncomeRepository;
use crate::repository::item::ItemRepository;
use crate::repository::ledger::{ResolutionPolicy, StockLedger};
use crate::repository::slip::SlipRepository;
use crate::unit_of_work::UnitOfWork;

// =============================================================================
// Configuration
// =============================================================================

/// Where the slip database lives and how many writers may queue on it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/stockslip/stockslip.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_millis(2500));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; `:memory:` for a throwaway store.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (default 5). Each in-flight
    /// sale holds one for the life of its unit of work.
    pub max_connections: u32,

    /// Connections opened eagerly (default 1).
    pub min_connections: u32,

    /// Pool acquire limit (default 30s).
    pub connect_timeout: Duration,

    /// Idle connections are closed after this long (default 10 min).
    pub idle_timeout: Duration,

    /// `PRAGMA busy_timeout`: how long a second writer queues behind the
    /// slip currently being committed (default 5s).
    pub busy_timeout: Duration,

    /// Apply embedded migrations when connecting (default on).
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            ..Self::defaults()
        }
    }

    /// Private throwaway store for tests.
    ///
    /// Pinned to one connection: every `:memory:` connection would
    /// otherwise open its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        DbConfig {
            database_path: PathBuf::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min.min(self.max_connections);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skips migrations; the caller owns the schema.
    pub fn without_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(format!("{url}: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // slip_lines and income_entries rely on ON DELETE CASCADE
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle on the slip store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the store in WAL mode and brings the
    /// schema up to date unless [`DbConfig::without_migrations`] was used.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening slip store");

        let options = config.connect_options()?;
        debug!(busy_timeout = ?config.busy_timeout, "SQLite pragmas set");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Slip store ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a unit of work (one SQLite transaction).
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        UnitOfWork::begin(&self.pool).await
    }

    /// Returns the item catalog repository.
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone())
    }

    /// Returns the slip repository.
    pub fn slips(&self) -> SlipRepository {
        SlipRepository::new(self.pool.clone())
    }

    /// Returns the income ledger repository.
    pub fn income(&self) -> IncomeRepository {
        IncomeRepository::new(self.pool.clone())
    }

    /// Returns the stock ledger with the given resolution policy.
    pub fn ledger(&self, policy: ResolutionPolicy) -> StockLedger {
        StockLedger::new(policy)
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

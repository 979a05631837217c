//! # stockslip-db: Database Layer for Stockslip
//!
//! SQLite storage for the item catalog, sale slips and the income ledger,
//! accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockslip Data Flow                              │
//! │                                                                         │
//! │  FulfillmentEngine::create_sale                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockslip-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ItemRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ 001_init.sql │  │   │
//! │  │   │ UnitOfWork    │    │ SlipRepo      │    │              │  │   │
//! │  │   │               │    │ IncomeRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - Transaction handle spanning stock, slip and income writes
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockslip_db::{Database, DbConfig, ResolutionPolicy};
//!
//! let db = Database::new(DbConfig::new("stockslip.db")).await?;
//!
//! let mut uow = db.begin().await?;
//! let item = db.ledger(ResolutionPolicy::FirstMatch)
//!     .reserve(uow.conn(), "Aster Cover", 3)
//!     .await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::income::IncomeRepository;
pub use repository::item::ItemRepository;
pub use repository::ledger::{ResolutionPolicy, StockLedger};
pub use repository::slip::SlipRepository;

//! # stockslip-fulfillment: Order Fulfillment for Stockslip
//!
//! The transaction engine that turns a sale request into committed state.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stockslip Request Flow                              │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, test)                                       │
//! │       │  CreateSaleRequest / EditSaleRequest                            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              stockslip-fulfillment (THIS CRATE)                 │   │
//! │  │                                                                 │   │
//! │  │   FulfillmentEngine ──► validate ──► plan ──► write ──► commit  │   │
//! │  │          │                                                      │   │
//! │  │          ├── EngineConfig   (TOML + STOCKSLIP_* env)            │   │
//! │  │          └── ErrorResponse  (status class + code)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                         │                                       │
//! │       ▼                         ▼                                       │
//! │  stockslip-core            stockslip-db                                 │
//! │  (pricing, validation)     (ledger, slips, income, UnitOfWork)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockslip_fulfillment::{telemetry, EngineConfig, FulfillmentEngine};
//!
//! let config = EngineConfig::load(None)?;
//! telemetry::init_tracing(&config.log_filter);
//!
//! let engine = FulfillmentEngine::connect(&config).await?;
//! let slip = engine.create_sale(request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, EngineConfig, EngineSettings};
pub use engine::FulfillmentEngine;
pub use error::{
    ConfigError, ErrorCode, ErrorResponse, FulfillmentError, FulfillmentResult, StatusClass,
};

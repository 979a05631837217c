//! # stockslip-core: Pure Business Logic for Stockslip
//!
//! Everything the fulfillment engine decides without touching storage lives
//! here: how a requested line is priced, what a valid sale request looks
//! like, how stock moves between two versions of a slip, and how a
//! customer's committed slips roll up into history buckets.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockslip Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                CRUD layer (external collaborator)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ create_sale / edit_sale / cancel_sale  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockslip-fulfillment (engine)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockslip-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │ pricing │ │validation│ │ delta  │ │ history │  │   │
//! │  │   │  Item   │ │ bulk /  │ │ requests │ │ old →  │ │ week /  │  │   │
//! │  │   │  Slip   │ │ manual  │ │ intake   │ │ new    │ │ month   │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockslip-db (Database Layer)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, SaleRecord, PricedLine, IncomeEntry)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Pricing Resolver (bulk and manual discounts)
//! - [`request`] - Sale request payloads as received from the CRUD layer
//! - [`validation`] - Business rule validation
//! - [`delta`] - Net stock movement between two line sets
//! - [`history`] - Per-customer purchase history buckets
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockslip_core::pricing::{price_line, PricingRules};
//! use stockslip_core::request::LineRequest;
//! use stockslip_core::{DiscountType, ProductType};
//!
//! let line = LineRequest {
//!     product_name: "Aster Cover Red".to_string(),
//!     quantity: 10,
//!     base_price_cents: Some(10_000),
//!     product_type: Some(ProductType::Cover),
//!     cover_type: Some("Aster Cover".to_string()),
//!     ..LineRequest::default()
//! };
//!
//! let priced = price_line(&line, &PricingRules::default());
//! assert_eq!(priced.unit_price_cents, 9_000);
//! assert_eq!(priced.discount_type, DiscountType::Bulk);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod delta;
pub mod error;
pub mod history;
pub mod money;
pub mod pricing;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted on a single slip.
pub const MAX_SLIP_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Bulk orders of covers routinely run into the hundreds; anything past
/// this is almost certainly a typo (an extra zero or a pasted barcode).
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Upper bound for any single money amount on a request or catalog item
/// (1,000,000,000.00). Keeps `price × quantity` and slip sums inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Prefix of every generated slip number (`SLP-YYYYMMDD-NNNN`).
pub const SLIP_NUMBER_PREFIX: &str = "SLP";

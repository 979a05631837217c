//! # Error Types
//!
//! Domain-specific error types for stockslip-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Where errors come from                            │
//! │                                                                         │
//! │  stockslip-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockslip-db errors                                                   │
//! │  └── DbError          - Storage failures (+ Domain(CoreError))         │
//! │                                                                         │
//! │  stockslip-fulfillment errors                                          │
//! │  └── FulfillmentError - What the CRUD layer sees (status class)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → FulfillmentError        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections.
///
/// Every variant is raised *before* any mutation is applied; the engine
/// aborts the surrounding unit of work and reports it verbatim.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No active item matches a line's product reference.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// No sale record matches the given id.
    #[error("Slip not found: {0}")]
    SlipNotFound(String),

    /// Requested quantity exceeds what the ledger holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Slip line: "Aster Cover" × 5
    ///      │
    ///      ▼
    /// Ledger: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Aster Cover", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Aster Cover in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// More than one active item matches a reference under strict resolution.
    #[error("'{query}' matches several items: {candidates:?}")]
    AmbiguousItem {
        query: String,
        candidates: Vec<String>,
    },

    /// The slip is in a state that forbids the requested change.
    ///
    /// ## When This Occurs
    /// - Rewriting the lines of a cancelled slip
    /// - Moving a cancelled slip back to Paid / Pending
    #[error("Slip {slip_id} is {current_status}, cannot perform operation")]
    InvalidSlipStatus {
        slip_id: String,
        current_status: String,
    },

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Request-shape problems, caught before the store is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantities and counts outside their accepted window.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Malformed text: SKU characters, blank-but-present names.
    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A classification field the product type does not carry, e.g. a
    /// plate company on a cover.
    #[error("{field} is not allowed for product type {product_type}")]
    NotApplicable { field: String, product_type: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

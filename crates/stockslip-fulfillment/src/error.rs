//! # Fulfillment Error Types
//!
//! The engine's error taxonomy and the response body a caller renders.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockslip                              │
//! │                                                                         │
//! │  ValidationError ──┐                                                   │
//! │  CoreError ────────┼──► FulfillmentError ──► ErrorResponse             │
//! │  DbError ──────────┘         │                  {                      │
//! │                              │                    "status": "conflict",│
//! │                              ▼                    "httpStatus": 409,   │
//! │                        StatusClass                "code": "...",       │
//! │                        ───────────                "message": "..."     │
//! │                        client_validation  400   }                      │
//! │                        not_found          404                          │
//! │                        conflict           409                          │
//! │                        server_failure     500                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store failures that are not a business rule (a failed write, a trigger
//! abort, a lost connection, a timeout) all become
//! [`FulfillmentError::TransactionAbort`] with the cause attached. By the
//! time a caller sees one, the unit of work has been rolled back.

use serde::{Deserialize, Serialize};
use stockslip_core::{CoreError, ValidationError};
use stockslip_db::DbError;
use thiserror::Error;
use ts_rs::TS;

/// Result type alias for engine operations.
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

/// Everything a fulfillment request can fail with.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    // =========================================================================
    // Client Errors
    // =========================================================================
    /// Malformed request, rejected before any store access.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A line asks for more than the ledger holds.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Unknown item reference or slip id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    // =========================================================================
    // Conflicts
    // =========================================================================
    /// Duplicate unique value (SKU, slip number).
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A line reference matches several items under strict resolution.
    #[error("'{query}' matches several items: {candidates:?}")]
    AmbiguousItem { query: String, candidates: Vec<String> },

    /// The slip's status forbids the change.
    #[error("Slip {slip_id} is {status}, cannot perform operation")]
    InvalidSlipStatus { slip_id: String, status: String },

    // =========================================================================
    // Server Failures
    // =========================================================================
    /// The store failed after all checks passed; nothing was committed.
    #[error("Transaction aborted: {cause}")]
    TransactionAbort { cause: String },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FulfillmentError {
    /// Creates a TransactionAbort with the given cause.
    pub fn abort(cause: impl Into<String>) -> Self {
        FulfillmentError::TransactionAbort {
            cause: cause.into(),
        }
    }

    /// The response class of this error.
    pub fn status_class(&self) -> StatusClass {
        match self {
            FulfillmentError::Validation(_) | FulfillmentError::InsufficientStock { .. } => {
                StatusClass::ClientValidation
            }
            FulfillmentError::NotFound { .. } => StatusClass::NotFound,
            FulfillmentError::Duplicate { .. }
            | FulfillmentError::AmbiguousItem { .. }
            | FulfillmentError::InvalidSlipStatus { .. } => StatusClass::Conflict,
            FulfillmentError::TransactionAbort { .. } | FulfillmentError::Config(_) => {
                StatusClass::ServerFailure
            }
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FulfillmentError::Validation(_) => ErrorCode::ValidationError,
            FulfillmentError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            FulfillmentError::NotFound { entity, .. } if entity == "Slip" => ErrorCode::SlipNotFound,
            FulfillmentError::NotFound { .. } => ErrorCode::ItemNotFound,
            FulfillmentError::Duplicate { .. } => ErrorCode::Duplicate,
            FulfillmentError::AmbiguousItem { .. } => ErrorCode::AmbiguousItem,
            FulfillmentError::InvalidSlipStatus { .. } => ErrorCode::InvalidSlipStatus,
            FulfillmentError::TransactionAbort { .. } => ErrorCode::TransactionAborted,
            FulfillmentError::Config(_) => ErrorCode::Internal,
        }
    }

    /// Renders the error for a caller.
    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status_class();

        let (product_name, available) = match self {
            FulfillmentError::InsufficientStock {
                product, available, ..
            } => (Some(product.clone()), Some(*available)),
            FulfillmentError::NotFound { entity, id } if entity == "Item" => {
                (Some(id.clone()), None)
            }
            _ => (None, None),
        };

        // Store internals stay in the logs.
        let message = match self {
            FulfillmentError::TransactionAbort { cause } => {
                tracing::error!(cause = %cause, "Fulfillment transaction aborted");
                "The sale could not be saved; nothing was changed".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            status,
            http_status: status.http_status(),
            code: self.code(),
            message,
            product_name,
            available,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for FulfillmentError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(reference) => FulfillmentError::NotFound {
                entity: "Item".to_string(),
                id: reference,
            },
            CoreError::SlipNotFound(id) => FulfillmentError::NotFound {
                entity: "Slip".to_string(),
                id,
            },
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => FulfillmentError::InsufficientStock {
                product,
                available,
                requested,
            },
            CoreError::AmbiguousItem { query, candidates } => {
                FulfillmentError::AmbiguousItem { query, candidates }
            }
            CoreError::InvalidSlipStatus {
                slip_id,
                current_status,
            } => FulfillmentError::InvalidSlipStatus {
                slip_id,
                status: current_status,
            },
            CoreError::Validation(e) => FulfillmentError::Validation(e),
        }
    }
}

/// Business rules keep their meaning; everything else the store reports is
/// a transaction abort.
impl From<DbError> for FulfillmentError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => FulfillmentError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => FulfillmentError::Duplicate { field, value },
            other => FulfillmentError::abort(other.to_string()),
        }
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// Coarse outcome class of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StatusClass {
    ClientValidation,
    NotFound,
    Conflict,
    ServerFailure,
}

impl StatusClass {
    /// HTTP-style status number.
    pub fn http_status(&self) -> u16 {
        match self {
            StatusClass::ClientValidation => 400,
            StatusClass::NotFound => 404,
            StatusClass::Conflict => 409,
            StatusClass::ServerFailure => 500,
        }
    }
}

/// Error codes for responses.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (err.code) {
///   case 'INSUFFICIENT_STOCK':
///     showStockWarning(err.productName, err.available);
///     break;
///   case 'ITEM_NOT_FOUND':
///     highlightLine(err.productName);
///     break;
///   default:
///     showError(err.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    ItemNotFound,
    SlipNotFound,
    Duplicate,
    AmbiguousItem,
    InvalidSlipStatus,
    TransactionAborted,
    Internal,
}

/// What a caller receives when a request fails.
///
/// ```json
/// {
///   "status": "client_validation",
///   "httpStatus": 400,
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Aster Cover Red: available 3, requested 5",
///   "productName": "Aster Cover Red",
///   "available": 3
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ErrorResponse {
    pub status: StatusClass,
    pub http_status: u16,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
}

impl From<&FulfillmentError> for ErrorResponse {
    fn from(err: &FulfillmentError) -> Self {
        err.to_response()
    }
}

// =============================================================================
// Config Error
// =============================================================================

/// Engine configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`crate::EngineConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize the config.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_response_carries_available() {
        let err: FulfillmentError = DbError::Domain(CoreError::InsufficientStock {
            product: "Aster Cover Red".to_string(),
            available: 3,
            requested: 5,
        })
        .into();

        let response = err.to_response();
        assert_eq!(response.status, StatusClass::ClientValidation);
        assert_eq!(response.http_status, 400);
        assert_eq!(response.code, ErrorCode::InsufficientStock);
        assert_eq!(response.product_name.as_deref(), Some("Aster Cover Red"));
        assert_eq!(response.available, Some(3));
        assert!(response.message.contains("available 3"));
    }

    #[test]
    fn test_status_classes() {
        let not_found: FulfillmentError = CoreError::SlipNotFound("x".to_string()).into();
        assert_eq!(not_found.status_class().http_status(), 404);
        assert_eq!(not_found.code(), ErrorCode::SlipNotFound);

        let duplicate: FulfillmentError = DbError::duplicate("sku", "AST-RED").into();
        assert_eq!(duplicate.status_class(), StatusClass::Conflict);

        let ambiguous: FulfillmentError = CoreError::AmbiguousItem {
            query: "aster".to_string(),
            candidates: vec!["A".to_string(), "B".to_string()],
        }
        .into();
        assert_eq!(ambiguous.status_class().http_status(), 409);

        let validation: FulfillmentError = ValidationError::required("lines").into();
        assert_eq!(validation.status_class().http_status(), 400);
    }

    #[test]
    fn test_store_failures_become_transaction_abort() {
        let err: FulfillmentError = DbError::QueryFailed("income ledger offline".to_string()).into();
        assert!(matches!(err, FulfillmentError::TransactionAbort { ref cause } if cause.contains("offline")));

        let response = err.to_response();
        assert_eq!(response.http_status, 500);
        assert!(!response.message.contains("offline"));
    }

    #[test]
    fn test_response_json_shape() {
        let err: FulfillmentError = CoreError::ItemNotFound("Calendar".to_string()).into();
        let json = serde_json::to_value(err.to_response()).unwrap();

        assert_eq!(json["status"], "not_found");
        assert_eq!(json["httpStatus"], 404);
        assert_eq!(json["code"], "ITEM_NOT_FOUND");
        assert_eq!(json["productName"], "Calendar");
        assert!(json.get("available").is_none());
    }
}

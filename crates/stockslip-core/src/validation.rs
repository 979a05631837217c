//! # Validation Module
//!
//! Input validation for sale requests and item intake.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Shape and types of the request payload                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any store access)                        │
//! │  ├── Required fields, non-negative money                               │
//! │  ├── Non-empty line list, positive quantities                          │
//! │  └── Classification groups gated by product type                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(sku)                                                       │
//! │  └── CHECK(quantity >= 0)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use stockslip_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("AST-RED-01").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::request::{CreateSaleRequest, EditSaleRequest, LineRequest, NewItem};
use crate::types::{Classification, ProductType, SlipStatus};
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_SLIP_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockslip_core::validation::validate_sku;
///
/// assert!(validate_sku("AST-RED-01").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Normalizes a SKU for storage: trimmed and upper-cased.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// Validates an item name.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates the customer name on a slip.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_text("customer_name", name, 120)
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that a money amount (or stock level) is not negative.
///
/// ## Example
/// ```rust
/// use stockslip_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", 1099).is_ok());
/// assert!(validate_non_negative("price", 0).is_ok());
/// assert!(validate_non_negative("price", -100).is_err());
/// ```
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a money amount: `0..=MAX_PRICE_CENTS`.
pub fn validate_amount(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative(field, cents)?;

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

fn validate_optional_amount(field: &str, value: Option<i64>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_amount(field, v),
        None => Ok(()),
    }
}

fn validate_optional_non_negative(field: &str, value: Option<i64>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_non_negative(field, v),
        None => Ok(()),
    }
}

// =============================================================================
// Classification
// =============================================================================

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Checks that only the attribute group of the item's product type is set.
///
/// ```text
///   Cover → cover_type
///   Plate → plate_company, bike_name, plate_type
///   Form  → form_company, form_type, form_variant
///   Other → none of the above
/// ```
/// `category`, `subcategory` and `company` are allowed for every type.
pub fn validate_classification(classification: &Classification) -> ValidationResult<()> {
    let product_type = classification.product_type;

    let cover: &[(&str, &Option<String>)] = &[("cover_type", &classification.cover_type)];
    let plate: &[(&str, &Option<String>)] = &[
        ("plate_company", &classification.plate_company),
        ("bike_name", &classification.bike_name),
        ("plate_type", &classification.plate_type),
    ];
    let form: &[(&str, &Option<String>)] = &[
        ("form_company", &classification.form_company),
        ("form_type", &classification.form_type),
        ("form_variant", &classification.form_variant),
    ];

    for (owner, fields) in [
        (ProductType::Cover, cover),
        (ProductType::Plate, plate),
        (ProductType::Form, form),
    ] {
        if owner == product_type {
            continue;
        }
        if let Some((field, _)) = fields.iter().find(|(_, value)| is_set(value)) {
            return Err(ValidationError::NotApplicable {
                field: field.to_string(),
                product_type: product_type.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Sale Requests
// =============================================================================

/// Validates one requested line.
///
/// Classification gating only applies when the line names its product
/// type; otherwise the catalog item's type decides later.
pub fn validate_line(line: &LineRequest) -> ValidationResult<()> {
    if line.product_name.trim().is_empty() {
        return Err(ValidationError::required("product_name"));
    }

    validate_quantity(line.quantity)?;
    validate_optional_amount("base_price", line.base_price_cents)?;
    validate_optional_amount("unit_price", line.unit_price_cents)?;
    validate_optional_amount("price", line.price_cents)?;

    if line.product_type.is_some() {
        validate_classification(&line.classification())?;
    }

    Ok(())
}

/// Validates a full line set: non-empty, bounded, every line valid.
pub fn validate_lines(lines: &[LineRequest]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::required("lines"));
    }

    if lines.len() > MAX_SLIP_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SLIP_LINES as i64,
        });
    }

    lines.iter().try_for_each(validate_line)
}

/// Validates a create request.
///
/// ## Rules
/// - Customer name present
/// - `subtotal` and `totalAmount` present and non-negative
/// - `tax` / `discount` non-negative when given
/// - A slip cannot be created already cancelled
/// - At least one valid line
pub fn validate_create_sale(req: &CreateSaleRequest) -> ValidationResult<()> {
    validate_customer_name(&req.customer_name)?;

    let subtotal = req
        .subtotal_cents
        .ok_or_else(|| ValidationError::required("subtotal"))?;
    validate_amount("subtotal", subtotal)?;

    let total = req
        .total_amount_cents
        .ok_or_else(|| ValidationError::required("total_amount"))?;
    validate_amount("total_amount", total)?;

    validate_optional_amount("tax", req.tax_cents)?;
    validate_optional_amount("discount", req.discount_cents)?;

    if req.status == Some(SlipStatus::Cancelled) {
        return Err(ValidationError::InvalidFormat {
            field: "status".to_string(),
            reason: "a sale cannot be created cancelled".to_string(),
        });
    }

    validate_lines(&req.lines)
}

/// Validates an edit request. Only present fields are checked.
pub fn validate_edit_sale(req: &EditSaleRequest) -> ValidationResult<()> {
    if let Some(name) = &req.customer_name {
        validate_customer_name(name)?;
    }

    validate_optional_amount("subtotal", req.subtotal_cents)?;
    validate_optional_amount("total_amount", req.total_amount_cents)?;
    validate_optional_amount("tax", req.tax_cents)?;
    validate_optional_amount("discount", req.discount_cents)?;

    if let Some(lines) = &req.lines {
        validate_lines(lines)?;
    }

    Ok(())
}

// =============================================================================
// Item Intake
// =============================================================================

/// Validates a new catalog item.
pub fn validate_new_item(item: &NewItem) -> ValidationResult<()> {
    validate_item_name(&item.name)?;
    validate_sku(&item.sku)?;
    validate_classification(&item.classification)?;
    validate_non_negative("quantity", item.quantity)?;
    validate_amount("price", item.price_cents)?;
    validate_optional_amount("base_price", item.base_price_cents)?;
    validate_amount("cost_price", item.cost_price_cents)?;
    validate_optional_non_negative("low_stock_threshold", item.low_stock_threshold)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Domain Types
//!
//! Core domain types used throughout Stockslip.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │   SaleRecord    │   │   IncomeEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  slip_id        │       │
//! │  │  sku (UPPER)    │   │  slip_number    │   │  slip_number    │       │
//! │  │  classification │   │  lines[]  ──────┼──►│  products[]     │       │
//! │  │  quantity ≥ 0   │   │  status         │   │  is_active      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PricedLine    │   │   SlipStatus    │   │  DiscountType   │       │
//! │  │  (snapshot)     │   │  Paid           │   │  none           │       │
//! │  │  unit_price     │   │  Pending        │   │  bulk           │       │
//! │  │  discount       │   │  Cancelled      │   │  manual         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A [`PricedLine`] copies product name and classification at the time of
//! sale. Later edits to the [`Item`] never reach a committed slip; the line
//! does not even hold the item id; restoring stock later re-resolves the
//! line by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product Classification
// =============================================================================

/// Product type; gates which classification attributes an item may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ProductType {
    #[serde(alias = "cover")]
    Cover,
    #[serde(alias = "plate")]
    Plate,
    #[serde(alias = "form")]
    Form,
    #[default]
    #[serde(alias = "other")]
    Other,
}

impl ProductType {
    /// Returns the canonical name ("Cover", "Plate", ...).
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductType::Cover => "Cover",
            ProductType::Plate => "Plate",
            ProductType::Form => "Form",
            ProductType::Other => "Other",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cover" => Ok(ProductType::Cover),
            "plate" => Ok(ProductType::Plate),
            "form" => Ok(ProductType::Form),
            "other" => Ok(ProductType::Other),
            other => Err(ValidationError::InvalidFormat {
                field: "product_type".to_string(),
                reason: format!("unknown product type '{}'", other),
            }),
        }
    }
}

/// Classification attributes of an item (and of a line snapshot).
///
/// The cover, plate and form groups are mutually exclusive; see
/// [`crate::validation::validate_classification`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Classification {
    pub product_type: ProductType,

    // Cover group
    pub cover_type: Option<String>,

    // Plate group
    pub plate_company: Option<String>,
    pub bike_name: Option<String>,
    pub plate_type: Option<String>,

    // Form group
    pub form_company: Option<String>,
    pub form_type: Option<String>,
    pub form_variant: Option<String>,

    // Free-form attributes, allowed for every type
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub company: Option<String>,
}

// =============================================================================
// Item
// =============================================================================

/// A stock item; one row of the Stock Ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name; matched (case-insensitively) by slip lines.
    pub name: String,

    /// Stock Keeping Unit, stored upper-cased.
    pub sku: String,

    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub classification: Classification,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Shelf price in minor units.
    pub price_cents: i64,

    /// Reference price used when a slip line carries no base price.
    pub base_price_cents: i64,

    /// Purchase cost, for margin reporting.
    pub cost_price_cents: i64,

    /// Below this quantity the item counts as low stock.
    pub low_stock_threshold: i64,

    /// Soft-delete flag; inactive items are invisible to every lookup.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    /// True when the ledger can hand out `quantity` more units.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.is_active && self.quantity >= quantity
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// Mode of an administrative stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AdjustMode {
    /// Overwrite the quantity.
    Set,
    /// Restock.
    Add,
    /// Shrinkage, damage, manual correction.
    Subtract,
}

// =============================================================================
// Discount Type
// =============================================================================

/// How the unit price of a line was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DiscountType {
    /// Unit price equals the base price.
    #[default]
    None,
    /// Automatic per-unit reduction for bulk cover orders.
    Bulk,
    /// Caller-supplied unit price.
    Manual,
}

// =============================================================================
// Priced Line
// =============================================================================

/// One product entry of a slip, frozen at the time it was priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedLine {
    /// Product reference as requested; re-resolved on restore.
    pub product_name: String,

    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub classification: Classification,

    pub quantity: i64,

    /// Price before any discount.
    pub base_price_cents: i64,

    /// Price actually charged per unit.
    pub unit_price_cents: i64,

    /// Total discount for the line (per-unit discount × quantity).
    pub discount_cents: i64,

    pub discount_type: DiscountType,

    /// quantity × unit_price.
    pub total_price_cents: i64,
}

impl PricedLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Slip Status
// =============================================================================

/// Status of a sale record. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum SlipStatus {
    #[default]
    #[serde(alias = "paid")]
    Paid,
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "cancelled", alias = "Canceled", alias = "canceled")]
    Cancelled,
}

impl SlipStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SlipStatus::Paid => "Paid",
            SlipStatus::Pending => "Pending",
            SlipStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for SlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment metadata only; no payment is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "Cash")]
    Cash,
    #[serde(alias = "Card")]
    Card,
    #[serde(alias = "Transfer", alias = "upi", alias = "UPI")]
    Transfer,
    #[serde(alias = "Credit")]
    Credit,
    #[serde(alias = "Other")]
    Other,
}

// =============================================================================
// Sale Record
// =============================================================================

/// A sale receipt ("slip").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,

    /// Human-readable number, `SLP-YYYYMMDD-NNNN`.
    pub slip_number: String,

    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,

    pub status: SlipStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Ordered lines; loaded separately from `slip_lines`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<PricedLine>,
}

impl SaleRecord {
    /// Sum of `total_price` over all lines.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(PricedLine::total_price).sum()
    }

    /// Sum of line discounts.
    pub fn lines_discount(&self) -> Money {
        self.lines.iter().map(PricedLine::discount).sum()
    }

    /// Total units across all lines.
    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// A slip counts as cancelled once `cancelled_at` is stamped.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some() || self.status == SlipStatus::Cancelled
    }
}

// =============================================================================
// Income Entry
// =============================================================================

/// One sold line as denormalized into the income ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IncomeProduct {
    pub product_name: String,
    pub product_type: ProductType,
    pub cover_type: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub discount_type: DiscountType,
    pub total_price_cents: i64,
}

impl From<&PricedLine> for IncomeProduct {
    fn from(line: &PricedLine) -> Self {
        IncomeProduct {
            product_name: line.product_name.clone(),
            product_type: line.classification.product_type,
            cover_type: line.classification.cover_type.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            discount_cents: line.discount_cents,
            discount_type: line.discount_type,
            total_price_cents: line.total_price_cents,
        }
    }
}

/// Income ledger record mirroring a committed, non-cancelled slip.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IncomeEntry {
    pub id: String,

    /// Durable link to the slip. Historical rows may only carry one of
    /// `slip_id` / `slip_number`.
    pub slip_id: Option<String>,
    pub slip_number: Option<String>,

    #[ts(as = "String")]
    pub income_date: DateTime<Utc>,

    pub total_income_cents: i64,
    pub products: Vec<IncomeProduct>,

    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,

    /// Cleared when the source slip is cancelled.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl IncomeEntry {
    /// Builds the mirror of `slip`, linked by both id and number.
    pub fn mirror(id: String, slip: &SaleRecord, now: DateTime<Utc>) -> Self {
        IncomeEntry {
            id,
            slip_id: Some(slip.id.clone()),
            slip_number: Some(slip.slip_number.clone()),
            income_date: slip.created_at,
            total_income_cents: slip.total_cents,
            products: slip.lines.iter().map(IncomeProduct::from).collect(),
            customer_name: slip.customer_name.clone(),
            customer_phone: slip.customer_phone.clone(),
            payment_method: slip.payment_method,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn total_income(&self) -> Money {
        Money::from_cents(self.total_income_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(total: i64, qty: i64) -> PricedLine {
        PricedLine {
            product_name: "Plate".to_string(),
            classification: Classification::default(),
            quantity: qty,
            base_price_cents: total / qty,
            unit_price_cents: total / qty,
            discount_cents: 0,
            discount_type: DiscountType::None,
            total_price_cents: total,
        }
    }

    fn slip(lines: Vec<PricedLine>) -> SaleRecord {
        let now = Utc::now();
        SaleRecord {
            id: "slip-1".to_string(),
            slip_number: "SLP-20261018-0001".to_string(),
            customer_name: "Ravi".to_string(),
            customer_phone: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            subtotal_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 5000,
            status: SlipStatus::Paid,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            lines,
        }
    }

    #[test]
    fn test_product_type_parsing() {
        assert_eq!("cover".parse::<ProductType>().unwrap(), ProductType::Cover);
        assert_eq!(" Plate ".parse::<ProductType>().unwrap(), ProductType::Plate);
        assert!("sticker".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_slip_status_accepts_both_spellings() {
        let s: SlipStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(s, SlipStatus::Cancelled);
        let s: SlipStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(s, SlipStatus::Cancelled);
    }

    #[test]
    fn test_lines_total_and_units() {
        let record = slip(vec![line(2000, 2), line(3000, 3)]);
        assert_eq!(record.lines_total().cents(), 5000);
        assert_eq!(record.units(), 5);
        assert!(!record.is_cancelled());
    }

    #[test]
    fn test_income_mirror_links_both_keys() {
        let record = slip(vec![line(5000, 5)]);
        let entry = IncomeEntry::mirror("inc-1".to_string(), &record, Utc::now());

        assert_eq!(entry.slip_id.as_deref(), Some("slip-1"));
        assert_eq!(entry.slip_number.as_deref(), Some("SLP-20261018-0001"));
        assert_eq!(entry.total_income_cents, 5000);
        assert_eq!(entry.products.len(), 1);
        assert!(entry.is_active);
    }

    #[test]
    fn test_item_flattens_classification_in_json() {
        let now = Utc::now();
        let item = Item {
            id: "i1".to_string(),
            name: "Aster Cover Red".to_string(),
            sku: "AST-RED".to_string(),
            classification: Classification {
                product_type: ProductType::Cover,
                cover_type: Some("Aster Cover".to_string()),
                ..Classification::default()
            },
            quantity: 4,
            price_cents: 10_000,
            base_price_cents: 10_000,
            cost_price_cents: 6_000,
            low_stock_threshold: 5,
            is_active: true,
            created_at: now,
            last_updated: now,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productType"], "Cover");
        assert_eq!(json["coverType"], "Aster Cover");
        assert!(item.is_low_stock());
        assert!(item.can_fulfill(4));
        assert!(!item.can_fulfill(5));
    }
}

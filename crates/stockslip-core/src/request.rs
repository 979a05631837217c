//! # Sale Requests
//!
//! Payloads the CRUD layer hands to the fulfillment engine.
//!
//! Field names follow the JSON the frontend already sends (`productName`,
//! `basePrice`, `unitPrice`, ...). Legacy spellings are accepted as aliases:
//! `itemName` for the product reference, `products` / `items` for the line
//! list. All money fields are minor units.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Classification, PaymentMethod, ProductType, SlipStatus};

// =============================================================================
// Line Request
// =============================================================================

/// One requested line, before resolution and pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineRequest {
    /// Product reference; matched against item name or SKU.
    #[serde(alias = "itemName")]
    pub product_name: String,

    pub quantity: i64,

    #[serde(default, rename = "basePrice")]
    pub base_price_cents: Option<i64>,

    /// Explicit unit price; a manual override when it disagrees with the
    /// computed price.
    #[serde(default, rename = "unitPrice")]
    pub unit_price_cents: Option<i64>,

    /// Legacy spelling of the unit price.
    #[serde(default, rename = "price")]
    pub price_cents: Option<i64>,

    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub cover_type: Option<String>,
    #[serde(default)]
    pub plate_company: Option<String>,
    #[serde(default)]
    pub bike_name: Option<String>,
    #[serde(default)]
    pub plate_type: Option<String>,
    #[serde(default)]
    pub form_company: Option<String>,
    #[serde(default)]
    pub form_type: Option<String>,
    #[serde(default)]
    pub form_variant: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl LineRequest {
    /// The caller-supplied unit price: `unitPrice`, else legacy `price`.
    pub fn supplied_unit_price_cents(&self) -> Option<i64> {
        self.unit_price_cents.or(self.price_cents)
    }

    /// Classification carried by the request alone.
    pub fn classification(&self) -> Classification {
        Classification {
            product_type: self.product_type.unwrap_or_default(),
            cover_type: self.cover_type.clone(),
            plate_company: self.plate_company.clone(),
            bike_name: self.bike_name.clone(),
            plate_type: self.plate_type.clone(),
            form_company: self.form_company.clone(),
            form_type: self.form_type.clone(),
            form_variant: self.form_variant.clone(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            company: self.company.clone(),
        }
    }

    /// Fills classification attributes the request leaves out from the
    /// resolved catalog item. Attributes present on the request win.
    ///
    /// Type-specific groups are only inherited when the effective product
    /// type matches the catalog's; free-form attributes always are.
    pub fn with_catalog_classification(&self, catalog: &Classification) -> LineRequest {
        fn pick(own: &Option<String>, fallback: &Option<String>) -> Option<String> {
            own.clone().or_else(|| fallback.clone())
        }

        let product_type = self.product_type.unwrap_or(catalog.product_type);
        let same_type = product_type == catalog.product_type;
        let inherit = |own: &Option<String>, fallback: &Option<String>| {
            if same_type {
                pick(own, fallback)
            } else {
                own.clone()
            }
        };

        LineRequest {
            product_type: Some(product_type),
            cover_type: inherit(&self.cover_type, &catalog.cover_type),
            plate_company: inherit(&self.plate_company, &catalog.plate_company),
            bike_name: inherit(&self.bike_name, &catalog.bike_name),
            plate_type: inherit(&self.plate_type, &catalog.plate_type),
            form_company: inherit(&self.form_company, &catalog.form_company),
            form_type: inherit(&self.form_type, &catalog.form_type),
            form_variant: inherit(&self.form_variant, &catalog.form_variant),
            category: pick(&self.category, &catalog.category),
            subcategory: pick(&self.subcategory, &catalog.subcategory),
            company: pick(&self.company, &catalog.company),
            ..self.clone()
        }
    }
}

// =============================================================================
// Create / Edit
// =============================================================================

/// Request to record a new sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateSaleRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,

    /// Required; absence is a validation error.
    #[serde(default, rename = "subtotal")]
    pub subtotal_cents: Option<i64>,
    /// Required; absence is a validation error.
    #[serde(default, rename = "totalAmount")]
    pub total_amount_cents: Option<i64>,
    #[serde(default, rename = "tax")]
    pub tax_cents: Option<i64>,
    #[serde(default, rename = "discount")]
    pub discount_cents: Option<i64>,

    /// Defaults to Paid.
    #[serde(default)]
    pub status: Option<SlipStatus>,

    #[serde(default, alias = "products", alias = "items")]
    pub lines: Vec<LineRequest>,
}

/// Partial update of an existing sale. Absent fields are left untouched.
///
/// `lines: Some(..)` triggers the restore-then-reserve rewrite of the slip.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EditSaleRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "subtotal")]
    pub subtotal_cents: Option<i64>,
    #[serde(default, rename = "totalAmount")]
    pub total_amount_cents: Option<i64>,
    #[serde(default, rename = "tax")]
    pub tax_cents: Option<i64>,
    #[serde(default, rename = "discount")]
    pub discount_cents: Option<i64>,
    #[serde(default)]
    pub status: Option<SlipStatus>,
    #[serde(default, alias = "products", alias = "items")]
    pub lines: Option<Vec<LineRequest>>,
}

impl EditSaleRequest {
    /// The edit used by `cancel_sale`.
    pub fn cancel() -> Self {
        EditSaleRequest {
            status: Some(SlipStatus::Cancelled),
            ..EditSaleRequest::default()
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.status == Some(SlipStatus::Cancelled)
    }
}

// =============================================================================
// Item Intake
// =============================================================================

/// Request to add an item to the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewItem {
    pub name: String,
    pub sku: String,
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, rename = "price")]
    pub price_cents: i64,
    /// Defaults to `price` when absent.
    #[serde(default, rename = "basePrice")]
    pub base_price_cents: Option<i64>,
    #[serde(default, rename = "costPrice")]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_accepts_legacy_spellings() {
        let line: LineRequest =
            serde_json::from_str(r#"{"itemName":"Aster Cover","quantity":2,"price":9500}"#)
                .unwrap();

        assert_eq!(line.product_name, "Aster Cover");
        assert_eq!(line.unit_price_cents, None);
        assert_eq!(line.supplied_unit_price_cents(), Some(9500));
    }

    #[test]
    fn test_unit_price_wins_over_legacy_price() {
        let line = LineRequest {
            unit_price_cents: Some(9000),
            price_cents: Some(9500),
            ..LineRequest::default()
        };
        assert_eq!(line.supplied_unit_price_cents(), Some(9000));
    }

    #[test]
    fn test_create_request_accepts_products_alias() {
        let req: CreateSaleRequest = serde_json::from_str(
            r#"{
                "customerName": "Ravi",
                "subtotal": 20000,
                "totalAmount": 20000,
                "products": [{"productName": "Plate", "quantity": 1, "productType": "Plate"}]
            }"#,
        )
        .unwrap();

        assert_eq!(req.lines.len(), 1);
        assert_eq!(req.lines[0].product_type, Some(ProductType::Plate));
        assert_eq!(req.total_amount_cents, Some(20000));
    }

    #[test]
    fn test_catalog_classification_fills_gaps_only() {
        let catalog = Classification {
            product_type: ProductType::Cover,
            cover_type: Some("Aster Cover".to_string()),
            company: Some("Aster".to_string()),
            ..Classification::default()
        };
        let line = LineRequest {
            product_name: "aster".to_string(),
            quantity: 1,
            company: Some("Local".to_string()),
            ..LineRequest::default()
        };

        let merged = line.with_catalog_classification(&catalog);
        assert_eq!(merged.product_type, Some(ProductType::Cover));
        assert_eq!(merged.cover_type.as_deref(), Some("Aster Cover"));
        assert_eq!(merged.company.as_deref(), Some("Local"));
        assert_eq!(merged.product_name, "aster");
    }

    #[test]
    fn test_catalog_groups_not_inherited_across_types() {
        let catalog = Classification {
            product_type: ProductType::Plate,
            plate_company: Some("Honda".to_string()),
            category: Some("Bikes".to_string()),
            ..Classification::default()
        };
        let line = LineRequest {
            product_name: "Honda".to_string(),
            quantity: 1,
            product_type: Some(ProductType::Other),
            ..LineRequest::default()
        };

        let merged = line.with_catalog_classification(&catalog);
        assert_eq!(merged.product_type, Some(ProductType::Other));
        assert_eq!(merged.plate_company, None);
        assert_eq!(merged.category.as_deref(), Some("Bikes"));
    }

    #[test]
    fn test_cancel_edit() {
        let edit = EditSaleRequest::cancel();
        assert!(edit.is_cancellation());
        assert!(edit.lines.is_none());
    }
}

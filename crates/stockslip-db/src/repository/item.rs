//! # Item Repository
//!
//! Catalog intake and lookups. Stock movements live in
//! [`StockLedger`](super::ledger::StockLedger).
//!
//! Every lookup is scoped to `is_active = 1`: a soft-deleted item behaves
//! exactly like one that never existed.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::StockLedger;
use crate::unit_of_work::UnitOfWork;
use stockslip_core::request::NewItem;
use stockslip_core::validation::{normalize_sku, validate_new_item};
use stockslip_core::{AdjustMode, CoreError, Item};

/// Column list matching [`Item`]'s `FromRow` shape.
pub(crate) const ITEM_COLUMNS: &str = "id, name, sku, \
    product_type, cover_type, plate_company, bike_name, plate_type, \
    form_company, form_type, form_variant, category, subcategory, company, \
    quantity, price_cents, base_price_cents, cost_price_cents, low_stock_threshold, \
    is_active, created_at, last_updated";

/// Default low-stock threshold for intake without one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Repository for the item catalog.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Adds an item to the catalog.
    ///
    /// ## Rules
    /// - Intake is validated first (SKU format, classification gating,
    ///   non-negative quantity and prices)
    /// - The SKU is stored upper-cased and must be unique, including among
    ///   soft-deleted items
    /// - `base_price` defaults to `price`
    pub async fn insert(&self, new: &NewItem) -> DbResult<Item> {
        validate_new_item(new).map_err(CoreError::from)?;

        let sku = normalize_sku(&new.sku);

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE sku = ?1")
            .bind(&sku)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(DbError::duplicate("sku", sku));
        }

        let now = Utc::now();
        let item = Item {
            id: generate_item_id(),
            name: new.name.trim().to_string(),
            sku,
            classification: new.classification.clone(),
            quantity: new.quantity,
            price_cents: new.price_cents,
            base_price_cents: new.base_price_cents.unwrap_or(new.price_cents),
            cost_price_cents: new.cost_price_cents,
            low_stock_threshold: new
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            is_active: true,
            created_at: now,
            last_updated: now,
        };

        debug!(id = %item.id, sku = %item.sku, "Inserting item");

        let c = &item.classification;
        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, sku,
                product_type, cover_type, plate_company, bike_name, plate_type,
                form_company, form_type, form_variant, category, subcategory, company,
                quantity, price_cents, base_price_cents, cost_price_cents, low_stock_threshold,
                is_active, created_at, last_updated
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19,
                ?20, ?21, ?22
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.sku)
        .bind(c.product_type)
        .bind(&c.cover_type)
        .bind(&c.plate_company)
        .bind(&c.bike_name)
        .bind(&c.plate_type)
        .bind(&c.form_company)
        .bind(&c.form_type)
        .bind(&c.form_variant)
        .bind(&c.category)
        .bind(&c.subcategory)
        .bind(&c.company)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(item.base_price_cents)
        .bind(item.cost_price_cents)
        .bind(item.low_stock_threshold)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", item.sku.clone()),
            other => other,
        })?;

        info!(id = %item.id, sku = %item.sku, quantity = item.quantity, "Item added to catalog");
        Ok(item)
    }

    /// Gets an active item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_id(&mut conn, id).await
    }

    /// Gets an active item by ID on the caller's connection.
    pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?1 AND is_active = 1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(item)
    }

    /// Gets an active item by SKU (case-insensitive).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE sku = ?1 AND is_active = 1",
            ITEM_COLUMNS
        ))
        .bind(normalize_sku(sku))
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists active items in catalog (insertion) order.
    pub async fn list_active(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE is_active = 1 ORDER BY rowid",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Soft-deletes an item by setting `is_active = 0`.
    ///
    /// Committed slips keep their snapshots; the item just stops resolving.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting item");

        let result = sqlx::query(
            "UPDATE items SET is_active = 0, last_updated = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Administrative stock adjustment, in its own unit of work.
    ///
    /// ## Modes
    /// - `Set`: overwrite (negative values rejected)
    /// - `Add`: restock
    /// - `Subtract`: fails with `InsufficientStock` below zero
    pub async fn adjust_stock(&self, id: &str, quantity: i64, mode: AdjustMode) -> DbResult<Item> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        match StockLedger::direct_set(uow.conn(), id, quantity, mode).await {
            Ok(item) => {
                uow.commit().await?;
                Ok(item)
            }
            Err(err) => {
                uow.abort().await?;
                Err(err)
            }
        }
    }

    /// Restocks an item (`adjust_stock` with `Add`).
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<Item> {
        self.adjust_stock(id, quantity, AdjustMode::Add).await
    }

    /// Counts active items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockslip_core::{Classification, ProductType, ValidationError};

    fn cover(name: &str, sku: &str, quantity: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            sku: sku.to_string(),
            classification: Classification {
                product_type: ProductType::Cover,
                cover_type: Some("Aster Cover".to_string()),
                ..Classification::default()
            },
            quantity,
            price_cents: 10_000,
            ..NewItem::default()
        }
    }

    #[tokio::test]
    async fn test_insert_normalizes_sku_and_defaults_base_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let item = db.items().insert(&cover("Aster Cover Red", "ast-red", 5)).await.unwrap();
        assert_eq!(item.sku, "AST-RED");
        assert_eq!(item.base_price_cents, 10_000);
        assert_eq!(item.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);

        let loaded = db.items().get_by_sku("Ast-Red").await.unwrap().unwrap();
        assert_eq!(loaded.id, item.id);
        assert_eq!(loaded.classification.product_type, ProductType::Cover);
        assert_eq!(loaded.classification.cover_type.as_deref(), Some("Aster Cover"));
        assert_eq!(loaded.quantity, 5);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.items().insert(&cover("Aster Cover Red", "AST-RED", 5)).await.unwrap();
        let err = db
            .items()
            .insert(&cover("Aster Cover Red 2", "ast-red", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "sku"));
    }

    #[tokio::test]
    async fn test_invalid_intake_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bad = cover("Aster Cover Red", "AST-RED", 5);
        bad.classification.plate_company = Some("Honda".to_string());

        let err = db.items().insert(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::NotApplicable { .. }))
        ));
        assert_eq!(db.items().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_item_is_invisible() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let item = db.items().insert(&cover("Aster Cover Red", "AST-RED", 5)).await.unwrap();
        db.items().soft_delete(&item.id).await.unwrap();

        assert!(db.items().get_by_id(&item.id).await.unwrap().is_none());
        assert!(db.items().get_by_sku("AST-RED").await.unwrap().is_none());
        assert!(matches!(
            db.items().soft_delete(&item.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_modes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.items().insert(&cover("Aster Cover Red", "AST-RED", 5)).await.unwrap();

        let item = db.items().restock(&item.id, 3).await.unwrap();
        assert_eq!(item.quantity, 8);

        let item = db
            .items()
            .adjust_stock(&item.id, 6, AdjustMode::Subtract)
            .await
            .unwrap();
        assert_eq!(item.quantity, 2);

        let err = db
            .items()
            .adjust_stock(&item.id, 3, AdjustMode::Subtract)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        let item = db.items().adjust_stock(&item.id, 40, AdjustMode::Set).await.unwrap();
        assert_eq!(item.quantity, 40);

        assert!(db
            .items()
            .adjust_stock(&item.id, -1, AdjustMode::Set)
            .await
            .is_err());
        assert_eq!(
            db.items().get_by_id(&item.id).await.unwrap().unwrap().quantity,
            40
        );
    }
}

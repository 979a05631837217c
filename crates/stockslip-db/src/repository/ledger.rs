//! # Stock Ledger
//!
//! Per-item available quantity, moved only inside a caller's unit of work.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line reference: "aster"                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Active items whose name OR sku contains "aster" (case-insensitive,    │
//! │  literal substring), in catalog insertion order:                       │
//! │                                                                         │
//! │     1. Aster Cover Red        AST-RED        ◄── FirstMatch picks this │
//! │     2. Without Aster Cover    WAC-01                                   │
//! │                                                                         │
//! │  FirstMatch → first row                                                │
//! │  Strict     → the single exact name/sku match, else AmbiguousItem      │
//! │  no rows    → ItemNotFound                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Non-negative Invariant
//! Decrements are guarded in SQL (`WHERE quantity >= ?`), so even two
//! writers racing on the same row cannot take the quantity below zero; the
//! `CHECK (quantity >= 0)` constraint backs this up.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::item::{ItemRepository, ITEM_COLUMNS};
use stockslip_core::validation::validate_non_negative;
use stockslip_core::{AdjustMode, CoreError, Item};

/// How a line reference that matches several items is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// First match in catalog insertion order.
    #[default]
    FirstMatch,
    /// Several matches are an error unless exactly one matches the
    /// reference exactly (name or SKU, case-insensitive).
    Strict,
}

/// Resolve / reserve / release against the item table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger {
    policy: ResolutionPolicy,
}

impl StockLedger {
    pub fn new(policy: ResolutionPolicy) -> Self {
        StockLedger { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// All active items matching `reference`, in insertion order.
    ///
    /// Unicode case folding on both sides; SQLite's `lower()` is ASCII-only.
    pub async fn find_matches(conn: &mut SqliteConnection, reference: &str) -> DbResult<Vec<Item>> {
        let needle = reference.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE is_active = 1 ORDER BY rowid",
            ITEM_COLUMNS
        ))
        .fetch_all(conn)
        .await?;

        Ok(items
            .into_iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle) || item.sku.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Resolves a line reference to exactly one active item.
    pub async fn resolve(&self, conn: &mut SqliteConnection, reference: &str) -> DbResult<Item> {
        let mut matches = Self::find_matches(conn, reference).await?;

        debug!(
            reference = %reference,
            matches = matches.len(),
            policy = ?self.policy,
            "Resolving item"
        );

        if matches.is_empty() {
            return Err(CoreError::ItemNotFound(reference.trim().to_string()).into());
        }

        if matches.len() == 1 || self.policy == ResolutionPolicy::FirstMatch {
            return Ok(matches.swap_remove(0));
        }

        let wanted = reference.trim();
        let folded = wanted.to_lowercase();
        let exact: Vec<&Item> = matches
            .iter()
            .filter(|i| i.name.to_lowercase() == folded || i.sku.to_lowercase() == folded)
            .collect();

        if let [item] = exact.as_slice() {
            return Ok((*item).clone());
        }

        Err(CoreError::AmbiguousItem {
            query: wanted.to_string(),
            candidates: matches.iter().map(|i| i.name.clone()).collect(),
        }
        .into())
    }

    /// Fails with `InsufficientStock` when `item` cannot cover `requested`.
    pub fn ensure_available(item: &Item, requested: i64) -> DbResult<()> {
        if item.quantity < requested {
            return Err(CoreError::InsufficientStock {
                product: item.name.clone(),
                available: item.quantity,
                requested,
            }
            .into());
        }
        Ok(())
    }

    /// Resolves, checks and decrements in one step.
    pub async fn reserve(
        &self,
        conn: &mut SqliteConnection,
        reference: &str,
        quantity: i64,
    ) -> DbResult<Item> {
        let item = self.resolve(conn, reference).await?;
        Self::ensure_available(&item, quantity)?;
        Self::decrement(conn, &item, quantity).await
    }

    /// Resolves and increments. Used to hand back previously reserved units.
    pub async fn release(
        &self,
        conn: &mut SqliteConnection,
        reference: &str,
        quantity: i64,
    ) -> DbResult<Item> {
        let item = self.resolve(conn, reference).await?;
        Self::increment(conn, &item.id, quantity).await
    }

    /// Guarded decrement of a resolved item.
    ///
    /// Zero affected rows means another writer got there first; the error
    /// reports the quantity as it is now.
    pub async fn decrement(conn: &mut SqliteConnection, item: &Item, quantity: i64) -> DbResult<Item> {
        debug!(id = %item.id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE items
            SET quantity = quantity - ?2, last_updated = ?3
            WHERE id = ?1 AND is_active = 1 AND quantity >= ?2
            "#,
        )
        .bind(&item.id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available = ItemRepository::find_by_id(conn, &item.id)
                .await?
                .map(|i| i.quantity)
                .unwrap_or(0);
            return Err(CoreError::InsufficientStock {
                product: item.name.clone(),
                available,
                requested: quantity,
            }
            .into());
        }

        Self::reload(conn, &item.id).await
    }

    /// Unconditional increment of an active item.
    pub async fn increment(conn: &mut SqliteConnection, item_id: &str, quantity: i64) -> DbResult<Item> {
        debug!(id = %item_id, quantity, "Incrementing stock");

        let result = sqlx::query(
            "UPDATE items SET quantity = quantity + ?2, last_updated = ?3 WHERE id = ?1 AND is_active = 1",
        )
        .bind(item_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", item_id));
        }

        Self::reload(conn, item_id).await
    }

    /// Administrative adjustment of one item by id.
    pub async fn direct_set(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
        mode: AdjustMode,
    ) -> DbResult<Item> {
        validate_non_negative("quantity", quantity).map_err(CoreError::from)?;

        let item = ItemRepository::find_by_id(conn, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;

        debug!(id = %item_id, quantity, mode = ?mode, "Adjusting stock");

        match mode {
            AdjustMode::Add => Self::increment(conn, item_id, quantity).await,
            AdjustMode::Subtract => {
                Self::ensure_available(&item, quantity)?;
                Self::decrement(conn, &item, quantity).await
            }
            AdjustMode::Set => {
                sqlx::query("UPDATE items SET quantity = ?2, last_updated = ?3 WHERE id = ?1")
                    .bind(item_id)
                    .bind(quantity)
                    .bind(Utc::now())
                    .execute(&mut *conn)
                    .await?;
                Self::reload(conn, item_id).await
            }
        }
    }

    async fn reload(conn: &mut SqliteConnection, item_id: &str) -> DbResult<Item> {
        ItemRepository::find_by_id(conn, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockslip_core::request::NewItem;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, sku, qty) in [
            ("Aster Cover Red", "AST-RED", 5),
            ("Without Aster Cover", "WAC-01", 7),
            ("Honda Plate", "HND-PL", 2),
        ] {
            db.items()
                .insert(&NewItem {
                    name: name.to_string(),
                    sku: sku.to_string(),
                    quantity: qty,
                    price_cents: 1_000,
                    ..NewItem::default()
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_first_match_uses_insertion_order() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::new(ResolutionPolicy::FirstMatch);

        let item = ledger.resolve(&mut conn, "ASTER").await.unwrap();
        assert_eq!(item.sku, "AST-RED");

        let item = ledger.resolve(&mut conn, "wac").await.unwrap();
        assert_eq!(item.name, "Without Aster Cover");
    }

    #[tokio::test]
    async fn test_strict_policy_reports_ambiguity() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::new(ResolutionPolicy::Strict);

        let err = ledger.resolve(&mut conn, "aster").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AmbiguousItem { ref candidates, .. }) if candidates.len() == 2
        ));

        let item = ledger.resolve(&mut conn, "without aster cover").await.unwrap();
        assert_eq!(item.sku, "WAC-01");
    }

    #[tokio::test]
    async fn test_reference_is_matched_literally() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::default();

        assert!(matches!(
            ledger.resolve(&mut conn, "A.*").await,
            Err(DbError::Domain(CoreError::ItemNotFound(_)))
        ));
        assert!(matches!(
            ledger.resolve(&mut conn, "%").await,
            Err(DbError::Domain(CoreError::ItemNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_names_match_case_insensitively() {
        let db = seeded().await;
        db.items()
            .insert(&NewItem {
                name: "Édition Cover".to_string(),
                sku: "EDN-01".to_string(),
                quantity: 4,
                price_cents: 1_000,
                ..NewItem::default()
            })
            .await
            .unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::new(ResolutionPolicy::Strict);

        for reference in ["Édition", "édition", "ÉDITION COVER"] {
            let item = ledger.resolve(&mut conn, reference).await.unwrap();
            assert_eq!(item.sku, "EDN-01");
        }
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::default();

        let item = ledger.reserve(&mut conn, "Honda", 2).await.unwrap();
        assert_eq!(item.quantity, 0);

        let err = ledger.reserve(&mut conn, "Honda", 1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1, .. })
        ));

        let item = ledger.release(&mut conn, "honda plate", 2).await.unwrap();
        assert_eq!(item.quantity, 2);
    }

    #[tokio::test]
    async fn test_guarded_decrement_never_goes_negative() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let ledger = StockLedger::default();

        // A stale copy claims more stock than the row holds.
        let mut stale = ledger.resolve(&mut conn, "HND-PL").await.unwrap();
        stale.quantity = 100;

        let err = StockLedger::decrement(&mut conn, &stale, 3).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_inactive_items_do_not_resolve() {
        let db = seeded().await;
        let item = db.items().get_by_sku("HND-PL").await.unwrap().unwrap();
        db.items().soft_delete(&item.id).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(matches!(
            StockLedger::default().resolve(&mut conn, "Honda").await,
            Err(DbError::Domain(CoreError::ItemNotFound(_)))
        ));
    }
}

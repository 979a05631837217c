//! # Income Repository
//!
//! The income ledger: one entry mirroring each committed, non-cancelled
//! slip.
//!
//! ## Link to the Slip
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  New entries        slip_id = S-UUID   slip_number = SLP-...-0001      │
//! │  Older entries      slip_id = NULL     slip_number = SLP-...-0001      │
//! │                     slip_id = S-UUID   slip_number = NULL              │
//! │                                                                         │
//! │  Lookups match (slip_id = ? OR slip_number = ?), so old rows are still │
//! │  found; a rewrite fills in whichever key was missing.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockslip_core::{IncomeEntry, IncomeProduct, PaymentMethod, SaleRecord};

const INCOME_COLUMNS: &str = "id, slip_id, slip_number, income_date, total_income_cents, \
    products, customer_name, customer_phone, payment_method, is_active, created_at, updated_at";

/// Row shape of `income_entries`; `products` is JSON text.
#[derive(Debug, FromRow)]
struct IncomeRow {
    id: String,
    slip_id: Option<String>,
    slip_number: Option<String>,
    income_date: DateTime<Utc>,
    total_income_cents: i64,
    products: String,
    customer_name: String,
    customer_phone: Option<String>,
    payment_method: PaymentMethod,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IncomeRow> for IncomeEntry {
    type Error = DbError;

    fn try_from(row: IncomeRow) -> Result<Self, Self::Error> {
        let products: Vec<IncomeProduct> =
            serde_json::from_str(&row.products).map_err(|e| DbError::Corrupt {
                what: format!("income entry {} products", row.id),
                reason: e.to_string(),
            })?;

        Ok(IncomeEntry {
            id: row.id,
            slip_id: row.slip_id,
            slip_number: row.slip_number,
            income_date: row.income_date,
            total_income_cents: row.total_income_cents,
            products,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            payment_method: row.payment_method,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn products_json(products: &[IncomeProduct]) -> DbResult<String> {
    serde_json::to_string(products).map_err(|e| DbError::Internal(e.to_string()))
}

/// Repository for the income ledger.
#[derive(Debug, Clone)]
pub struct IncomeRepository {
    pool: SqlitePool,
}

impl IncomeRepository {
    /// Creates a new IncomeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IncomeRepository { pool }
    }

    /// Every entry (active or not) linked to a slip by either key.
    pub async fn list_for_slip(&self, slip_id: &str, slip_number: &str) -> DbResult<Vec<IncomeEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_for_slip(&mut conn, slip_id, slip_number).await
    }

    /// Counts active entries (for diagnostics).
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM income_entries WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Connection-level operations (inside a UnitOfWork)
    // =========================================================================

    /// Entries linked to a slip by `slip_id` OR `slip_number`, oldest first.
    pub async fn find_for_slip(
        conn: &mut SqliteConnection,
        slip_id: &str,
        slip_number: &str,
    ) -> DbResult<Vec<IncomeEntry>> {
        let rows = sqlx::query_as::<_, IncomeRow>(&format!(
            "SELECT {} FROM income_entries WHERE slip_id = ?1 OR slip_number = ?2 ORDER BY created_at, rowid",
            INCOME_COLUMNS
        ))
        .bind(slip_id)
        .bind(slip_number)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(IncomeEntry::try_from).collect()
    }

    /// Inserts an entry.
    pub async fn insert(conn: &mut SqliteConnection, entry: &IncomeEntry) -> DbResult<()> {
        debug!(id = %entry.id, slip_number = ?entry.slip_number, "Inserting income entry");

        sqlx::query(
            r#"
            INSERT INTO income_entries (
                id, slip_id, slip_number, income_date, total_income_cents, products,
                customer_name, customer_phone, payment_method, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.slip_id)
        .bind(&entry.slip_number)
        .bind(entry.income_date)
        .bind(entry.total_income_cents)
        .bind(products_json(&entry.products)?)
        .bind(&entry.customer_name)
        .bind(&entry.customer_phone)
        .bind(entry.payment_method)
        .bind(entry.is_active)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a fresh mirror of `slip`.
    pub async fn insert_mirror(
        conn: &mut SqliteConnection,
        slip: &SaleRecord,
        now: DateTime<Utc>,
    ) -> DbResult<IncomeEntry> {
        let entry = IncomeEntry::mirror(generate_income_id(), slip, now);
        Self::insert(conn, &entry).await?;
        Ok(entry)
    }

    /// Brings every active entry of `slip` in line with the slip as it is
    /// now, backfilling both link keys. Inserts a mirror when none exists.
    ///
    /// Returns the number of entries rewritten (1 when one was inserted).
    pub async fn rewrite_for_slip(
        conn: &mut SqliteConnection,
        slip: &SaleRecord,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let products: Vec<IncomeProduct> = slip.lines.iter().map(IncomeProduct::from).collect();

        let result = sqlx::query(
            r#"
            UPDATE income_entries SET
                slip_id = ?1,
                slip_number = ?2,
                total_income_cents = ?3,
                products = ?4,
                customer_name = ?5,
                customer_phone = ?6,
                payment_method = ?7,
                updated_at = ?8
            WHERE is_active = 1 AND (slip_id = ?1 OR slip_number = ?2)
            "#,
        )
        .bind(&slip.id)
        .bind(&slip.slip_number)
        .bind(slip.total_cents)
        .bind(products_json(&products)?)
        .bind(&slip.customer_name)
        .bind(&slip.customer_phone)
        .bind(slip.payment_method)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            debug!(slip_id = %slip.id, rewritten = result.rows_affected(), "Income entries rewritten");
            return Ok(result.rows_affected());
        }

        debug!(slip_id = %slip.id, "No income entry to rewrite, inserting mirror");
        Self::insert_mirror(conn, slip, now).await?;
        Ok(1)
    }

    /// Deactivates every active entry linked to `slip`; returns how many.
    pub async fn deactivate_for_slip(
        conn: &mut SqliteConnection,
        slip: &SaleRecord,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE income_entries SET is_active = 0, updated_at = ?3
            WHERE is_active = 1 AND (slip_id = ?1 OR slip_number = ?2)
            "#,
        )
        .bind(&slip.id)
        .bind(&slip.slip_number)
        .bind(now)
        .execute(conn)
        .await?;

        debug!(slip_id = %slip.id, deactivated = result.rows_affected(), "Income entries deactivated");
        Ok(result.rows_affected())
    }
}

/// Helper to generate a new income entry ID.
pub fn generate_income_id() -> String {
    Uuid::new_v4().to_string()
}

//! # Slip Repository
//!
//! Sale records and their priced lines.
//!
//! ## Slip Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                             │
//! │     └── insert() → slip row + slip_lines rows (position 0..n)          │
//! │                                                                         │
//! │  2. EDIT (any number of times)                                         │
//! │     ├── update()        → header fields                                │
//! │     └── replace_lines() → delete + re-insert every line                │
//! │                                                                         │
//! │  3. CANCEL (terminal)                                                  │
//! │     └── update() with status = cancelled, cancelled_at stamped         │
//! │                                                                         │
//! │  Rows are never deleted.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Slip Numbers
//! `SLP-YYYYMMDD-NNNN`, a per-day sequence taken inside the creating unit of
//! work. Two creates racing for the same number collide on the UNIQUE index
//! and the loser aborts.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockslip_core::{PricedLine, SaleRecord, SLIP_NUMBER_PREFIX};

const SLIP_COLUMNS: &str = "id, slip_number, customer_name, customer_phone, payment_method, notes, \
    subtotal_cents, tax_cents, discount_cents, total_cents, status, \
    created_at, updated_at, cancelled_at";

const LINE_COLUMNS: &str = "product_name, \
    product_type, cover_type, plate_company, bike_name, plate_type, \
    form_company, form_type, form_variant, category, subcategory, company, \
    quantity, base_price_cents, unit_price_cents, discount_cents, discount_type, total_price_cents";

/// Formats a slip number: `SLP-20261018-0007`.
pub fn format_slip_number(date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{}-{:04}",
        SLIP_NUMBER_PREFIX,
        date.format("%Y%m%d"),
        sequence
    )
}

/// Repository for sale records.
#[derive(Debug, Clone)]
pub struct SlipRepository {
    pool: SqlitePool,
}

impl SlipRepository {
    /// Creates a new SlipRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SlipRepository { pool }
    }

    /// Gets a slip with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_id(&mut conn, id).await
    }

    /// Every slip of a customer (name compared case-insensitively), oldest
    /// first, cancelled ones included.
    pub async fn list_by_customer(&self, customer_name: &str) -> DbResult<Vec<SaleRecord>> {
        let mut conn = self.pool.acquire().await?;

        let mut slips = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {} FROM slips WHERE customer_name = ?1 COLLATE NOCASE ORDER BY created_at, rowid",
            SLIP_COLUMNS
        ))
        .bind(customer_name.trim())
        .fetch_all(&mut *conn)
        .await?;

        for slip in slips.iter_mut() {
            slip.lines = Self::load_lines(&mut conn, &slip.id).await?;
        }

        debug!(customer = %customer_name, count = slips.len(), "Loaded customer slips");
        Ok(slips)
    }

    /// Counts all slips (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM slips")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Connection-level operations (inside a UnitOfWork)
    // =========================================================================

    /// Gets a slip with its lines on the caller's connection.
    pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SaleRecord>> {
        let slip = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {} FROM slips WHERE id = ?1",
            SLIP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match slip {
            Some(mut slip) => {
                slip.lines = Self::load_lines(conn, &slip.id).await?;
                Ok(Some(slip))
            }
            None => Ok(None),
        }
    }

    /// Lines of a slip in their original order.
    pub async fn load_lines(conn: &mut SqliteConnection, slip_id: &str) -> DbResult<Vec<PricedLine>> {
        let lines = sqlx::query_as::<_, PricedLine>(&format!(
            "SELECT {} FROM slip_lines WHERE slip_id = ?1 ORDER BY position",
            LINE_COLUMNS
        ))
        .bind(slip_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// Next free number for the day of `now`.
    pub async fn next_slip_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
        let date = now.date_naive();
        let prefix = format!("{}-{}-", SLIP_NUMBER_PREFIX, date.format("%Y%m%d"));

        let last: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(substr(slip_number, length(?1) + 1) AS INTEGER))
            FROM slips
            WHERE substr(slip_number, 1, length(?1)) = ?1
            "#,
        )
        .bind(&prefix)
        .fetch_one(conn)
        .await?;

        let next = last.unwrap_or(0) + 1;
        Ok(format_slip_number(date, next as u32))
    }

    /// Inserts a slip and its lines.
    pub async fn insert(conn: &mut SqliteConnection, slip: &SaleRecord) -> DbResult<()> {
        debug!(id = %slip.id, slip_number = %slip.slip_number, lines = slip.lines.len(), "Inserting slip");

        sqlx::query(
            r#"
            INSERT INTO slips (
                id, slip_number, customer_name, customer_phone, payment_method, notes,
                subtotal_cents, tax_cents, discount_cents, total_cents, status,
                created_at, updated_at, cancelled_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14
            )
            "#,
        )
        .bind(&slip.id)
        .bind(&slip.slip_number)
        .bind(&slip.customer_name)
        .bind(&slip.customer_phone)
        .bind(slip.payment_method)
        .bind(&slip.notes)
        .bind(slip.subtotal_cents)
        .bind(slip.tax_cents)
        .bind(slip.discount_cents)
        .bind(slip.total_cents)
        .bind(slip.status)
        .bind(slip.created_at)
        .bind(slip.updated_at)
        .bind(slip.cancelled_at)
        .execute(&mut *conn)
        .await?;

        Self::insert_lines(conn, &slip.id, &slip.lines).await
    }

    /// Overwrites the header fields of an existing slip.
    pub async fn update(conn: &mut SqliteConnection, slip: &SaleRecord) -> DbResult<()> {
        debug!(id = %slip.id, status = %slip.status, "Updating slip");

        sqlx::query(
            r#"
            UPDATE slips SET
                customer_name = ?2,
                customer_phone = ?3,
                payment_method = ?4,
                notes = ?5,
                subtotal_cents = ?6,
                tax_cents = ?7,
                discount_cents = ?8,
                total_cents = ?9,
                status = ?10,
                updated_at = ?11,
                cancelled_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&slip.id)
        .bind(&slip.customer_name)
        .bind(&slip.customer_phone)
        .bind(slip.payment_method)
        .bind(&slip.notes)
        .bind(slip.subtotal_cents)
        .bind(slip.tax_cents)
        .bind(slip.discount_cents)
        .bind(slip.total_cents)
        .bind(slip.status)
        .bind(slip.updated_at)
        .bind(slip.cancelled_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Replaces every line of a slip.
    pub async fn replace_lines(
        conn: &mut SqliteConnection,
        slip_id: &str,
        lines: &[PricedLine],
    ) -> DbResult<()> {
        debug!(id = %slip_id, lines = lines.len(), "Replacing slip lines");

        sqlx::query("DELETE FROM slip_lines WHERE slip_id = ?1")
            .bind(slip_id)
            .execute(&mut *conn)
            .await?;

        Self::insert_lines(conn, slip_id, lines).await
    }

    async fn insert_lines(
        conn: &mut SqliteConnection,
        slip_id: &str,
        lines: &[PricedLine],
    ) -> DbResult<()> {
        for (position, line) in lines.iter().enumerate() {
            let c = &line.classification;
            sqlx::query(
                r#"
                INSERT INTO slip_lines (
                    slip_id, position, product_name,
                    product_type, cover_type, plate_company, bike_name, plate_type,
                    form_company, form_type, form_variant, category, subcategory, company,
                    quantity, base_price_cents, unit_price_cents, discount_cents,
                    discount_type, total_price_cents
                ) VALUES (
                    ?1, ?2, ?3,
                    ?4, ?5, ?6, ?7, ?8,
                    ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18,
                    ?19, ?20
                )
                "#,
            )
            .bind(slip_id)
            .bind(position as i64)
            .bind(&line.product_name)
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
            .bind(line.quantity)
            .bind(line.base_price_cents)
            .bind(line.unit_price_cents)
            .bind(line.discount_cents)
            .bind(line.discount_type)
            .bind(line.total_price_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

/// Helper to generate a new slip ID.
pub fn generate_slip_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use stockslip_core::{
        Classification, DiscountType, PaymentMethod, ProductType, SlipStatus,
    };

    fn line(name: &str, qty: i64, unit: i64) -> PricedLine {
        PricedLine {
            product_name: name.to_string(),
            classification: Classification {
                product_type: ProductType::Cover,
                cover_type: Some("Aster Cover".to_string()),
                ..Classification::default()
            },
            quantity: qty,
            base_price_cents: unit,
            unit_price_cents: unit,
            discount_cents: 0,
            discount_type: DiscountType::None,
            total_price_cents: qty * unit,
        }
    }

    fn slip(id: &str, number: &str, customer: &str, at: DateTime<Utc>) -> SaleRecord {
        SaleRecord {
            id: id.to_string(),
            slip_number: number.to_string(),
            customer_name: customer.to_string(),
            customer_phone: Some("0300-1234567".to_string()),
            payment_method: PaymentMethod::Card,
            notes: None,
            subtotal_cents: 5_000,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 5_000,
            status: SlipStatus::Paid,
            created_at: at,
            updated_at: at,
            cancelled_at: None,
            lines: vec![line("Aster Cover Red", 2, 1_000), line("Honda Plate", 3, 1_000)],
        }
    }

    #[test]
    fn test_format_slip_number() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(format_slip_number(date, 7), "SLP-20261018-0007");
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let record = slip("s1", "SLP-20261018-0001", "Ravi", at);

        let mut uow = db.begin().await.unwrap();
        SlipRepository::insert(uow.conn(), &record).await.unwrap();
        uow.commit().await.unwrap();

        let loaded = db.slips().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(loaded.slip_number, "SLP-20261018-0001");
        assert_eq!(loaded.payment_method, PaymentMethod::Card);
        assert_eq!(loaded.status, SlipStatus::Paid);
        assert_eq!(loaded.created_at, at);
        assert_eq!(loaded.lines, record.lines);
    }

    #[tokio::test]
    async fn test_next_slip_number_is_daily_sequence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

        let mut uow = db.begin().await.unwrap();
        let first = SlipRepository::next_slip_number(uow.conn(), day).await.unwrap();
        assert_eq!(first, "SLP-20261018-0001");

        SlipRepository::insert(uow.conn(), &slip("s1", &first, "Ravi", day))
            .await
            .unwrap();

        let second = SlipRepository::next_slip_number(uow.conn(), day).await.unwrap();
        assert_eq!(second, "SLP-20261018-0002");

        let other = SlipRepository::next_slip_number(uow.conn(), next_day).await.unwrap();
        assert_eq!(other, "SLP-20261019-0001");
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_lines_and_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let mut record = slip("s1", "SLP-20261018-0001", "Ravi", at);

        let mut uow = db.begin().await.unwrap();
        SlipRepository::insert(uow.conn(), &record).await.unwrap();

        let new_lines = vec![line("Calendar Cover", 1, 4_000)];
        SlipRepository::replace_lines(uow.conn(), "s1", &new_lines)
            .await
            .unwrap();

        record.notes = Some("collected".to_string());
        record.status = SlipStatus::Cancelled;
        record.cancelled_at = Some(at);
        SlipRepository::update(uow.conn(), &record).await.unwrap();
        uow.commit().await.unwrap();

        let loaded = db.slips().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(loaded.lines, new_lines);
        assert_eq!(loaded.notes.as_deref(), Some("collected"));
        assert!(loaded.is_cancelled());
    }

    #[tokio::test]
    async fn test_list_by_customer_ignores_case() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();

        let mut uow = db.begin().await.unwrap();
        SlipRepository::insert(uow.conn(), &slip("s1", "SLP-20261018-0001", "Ravi", at))
            .await
            .unwrap();
        SlipRepository::insert(uow.conn(), &slip("s2", "SLP-20261018-0002", "Anya", at))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let slips = db.slips().list_by_customer("RAVI").await.unwrap();
        assert_eq!(slips.len(), 1);
        assert_eq!(slips[0].lines.len(), 2);
    }
}

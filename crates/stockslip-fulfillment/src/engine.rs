//! # Fulfillment Transaction Engine
//!
//! Create, edit and cancel sales. Each request is one unit of work: stock,
//! the slip and its income entry are committed together or not at all.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        create_sale(request)                             │
//! │                                                                         │
//! │  Validate ──► Resolve all lines ──► Check stock (per item, summed)     │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                     Price all lines                     │
//! │                                          │                              │
//! │  ┌────────────────────── UnitOfWork ─────┼──────────────────────────┐  │
//! │  │                                       ▼                          │  │
//! │  │   Insert slip ──► Guarded decrements ──► Insert income entry     │  │
//! │  │                                                      │           │  │
//! │  └──────────────────────────────────────────────────────┼───────────┘  │
//! │                                                         ▼              │
//! │                                                       COMMIT           │
//! │                                                                         │
//! │  Any failure on the way ──► ROLLBACK, nothing visible                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edit
//! Lines are replaced wholesale. The old lines go back to the ledger first,
//! then the new set is resolved, checked and reserved against the restored
//! quantities. Re-submitting the same lines is therefore always possible,
//! even when the slip took the last unit.
//!
//! ```text
//!   stock 0  (slip holds 5)
//!      │  release old lines      → stock 5
//!      │  reserve new lines (5)  → stock 0
//!      ▼
//!   net change 0
//! ```
//!
//! Cancelling restores the lines as they stood before the edit and
//! deactivates the slip's income entries. Any other edit rewrites the
//! income entry to match the slip.
//!
//! ## Timeouts
//! Every request runs under [`EngineSettings::request_timeout`]. When it
//! expires the request future is dropped; the open unit of work goes with
//! it and SQLite rolls the transaction back.
//!
//! [`EngineSettings::request_timeout`]: crate::config::EngineSettings::request_timeout

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use stockslip_core::delta::stock_delta;
use stockslip_core::history::{summarize_history, BucketSize, CustomerHistory};
use stockslip_core::pricing::{price_line, PricingRules};
use stockslip_core::request::{CreateSaleRequest, EditSaleRequest, LineRequest};
use stockslip_core::validation::{
    validate_classification, validate_create_sale, validate_customer_name, validate_edit_sale,
};
use stockslip_core::{CoreError, Item, PricedLine, SaleRecord, SlipStatus};
use stockslip_db::repository::slip::generate_slip_id;
use stockslip_db::{Database, DbError, IncomeRepository, SlipRepository, StockLedger, UnitOfWork};

use crate::config::EngineConfig;
use crate::error::{FulfillmentError, FulfillmentResult};

/// Stock one slip takes from one item.
#[derive(Debug)]
struct Reservation {
    item: Item,
    quantity: i64,
}

/// Priced lines plus the reservations they need, computed before any
/// write.
#[derive(Debug)]
struct LinePlan {
    lines: Vec<PricedLine>,
    reservations: Vec<Reservation>,
}

/// The order fulfillment transaction engine.
///
/// Cheap to clone; clones share the database pool.
#[derive(Debug, Clone)]
pub struct FulfillmentEngine {
    db: Database,
    ledger: StockLedger,
    pricing: PricingRules,
    request_timeout: Duration,
}

impl FulfillmentEngine {
    /// Creates an engine on an open database.
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        FulfillmentEngine {
            db,
            ledger: StockLedger::new(config.engine.resolution_policy),
            pricing: config.pricing.clone(),
            request_timeout: config.engine.request_timeout(),
        }
    }

    /// Opens the configured database (running migrations) and creates an
    /// engine on it.
    pub async fn connect(config: &EngineConfig) -> FulfillmentResult<Self> {
        let db = Database::new(config.database.to_db_config()).await?;
        Ok(Self::new(db, config))
    }

    /// Overrides the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn pricing(&self) -> &PricingRules {
        &self.pricing
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Records a new sale.
    ///
    /// ## Errors
    /// - `Validation` - malformed request
    /// - `NotFound` - a line matches no active item
    /// - `AmbiguousItem` - several matches under strict resolution
    /// - `InsufficientStock` - an item cannot cover the summed quantity
    /// - `TransactionAbort` - the store failed; nothing was committed
    pub async fn create_sale(&self, request: CreateSaleRequest) -> FulfillmentResult<SaleRecord> {
        validate_create_sale(&request)?;
        self.bounded("create_sale", self.run_create(&request)).await
    }

    /// Edits a sale: partial update of header fields, full replacement of
    /// lines when given, cancellation when `status` is `cancelled`.
    pub async fn edit_sale(
        &self,
        slip_id: &str,
        request: EditSaleRequest,
    ) -> FulfillmentResult<SaleRecord> {
        validate_edit_sale(&request)?;
        self.bounded("edit_sale", self.run_edit(slip_id, &request)).await
    }

    /// Cancels a sale. Cancelling a cancelled slip returns it unchanged.
    pub async fn cancel_sale(&self, slip_id: &str) -> FulfillmentResult<SaleRecord> {
        self.edit_sale(slip_id, EditSaleRequest::cancel()).await
    }

    /// Purchase history of one customer, bucketed by week or month.
    ///
    /// The name matches case-insensitively; cancelled slips are left out.
    pub async fn customer_history(
        &self,
        customer_name: &str,
        bucket_size: BucketSize,
    ) -> FulfillmentResult<CustomerHistory> {
        validate_customer_name(customer_name)?;

        let slips = self
            .bounded("customer_history", async {
                self.db
                    .slips()
                    .list_by_customer(customer_name.trim())
                    .await
                    .map_err(FulfillmentError::from)
            })
            .await?;

        Ok(summarize_history(customer_name, &slips, bucket_size))
    }

    // =========================================================================
    // Unit of Work
    // =========================================================================

    async fn bounded<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = FulfillmentResult<T>>,
    ) -> FulfillmentResult<T> {
        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Request timed out, unit of work rolled back"
                );
                Err(FulfillmentError::abort(format!(
                    "{} timed out after {:?}",
                    operation, self.request_timeout
                )))
            }
        }
    }

    /// Commits on success, rolls back on failure.
    async fn finish<T>(uow: UnitOfWork, result: FulfillmentResult<T>) -> FulfillmentResult<T> {
        match result {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let id = uow.id().to_string();
                if let Err(rollback) = uow.abort().await {
                    warn!(uow = %id, error = %rollback, "Rollback failed");
                }
                warn!(uow = %id, error = %err, "Unit of work aborted");
                Err(err)
            }
        }
    }

    async fn run_create(&self, request: &CreateSaleRequest) -> FulfillmentResult<SaleRecord> {
        let mut uow = self.db.begin().await?;
        let result = self.create_in(&mut uow, request).await;
        Self::finish(uow, result).await
    }

    async fn run_edit(&self, slip_id: &str, request: &EditSaleRequest) -> FulfillmentResult<SaleRecord> {
        let mut uow = self.db.begin().await?;
        let result = self.edit_in(&mut uow, slip_id, request).await;
        Self::finish(uow, result).await
    }

    // =========================================================================
    // Create
    // =========================================================================

    async fn create_in(
        &self,
        uow: &mut UnitOfWork,
        request: &CreateSaleRequest,
    ) -> FulfillmentResult<SaleRecord> {
        let now = Utc::now();

        let LinePlan {
            lines,
            reservations,
        } = self.plan_lines(uow.conn(), &request.lines).await?;

        let slip = SaleRecord {
            id: generate_slip_id(),
            slip_number: SlipRepository::next_slip_number(uow.conn(), now).await?,
            customer_name: request.customer_name.trim().to_string(),
            customer_phone: request.customer_phone.clone(),
            payment_method: request.payment_method.unwrap_or_default(),
            notes: request.notes.clone(),
            subtotal_cents: request.subtotal_cents.unwrap_or_default(),
            tax_cents: request.tax_cents.unwrap_or_default(),
            discount_cents: request.discount_cents.unwrap_or_default(),
            total_cents: request.total_amount_cents.unwrap_or_default(),
            status: request.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            lines,
        };

        SlipRepository::insert(uow.conn(), &slip).await?;
        Self::apply_reservations(uow.conn(), &reservations).await?;
        IncomeRepository::insert_mirror(uow.conn(), &slip, now).await?;

        info!(
            uow = %uow.id(),
            slip_id = %slip.id,
            slip_number = %slip.slip_number,
            lines = slip.lines.len(),
            units = slip.units(),
            total_cents = slip.total_cents,
            "Sale created"
        );

        Ok(slip)
    }

    // =========================================================================
    // Edit / Cancel
    // =========================================================================

    async fn edit_in(
        &self,
        uow: &mut UnitOfWork,
        slip_id: &str,
        request: &EditSaleRequest,
    ) -> FulfillmentResult<SaleRecord> {
        let now = Utc::now();

        let mut slip = SlipRepository::find_by_id(uow.conn(), slip_id)
            .await?
            .ok_or_else(|| CoreError::SlipNotFound(slip_id.to_string()))?;

        if slip.is_cancelled() {
            return Self::edit_cancelled(uow, slip, request, now).await;
        }

        let cancelling = request.is_cancellation();
        let old_lines = slip.lines.clone();

        if cancelling || request.lines.is_some() {
            self.restore_lines(uow.conn(), &old_lines).await?;
        }

        let mut reservations = Vec::new();
        if let Some(new_lines) = &request.lines {
            // A cancelled slip holds no stock: resolve and price, reserve nothing.
            let lines = if cancelling {
                self.price_against_catalog(uow.conn(), new_lines).await?.lines
            } else {
                let plan = self.plan_lines(uow.conn(), new_lines).await?;
                reservations = plan.reservations;
                plan.lines
            };

            let delta = stock_delta(&old_lines, &lines);
            debug!(
                slip_id = %slip.id,
                net_units = delta.net_units(),
                unchanged = delta.is_zero(),
                "Replacing slip lines"
            );

            SlipRepository::replace_lines(uow.conn(), &slip.id, &lines).await?;
            slip.lines = lines;
        }

        apply_fields(&mut slip, request);
        if cancelling {
            slip.status = SlipStatus::Cancelled;
            slip.cancelled_at = Some(now);
        } else if let Some(status) = request.status {
            slip.status = status;
        }
        slip.updated_at = now;

        SlipRepository::update(uow.conn(), &slip).await?;
        Self::apply_reservations(uow.conn(), &reservations).await?;

        if cancelling {
            let deactivated = IncomeRepository::deactivate_for_slip(uow.conn(), &slip, now).await?;
            info!(
                uow = %uow.id(),
                slip_id = %slip.id,
                slip_number = %slip.slip_number,
                restored_lines = old_lines.len(),
                income_entries = deactivated,
                "Sale cancelled"
            );
        } else {
            IncomeRepository::rewrite_for_slip(uow.conn(), &slip, now).await?;
            info!(
                uow = %uow.id(),
                slip_id = %slip.id,
                slip_number = %slip.slip_number,
                lines_replaced = request.lines.is_some(),
                total_cents = slip.total_cents,
                "Sale edited"
            );
        }

        Ok(slip)
    }

    /// Edits of a slip that is already cancelled.
    ///
    /// Only header fields may change; lines and status are frozen. A bare
    /// cancellation is a no-op.
    async fn edit_cancelled(
        uow: &mut UnitOfWork,
        mut slip: SaleRecord,
        request: &EditSaleRequest,
        now: DateTime<Utc>,
    ) -> FulfillmentResult<SaleRecord> {
        let reopening = matches!(request.status, Some(status) if status != SlipStatus::Cancelled);

        if request.lines.is_some() || reopening {
            return Err(CoreError::InvalidSlipStatus {
                slip_id: slip.id.clone(),
                current_status: SlipStatus::Cancelled.to_string(),
            }
            .into());
        }

        if !has_field_changes(request) {
            debug!(slip_id = %slip.id, "Slip already cancelled, nothing to do");
            return Ok(slip);
        }

        apply_fields(&mut slip, request);
        slip.updated_at = now;
        SlipRepository::update(uow.conn(), &slip).await?;

        info!(slip_id = %slip.id, "Cancelled slip details edited");
        Ok(slip)
    }

    // =========================================================================
    // Ledger Steps
    // =========================================================================

    /// Resolves every line, sums quantities per item, checks availability
    /// and prices the lines. Writes nothing.
    async fn plan_lines(
        &self,
        conn: &mut SqliteConnection,
        requests: &[LineRequest],
    ) -> FulfillmentResult<LinePlan> {
        let plan = self.price_against_catalog(conn, requests).await?;

        for reservation in &plan.reservations {
            StockLedger::ensure_available(&reservation.item, reservation.quantity)?;
        }

        Ok(plan)
    }

    /// Resolution, catalog classification and pricing, without the stock
    /// check.
    async fn price_against_catalog(
        &self,
        conn: &mut SqliteConnection,
        requests: &[LineRequest],
    ) -> FulfillmentResult<LinePlan> {
        let mut lines = Vec::with_capacity(requests.len());
        let mut reservations: BTreeMap<String, Reservation> = BTreeMap::new();

        for request in requests {
            let item = self.ledger.resolve(conn, &request.product_name).await?;

            let line = request.with_catalog_classification(&item.classification);
            validate_classification(&line.classification())?;
            lines.push(price_line(&line, &self.pricing));

            reservations
                .entry(item.id.clone())
                .and_modify(|r| r.quantity += request.quantity)
                .or_insert(Reservation {
                    item,
                    quantity: request.quantity,
                });
        }

        Ok(LinePlan {
            lines,
            reservations: reservations.into_values().collect(),
        })
    }

    async fn apply_reservations(
        conn: &mut SqliteConnection,
        reservations: &[Reservation],
    ) -> FulfillmentResult<()> {
        for reservation in reservations {
            let item = StockLedger::decrement(conn, &reservation.item, reservation.quantity).await?;
            debug!(
                item = %item.name,
                taken = reservation.quantity,
                remaining = item.quantity,
                "Stock reserved"
            );
        }
        Ok(())
    }

    /// Hands every line's quantity back to the ledger.
    ///
    /// A line whose item has left the catalog is skipped with a warning.
    async fn restore_lines(
        &self,
        conn: &mut SqliteConnection,
        lines: &[PricedLine],
    ) -> FulfillmentResult<()> {
        for line in lines {
            match self.ledger.release(conn, &line.product_name, line.quantity).await {
                Ok(item) => debug!(
                    item = %item.name,
                    returned = line.quantity,
                    available = item.quantity,
                    "Stock restored"
                ),
                Err(DbError::Domain(CoreError::ItemNotFound(reference))) => warn!(
                    reference = %reference,
                    quantity = line.quantity,
                    "Item no longer in catalog, stock not restored"
                ),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn apply_fields(slip: &mut SaleRecord, request: &EditSaleRequest) {
    if let Some(name) = &request.customer_name {
        slip.customer_name = name.trim().to_string();
    }
    if let Some(phone) = &request.customer_phone {
        slip.customer_phone = Some(phone.clone());
    }
    if let Some(method) = request.payment_method {
        slip.payment_method = method;
    }
    if let Some(notes) = &request.notes {
        slip.notes = Some(notes.clone());
    }
    if let Some(subtotal) = request.subtotal_cents {
        slip.subtotal_cents = subtotal;
    }
    if let Some(tax) = request.tax_cents {
        slip.tax_cents = tax;
    }
    if let Some(discount) = request.discount_cents {
        slip.discount_cents = discount;
    }
    if let Some(total) = request.total_amount_cents {
        slip.total_cents = total;
    }
}

fn has_field_changes(request: &EditSaleRequest) -> bool {
    request.customer_name.is_some()
        || request.customer_phone.is_some()
        || request.payment_method.is_some()
        || request.notes.is_some()
        || request.subtotal_cents.is_some()
        || request.tax_cents.is_some()
        || request.discount_cents.is_some()
        || request.total_amount_cents.is_some()
}

//! # Customer History
//!
//! Rolls a customer's committed slips up into weekly or monthly buckets.
//!
//! Read path only: the input is whatever slips the store returns for the
//! customer, the output is a summary. Cancelled slips are skipped.
//!
//! ```text
//!   slips (any order)          buckets (ascending)
//!   ───────────────────        ──────────────────────────────────────
//!   2026-10-02  120.00   ─┐    2026-10  slips 2  units 7  gross 170.00
//!   2026-10-15   50.00   ─┘    2026-11  slips 1  units 1  gross  20.00
//!   2026-11-03   20.00   ──
//!   2026-11-09   (cancelled)   skipped
//! ```

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::SaleRecord;

/// Bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BucketSize {
    /// ISO weeks, starting Monday.
    Week,
    #[default]
    Month,
}

impl BucketSize {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            BucketSize::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            BucketSize::Month => date - Duration::days(i64::from(date.day0())),
        }
    }

    /// Display label: `2026-W42` or `2026-10`.
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            BucketSize::Week => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            BucketSize::Month => format!("{}-{:02}", start.year(), start.month()),
        }
    }
}

/// Totals for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistoryBucket {
    pub label: String,
    #[ts(as = "String")]
    pub start: NaiveDate,
    pub slip_count: i64,
    pub units: i64,
    pub gross_cents: i64,
    pub discount_cents: i64,
}

/// A customer's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerHistory {
    pub customer_name: String,
    pub bucket_size: BucketSize,
    pub buckets: Vec<HistoryBucket>,
    pub total_slips: i64,
    pub total_spent_cents: i64,
}

impl CustomerHistory {
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

/// Summarizes `slips` for `customer_name`.
///
/// Gross is the slip's `total_amount`; discount is the sum of its line
/// discounts.
pub fn summarize_history(
    customer_name: &str,
    slips: &[SaleRecord],
    bucket_size: BucketSize,
) -> CustomerHistory {
    let mut buckets: BTreeMap<NaiveDate, HistoryBucket> = BTreeMap::new();

    for slip in slips.iter().filter(|s| !s.is_cancelled()) {
        let start = bucket_size.bucket_start(slip.created_at.date_naive());
        let bucket = buckets.entry(start).or_insert_with(|| HistoryBucket {
            label: bucket_size.label(start),
            start,
            slip_count: 0,
            units: 0,
            gross_cents: 0,
            discount_cents: 0,
        });

        bucket.slip_count += 1;
        bucket.units += slip.units();
        bucket.gross_cents += slip.total_cents;
        bucket.discount_cents += slip.lines_discount().cents();
    }

    let buckets: Vec<HistoryBucket> = buckets.into_values().collect();

    CustomerHistory {
        customer_name: customer_name.trim().to_string(),
        bucket_size,
        total_slips: buckets.iter().map(|b| b.slip_count).sum(),
        total_spent_cents: buckets.iter().map(|b| b.gross_cents).sum(),
        buckets,
    }
}

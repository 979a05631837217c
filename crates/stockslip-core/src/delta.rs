//! # Stock Delta
//!
//! Net stock movement between two versions of a slip.
//!
//! An edit is executed as "release every old line, then reserve every new
//! line". [`StockDelta`] is the same change seen as one subtraction:
//!
//! ```text
//!   old:  Aster Cover × 4,  Honda Plate × 1
//!   new:  Aster Cover × 6
//!   ─────────────────────────────────────────
//!   delta: aster cover +2   (two more units leave the ledger)
//!          honda plate −1   (one unit comes back)
//! ```
//!
//! Keys are the lines' product references, trimmed and lower-cased, since
//! that is what resolution matches on.

use std::collections::BTreeMap;

use crate::types::PricedLine;

/// Per-reference change in reserved units (`new − old`).
///
/// Positive entries leave the ledger, negative entries return to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDelta {
    changes: BTreeMap<String, i64>,
}

fn reference_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl StockDelta {
    /// Delta between two sets of `(reference, quantity)` pairs.
    pub fn from_quantities<'a, O, N>(old: O, new: N) -> Self
    where
        O: IntoIterator<Item = (&'a str, i64)>,
        N: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut changes: BTreeMap<String, i64> = BTreeMap::new();

        for (name, qty) in old {
            *changes.entry(reference_key(name)).or_default() -= qty;
        }
        for (name, qty) in new {
            *changes.entry(reference_key(name)).or_default() += qty;
        }

        changes.retain(|_, qty| *qty != 0);
        StockDelta { changes }
    }

    /// Change for one product reference (0 when untouched).
    pub fn get(&self, reference: &str) -> i64 {
        self.changes
            .get(&reference_key(reference))
            .copied()
            .unwrap_or(0)
    }

    /// True when the edit leaves every ledger quantity where it was.
    pub fn is_zero(&self) -> bool {
        self.changes.is_empty()
    }

    /// Net units leaving the ledger across all references.
    pub fn net_units(&self) -> i64 {
        self.changes.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Delta between the lines of a slip before and after an edit.
pub fn stock_delta(old: &[PricedLine], new: &[PricedLine]) -> StockDelta {
    StockDelta::from_quantities(
        old.iter().map(|l| (l.product_name.as_str(), l.quantity)),
        new.iter().map(|l| (l.product_name.as_str(), l.quantity)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_lines_net_to_zero() {
        let old = [("Aster Cover", 4), ("Honda Plate", 1)];
        let delta = StockDelta::from_quantities(old, old);
        assert!(delta.is_zero());
        assert_eq!(delta.net_units(), 0);
    }

    #[test]
    fn test_changed_quantities() {
        let delta = StockDelta::from_quantities(
            [("Aster Cover", 4), ("Honda Plate", 1)],
            [("aster cover ", 6)],
        );

        assert_eq!(delta.get("Aster Cover"), 2);
        assert_eq!(delta.get("honda plate"), -1);
        assert_eq!(delta.get("Calendar Cover"), 0);
        assert_eq!(delta.net_units(), 1);
        assert_eq!(delta.iter().count(), 2);
    }

    #[test]
    fn test_split_lines_aggregate() {
        let delta = StockDelta::from_quantities([("Form A4", 5)], [("Form A4", 2), ("FORM A4", 3)]);
        assert!(delta.is_zero());
    }
}

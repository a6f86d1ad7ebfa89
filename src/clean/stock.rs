//! Stock evidence: does the stock history explain a low demand reading?
//!
//! Stock records are indexed once per SKU into:
//! - the set of calendar months holding at least one low (null / zero / below
//!   threshold) record
//! - the sorted dates of replenished records (level at or above threshold)
//!
//! Every query is then a set lookup or a binary search.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::clean::{months_after, months_before};
use crate::domain::{CleanConfig, DemandObservation, StockObservation, YearMonth};

/// Stock evidence for a single SKU.
#[derive(Debug, Clone, Default)]
pub struct StockEvidence {
    low_months: HashSet<YearMonth>,
    replenished: Vec<NaiveDate>,
    horizon_months: Option<u32>,
}

impl StockEvidence {
    pub fn build<'a>(records: impl IntoIterator<Item = &'a StockObservation>, config: &CleanConfig) -> Self {
        let threshold = config.low_stock_threshold;
        let mut low_months = HashSet::new();
        let mut replenished = Vec::new();

        for rec in records {
            if rec.is_low(threshold) {
                low_months.insert(YearMonth::of(rec.date));
            }
            if rec.is_replenished(threshold) {
                replenished.push(rec.date);
            }
        }
        replenished.sort_unstable();

        Self {
            low_months,
            replenished,
            horizon_months: config.replenishment_horizon_months,
        }
    }

    /// A low record exists in `month`.
    pub fn is_low_month(&self, month: YearMonth) -> bool {
        self.low_months.contains(&month)
    }

    /// A low record exists in the month of `date` or the month before it.
    pub fn has_low_stock_nearby(&self, date: NaiveDate) -> bool {
        let month = YearMonth::of(date);
        self.is_low_month(month) || self.is_low_month(month.prev())
    }

    /// A replenished record exists strictly after `date`.
    ///
    /// With a horizon configured the record must also fall on or before
    /// `date + horizon`.
    pub fn has_future_replenishment(&self, date: NaiveDate) -> bool {
        let first_after = self.replenished.partition_point(|d| *d <= date);
        let Some(next) = self.replenished.get(first_after) else {
            return false;
        };
        match self.horizon_months {
            None => true,
            Some(h) => *next <= months_after(date, h),
        }
    }

    /// Distinct months in the trailing `lookback_months` before `date` holding a
    /// zero-demand observation of this SKU that coincides with a low stock month.
    ///
    /// `history` must be the SKU's own observations; order does not matter. The
    /// engine derives the same count incrementally through `WindowCursor`.
    pub fn stockout_months_in_trailing_window<'a>(
        &self,
        date: NaiveDate,
        lookback_months: u32,
        history: impl IntoIterator<Item = &'a DemandObservation>,
    ) -> usize {
        let cutoff = months_before(date, lookback_months);
        history
            .into_iter()
            .filter(|o| o.date < date && o.date > cutoff && o.original_demand == 0.0)
            .map(|o| YearMonth::of(o.date))
            .filter(|m| self.is_low_month(*m))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Stock evidence for every SKU of a batch.
#[derive(Debug, Clone, Default)]
pub struct StockIndex {
    by_sku: HashMap<String, StockEvidence>,
    empty: StockEvidence,
}

impl StockIndex {
    pub fn build(records: &[StockObservation], config: &CleanConfig) -> Self {
        let mut grouped: HashMap<&str, Vec<&StockObservation>> = HashMap::new();
        for rec in records {
            grouped.entry(rec.sku.as_str()).or_default().push(rec);
        }

        let by_sku = grouped
            .into_iter()
            .map(|(sku, recs)| (sku.to_string(), StockEvidence::build(recs, config)))
            .collect();

        Self {
            by_sku,
            empty: StockEvidence {
                horizon_months: config.replenishment_horizon_months,
                ..StockEvidence::default()
            },
        }
    }

    /// Evidence for `sku`; SKUs without stock records get an empty set.
    pub fn for_sku(&self, sku: &str) -> &StockEvidence {
        self.by_sku.get(sku).unwrap_or(&self.empty)
    }

    pub fn sku_count(&self) -> usize {
        self.by_sku.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stock(date: NaiveDate, level: Option<f64>) -> StockObservation {
        StockObservation::new("SKU1", date, level)
    }

    #[test]
    fn low_stock_nearby_checks_current_and_previous_month() {
        let cfg = CleanConfig::default();
        let recs = [stock(ymd(2024, 2, 10), Some(2.0))];
        let ev = StockEvidence::build(&recs, &cfg);

        assert!(ev.has_low_stock_nearby(ymd(2024, 2, 28)));
        assert!(ev.has_low_stock_nearby(ymd(2024, 3, 1)));
        assert!(!ev.has_low_stock_nearby(ymd(2024, 4, 1)));
        assert!(!ev.has_low_stock_nearby(ymd(2024, 1, 31)));
    }

    #[test]
    fn null_stock_counts_as_low() {
        let cfg = CleanConfig::default();
        let recs = [stock(ymd(2023, 12, 5), None)];
        let ev = StockEvidence::build(&recs, &cfg);
        assert!(ev.has_low_stock_nearby(ymd(2024, 1, 5)));
    }

    #[test]
    fn future_replenishment_is_strictly_after_and_unbounded() {
        let cfg = CleanConfig::default();
        let recs = [
            stock(ymd(2024, 1, 1), Some(10.0)),
            stock(ymd(2026, 6, 1), Some(4.0)),
            stock(ymd(2024, 3, 1), Some(3.0)),
        ];
        let ev = StockEvidence::build(&recs, &cfg);

        assert!(ev.has_future_replenishment(ymd(2024, 1, 1)));
        assert!(ev.has_future_replenishment(ymd(2026, 5, 31)));
        assert!(!ev.has_future_replenishment(ymd(2026, 6, 1)));
    }

    #[test]
    fn replenishment_horizon_bounds_look_ahead() {
        let cfg = CleanConfig {
            replenishment_horizon_months: Some(2),
            ..CleanConfig::default()
        };
        let recs = [stock(ymd(2024, 6, 15), Some(20.0))];
        let ev = StockEvidence::build(&recs, &cfg);

        assert!(ev.has_future_replenishment(ymd(2024, 4, 15)));
        assert!(!ev.has_future_replenishment(ymd(2024, 4, 14)));
    }

    #[test]
    fn huge_horizon_still_looks_forward() {
        let cfg = CleanConfig {
            replenishment_horizon_months: Some(3_000_000_000),
            ..CleanConfig::default()
        };
        let recs = [stock(ymd(2024, 3, 1), Some(50.0))];
        let ev = StockEvidence::build(&recs, &cfg);

        assert!(ev.has_future_replenishment(ymd(2024, 2, 1)));
        assert!(!ev.has_future_replenishment(ymd(2024, 3, 1)));
    }

    #[test]
    fn stockout_months_need_zero_demand_and_low_stock_in_same_month() {
        let cfg = CleanConfig::default();
        let recs = [
            stock(ymd(2024, 1, 20), Some(0.0)),
            stock(ymd(2024, 3, 20), None),
            stock(ymd(2024, 5, 20), Some(50.0)),
        ];
        let ev = StockEvidence::build(&recs, &cfg);

        let history = [
            DemandObservation::new("SKU1", ymd(2024, 1, 3), 0.0),
            DemandObservation::new("SKU1", ymd(2024, 1, 10), 0.0),
            DemandObservation::new("SKU1", ymd(2024, 2, 3), 0.0), // no low stock in Feb
            DemandObservation::new("SKU1", ymd(2024, 3, 3), 0.0),
            DemandObservation::new("SKU1", ymd(2024, 4, 3), 5.0),
            DemandObservation::new("SKU1", ymd(2024, 5, 3), 0.0), // healthy stock in May
        ];

        assert_eq!(ev.stockout_months_in_trailing_window(ymd(2024, 6, 1), 12, &history), 2);
        // Only rows strictly before the reference date count.
        assert_eq!(ev.stockout_months_in_trailing_window(ymd(2024, 3, 3), 12, &history), 1);
        // A 3-month lookback from May 3 starts after Feb 3, leaving only March.
        assert_eq!(ev.stockout_months_in_trailing_window(ymd(2024, 5, 3), 3, &history), 1);
    }

    #[test]
    fn index_falls_back_to_empty_evidence() {
        let cfg = CleanConfig::default();
        let recs = [stock(ymd(2024, 1, 1), Some(0.0))];
        let index = StockIndex::build(&recs, &cfg);

        assert_eq!(index.sku_count(), 1);
        assert!(index.for_sku("SKU1").has_low_stock_nearby(ymd(2024, 1, 9)));
        assert!(!index.for_sku("OTHER").has_low_stock_nearby(ymd(2024, 1, 9)));
        assert!(!index.for_sku("OTHER").has_future_replenishment(ymd(2000, 1, 1)));
    }
}

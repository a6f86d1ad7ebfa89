//! Reporting utilities: run summaries and per-SKU explanations.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{TracedRow, YearMonth};

pub mod format;

pub use format::*;

/// Correction counts for a single SKU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkuSummary {
    pub sku: String,
    pub rows: usize,
    pub imputed: usize,
    pub capped: usize,
    /// Sum of `cleaned - floor` over imputed rows.
    pub units_added: f64,
    /// Sum of `floor - cleaned` over capped rows.
    pub units_removed: f64,
    pub real: f64,
    pub clean: f64,
    /// Sum of `max(0, cleaned - floor)` over every row.
    pub lost: f64,
}

impl SkuSummary {
    pub fn corrections(&self) -> usize {
        self.imputed + self.capped
    }
}

/// Real, clean and lost units of one calendar month (all SKUs).
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub real: f64,
    pub clean: f64,
    pub lost: f64,
}

impl MonthSummary {
    /// Lost units as a share of clean demand, in percent.
    pub fn stockout_rate(&self) -> f64 {
        if self.clean > 0.0 { self.lost / self.clean * 100.0 } else { 0.0 }
    }
}

/// Aggregate over a cleaning run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rows: usize,
    pub imputed: usize,
    pub capped: usize,
    pub units_added: f64,
    pub units_removed: f64,
    pub real: f64,
    pub clean: f64,
    pub lost: f64,
    /// Per-SKU breakdown, most corrected first.
    pub skus: Vec<SkuSummary>,
    /// Per-month totals, oldest first.
    pub months: Vec<MonthSummary>,
}

impl RunSummary {
    /// Lost units over the demand the business would have seen, in percent:
    /// `lost / (real + lost) * 100`.
    pub fn stockout_rate(&self) -> f64 {
        let denom = self.real + self.lost;
        if denom > 0.0 { self.lost / denom * 100.0 } else { 0.0 }
    }

    /// The `n` SKUs with the most clean demand.
    pub fn top_by_clean_demand(&self, n: usize) -> Vec<&SkuSummary> {
        self.ranked(n, |s| s.clean)
    }

    /// The `n` SKUs with the most lost units; SKUs without losses are left out.
    pub fn top_by_lost_units(&self, n: usize) -> Vec<&SkuSummary> {
        self.ranked(n, |s| s.lost)
            .into_iter()
            .filter(|s| s.lost > 0.0)
            .collect()
    }

    fn ranked(&self, n: usize, key: impl Fn(&SkuSummary) -> f64) -> Vec<&SkuSummary> {
        let mut ranked: Vec<&SkuSummary> = self.skus.iter().collect();
        ranked.sort_by(|a, b| key(b).total_cmp(&key(a)).then_with(|| a.sku.cmp(&b.sku)));
        ranked.truncate(n);
        ranked
    }
}

/// Summarise a traced cleaning run.
pub fn summarize(rows: &[TracedRow]) -> RunSummary {
    let mut by_sku: HashMap<&str, SkuSummary> = HashMap::new();
    let mut by_month: BTreeMap<YearMonth, MonthSummary> = BTreeMap::new();

    for row in rows {
        let c = &row.cleaned;
        let entry = by_sku.entry(c.sku.as_str()).or_insert_with(|| SkuSummary {
            sku: c.sku.clone(),
            ..SkuSummary::default()
        });
        entry.rows += 1;

        let clean = c.cleaned_demand as f64;
        let delta = clean - c.demand_floor;
        let lost = delta.max(0.0);
        entry.real += c.demand_floor;
        entry.clean += clean;
        entry.lost += lost;

        let month = YearMonth::of(c.date);
        let totals = by_month.entry(month).or_insert(MonthSummary {
            month,
            real: 0.0,
            clean: 0.0,
            lost: 0.0,
        });
        totals.real += c.demand_floor;
        totals.clean += clean;
        totals.lost += lost;

        if row.trace.action.is_imputed() {
            entry.imputed += 1;
            entry.units_added += delta.max(0.0);
        }
        if row.trace.action.is_capped() {
            entry.capped += 1;
            entry.units_removed += (-delta).max(0.0);
        }
    }

    let mut skus: Vec<SkuSummary> = by_sku.into_values().collect();
    skus.sort_by(|a, b| b.corrections().cmp(&a.corrections()).then_with(|| a.sku.cmp(&b.sku)));

    RunSummary {
        rows: rows.len(),
        imputed: skus.iter().map(|s| s.imputed).sum(),
        capped: skus.iter().map(|s| s.capped).sum(),
        units_added: skus.iter().map(|s| s.units_added).sum(),
        units_removed: skus.iter().map(|s| s.units_removed).sum(),
        real: skus.iter().map(|s| s.real).sum(),
        clean: skus.iter().map(|s| s.clean).sum(),
        lost: skus.iter().map(|s| s.lost).sum(),
        skus,
        months: by_month.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanAction, CleanedDemand, CleaningTrace};
    use chrono::NaiveDate;

    pub(crate) fn traced(sku: &str, day: u32, floor: f64, cleaned: u64, action: CleanAction) -> TracedRow {
        traced_on(sku, NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), floor, cleaned, action)
    }

    pub(crate) fn traced_on(sku: &str, date: NaiveDate, floor: f64, cleaned: u64, action: CleanAction) -> TracedRow {
        TracedRow {
            cleaned: CleanedDemand {
                sku: sku.to_string(),
                date,
                demand_floor: floor,
                cleaned_demand: cleaned,
            },
            trace: CleaningTrace {
                p_low: 5.0,
                p_impute: 10.0,
                p_cap: 40.0,
                window_len: 24,
                recent_positive: true,
                stockout_months: 0,
                low_stock_nearby: false,
                future_replenished: false,
                recent_period: false,
                action,
            },
        }
    }

    #[test]
    fn summary_counts_and_orders_by_corrections() {
        let rows = vec![
            traced("A", 1, 1.0, 10, CleanAction::Imputed),
            traced("B", 1, 90.0, 40, CleanAction::Capped),
            traced("B", 2, 0.0, 10, CleanAction::Imputed),
            traced("C", 1, 7.0, 7, CleanAction::Kept),
        ];
        let summary = summarize(&rows);

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.imputed, 2);
        assert_eq!(summary.capped, 1);
        assert!((summary.units_added - 19.0).abs() < 1e-12);
        assert!((summary.units_removed - 50.0).abs() < 1e-12);

        let order: Vec<&str> = summary.skus.iter().map(|s| s.sku.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn lost_units_count_every_row_not_only_imputed_ones() {
        let rows = vec![
            traced("A", 1, 2.0, 10, CleanAction::Imputed),
            // Rounding up a fractional floor also counts as lost demand.
            traced("A", 2, 4.5, 5, CleanAction::Kept),
            traced("B", 1, 90.0, 40, CleanAction::Capped),
        ];
        let summary = summarize(&rows);

        assert!((summary.real - 96.5).abs() < 1e-12);
        assert!((summary.clean - 55.0).abs() < 1e-12);
        assert!((summary.lost - 8.5).abs() < 1e-12);
        assert!((summary.units_added - 8.0).abs() < 1e-12);
        // 8.5 / (96.5 + 8.5)
        assert!((summary.stockout_rate() - 100.0 * 8.5 / 105.0).abs() < 1e-9);
        assert_eq!(summarize(&[]).stockout_rate(), 0.0);
    }

    #[test]
    fn months_are_aggregated_oldest_first() {
        let d = |m: u32, day: u32| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let rows = vec![
            traced_on("A", d(3, 4), 0.0, 10, CleanAction::Imputed),
            traced_on("B", d(1, 8), 5.0, 5, CleanAction::Kept),
            traced_on("A", d(3, 11), 6.0, 6, CleanAction::Kept),
            traced_on("A", d(1, 15), 7.0, 7, CleanAction::Kept),
        ];
        let summary = summarize(&rows);

        let months: Vec<String> = summary.months.iter().map(|m| m.month.to_string()).collect();
        assert_eq!(months, vec!["2024-01", "2024-03"]);
        assert_eq!(summary.months[0].real, 12.0);
        assert_eq!(summary.months[0].stockout_rate(), 0.0);
        assert_eq!(summary.months[1].clean, 16.0);
        assert_eq!(summary.months[1].lost, 10.0);
        assert!((summary.months[1].stockout_rate() - 62.5).abs() < 1e-12);
    }

    #[test]
    fn rankings_by_clean_demand_and_lost_units() {
        let rows = vec![
            traced("A", 1, 0.0, 10, CleanAction::Imputed),
            traced("B", 1, 50.0, 50, CleanAction::Kept),
            traced("C", 1, 20.0, 20, CleanAction::Kept),
            traced("D", 1, 1.0, 4, CleanAction::Imputed),
        ];
        let summary = summarize(&rows);

        let by_demand: Vec<&str> = summary.top_by_clean_demand(3).iter().map(|s| s.sku.as_str()).collect();
        assert_eq!(by_demand, vec!["B", "C", "A"]);

        let by_lost: Vec<&str> = summary.top_by_lost_units(10).iter().map(|s| s.sku.as_str()).collect();
        assert_eq!(by_lost, vec!["A", "D"]);
    }
}

//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - built by the CSV ingest layer or by an upstream caller
//! - passed through the cleaning engine by reference
//! - exported to CSV/JSON

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

/// Serialization format for cleaned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    /// Pretty-printed JSON array.
    Json,
}

/// A raw demand observation for one SKU at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandObservation {
    pub sku: String,
    pub date: NaiveDate,
    /// Recorded demand for the period (0 when the source value was missing).
    pub original_demand: f64,
}

impl DemandObservation {
    pub fn new(sku: impl Into<String>, date: NaiveDate, original_demand: f64) -> Self {
        Self {
            sku: sku.into(),
            date,
            original_demand,
        }
    }
}

/// A stock snapshot for one SKU at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockObservation {
    pub sku: String,
    pub date: NaiveDate,
    /// On-hand stock; `None` means the level was not recorded.
    pub stock_level: Option<f64>,
}

impl StockObservation {
    pub fn new(sku: impl Into<String>, date: NaiveDate, stock_level: Option<f64>) -> Self {
        Self {
            sku: sku.into(),
            date,
            stock_level,
        }
    }

    /// Null, zero, and anything below `threshold` all count as "no stock".
    pub fn is_low(&self, threshold: f64) -> bool {
        match self.stock_level {
            None => true,
            Some(v) => v <= 0.0 || v < threshold,
        }
    }

    pub fn is_replenished(&self, threshold: f64) -> bool {
        matches!(self.stock_level, Some(v) if v > 0.0 && v >= threshold)
    }
}

/// One cleaned output row per input demand row.
///
/// This is the only contract downstream consumers rely on: `cleaned_demand` is
/// the canonical demand figure and `demand_floor` the untouched raw figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDemand {
    pub sku: String,
    pub date: NaiveDate,
    pub demand_floor: f64,
    pub cleaned_demand: u64,
}

/// What the engine did to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanAction {
    Kept,
    Imputed,
    Capped,
    ImputedAndCapped,
}

impl CleanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CleanAction::Kept => "kept",
            CleanAction::Imputed => "imputed",
            CleanAction::Capped => "capped",
            CleanAction::ImputedAndCapped => "imputed_and_capped",
        }
    }

    pub fn is_imputed(self) -> bool {
        matches!(self, CleanAction::Imputed | CleanAction::ImputedAndCapped)
    }

    pub fn is_capped(self) -> bool {
        matches!(self, CleanAction::Capped | CleanAction::ImputedAndCapped)
    }
}

/// Per-row diagnostics explaining a cleaning decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningTrace {
    pub p_low: f64,
    pub p_impute: f64,
    pub p_cap: f64,
    /// Size of the trailing positive window the percentiles came from.
    pub window_len: usize,
    /// Whether the trailing-months positive window was non-empty.
    pub recent_positive: bool,
    pub stockout_months: usize,
    pub low_stock_nearby: bool,
    pub future_replenished: bool,
    pub recent_period: bool,
    pub action: CleanAction,
}

/// A cleaned row together with the reasoning behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedRow {
    pub cleaned: CleanedDemand,
    pub trace: CleaningTrace,
}

/// A calendar month. All "same month" matching goes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Tuning knobs of the cleaning engine.
///
/// The defaults reproduce the production rules: stock below 4 units is a
/// stockout, percentiles come from the last 24 positive observations, P15 flags a
/// suspiciously low value, P60 replaces it and P95 caps spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    pub low_stock_threshold: f64,
    pub trailing_positive: usize,
    pub recent_positive_months: u32,
    pub stockout_lookback_months: u32,
    /// Distinct stockout months within the lookback that confirm a pattern.
    pub min_stockout_months: usize,
    /// Number of most recent distinct months (dataset-wide) treated as "recent".
    pub recent_period_months: usize,
    pub low_percentile: f64,
    pub impute_percentile: f64,
    pub cap_percentile: f64,
    /// Optional bound on how far ahead a replenishment may be found.
    ///
    /// `None` keeps the unbounded look-ahead.
    pub replenishment_horizon_months: Option<u32>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 4.0,
            trailing_positive: 24,
            recent_positive_months: 6,
            stockout_lookback_months: 12,
            min_stockout_months: 2,
            recent_period_months: 3,
            low_percentile: 15.0,
            impute_percentile: 60.0,
            cap_percentile: 95.0,
            replenishment_horizon_months: None,
        }
    }
}

impl CleanConfig {
    pub fn validate(&self) -> Result<(), CleanError> {
        if !(self.low_stock_threshold.is_finite() && self.low_stock_threshold >= 0.0) {
            return Err(CleanError::Config(
                "low_stock_threshold must be finite and >= 0".to_string(),
            ));
        }
        if self.trailing_positive == 0 {
            return Err(CleanError::Config("trailing_positive must be > 0".to_string()));
        }
        for (name, p) in [
            ("low_percentile", self.low_percentile),
            ("impute_percentile", self.impute_percentile),
            ("cap_percentile", self.cap_percentile),
        ] {
            if !(0.0..=100.0).contains(&p) {
                return Err(CleanError::Config(format!("{name} must be within [0, 100], got {p}")));
            }
        }
        if !(self.low_percentile <= self.impute_percentile && self.impute_percentile <= self.cap_percentile) {
            return Err(CleanError::Config(
                "percentiles must satisfy low <= impute <= cap".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn year_month_prev_wraps_year() {
        let jan = YearMonth::of(ymd(2024, 1, 15));
        assert_eq!(jan.prev(), YearMonth { year: 2023, month: 12 });
        assert_eq!(YearMonth::of(ymd(2024, 7, 1)).prev().to_string(), "2024-06");
    }

    #[test]
    fn low_stock_covers_null_zero_and_below_threshold() {
        let d = ymd(2024, 1, 1);
        assert!(StockObservation::new("A", d, None).is_low(4.0));
        assert!(StockObservation::new("A", d, Some(0.0)).is_low(4.0));
        assert!(StockObservation::new("A", d, Some(3.9)).is_low(4.0));
        assert!(!StockObservation::new("A", d, Some(4.0)).is_low(4.0));

        // A zero threshold still treats zero stock as a stockout.
        assert!(StockObservation::new("A", d, Some(0.0)).is_low(0.0));
        assert!(!StockObservation::new("A", d, Some(0.0)).is_replenished(0.0));
        assert!(!StockObservation::new("A", d, None).is_replenished(4.0));
        assert!(StockObservation::new("A", d, Some(12.0)).is_replenished(4.0));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(CleanConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_out_of_order_percentiles() {
        let cfg = CleanConfig {
            impute_percentile: 99.0,
            ..CleanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CleanError::Config(_))));

        let cfg = CleanConfig {
            cap_percentile: 120.0,
            ..CleanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CleanError::Config(_))));

        let cfg = CleanConfig {
            low_stock_threshold: f64::NAN,
            ..CleanConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}

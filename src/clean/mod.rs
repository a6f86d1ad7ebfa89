//! Stockout-aware demand cleaning.
//!
//! - `stock`: per-SKU stock evidence (low-stock months, replenishments)
//! - `window`: trailing positive-demand windows over a sorted SKU history
//! - `engine`: the per-row correction and cap

use chrono::{Months, NaiveDate};

pub mod engine;
pub mod stock;
pub mod window;

pub use engine::*;
pub use stock::*;
pub use window::*;

/// `date` moved back by `months` calendar months.
///
/// Days past the end of the target month clamp to its last day
/// (31 March minus one month is 28/29 February). Out-of-range results saturate
/// to `NaiveDate::MIN`.
pub(crate) fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
}

/// `date` moved forward by `months` calendar months, saturating to `NaiveDate::MAX`.
pub(crate) fn months_after(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

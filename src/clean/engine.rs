//! Demand-correction engine.
//!
//! For every demand row we look at the SKU's own past (strictly before the row's
//! date) and at the SKU's stock records:
//!
//! ```text
//! suspicious  = demand < P15(last 24 positive)
//! corroborated = stockout months in last 12 >= 2
//!             || low stock this/prev month && (replenished later || recent period)
//! estimate    = P60 if suspicious && corroborated && positive demand in last 6 months
//!               else demand
//! cleaned     = round(min(estimate, P95))   (cap only when P95 > 0)
//! ```
//!
//! Rows are grouped by SKU, each group is sorted once and walked with a
//! `WindowCursor`, and groups run in parallel. Output order always matches input
//! order.

use std::collections::{BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use tracing::debug;

use crate::clean::stock::{StockEvidence, StockIndex};
use crate::clean::window::WindowCursor;
use crate::domain::{
    CleanAction, CleanConfig, CleanedDemand, CleaningTrace, DemandObservation, StockObservation, TracedRow, YearMonth,
};
use crate::error::CleanError;
use crate::math::percentiles;

/// Clean a batch of demand rows against a batch of stock rows.
///
/// Returns one row per input demand row, in input order.
pub fn clean(
    demand: &[DemandObservation],
    stock: &[StockObservation],
    config: &CleanConfig,
) -> Result<Vec<CleanedDemand>, CleanError> {
    Ok(clean_with_trace(demand, stock, config)?
        .into_iter()
        .map(|row| row.cleaned)
        .collect())
}

/// Like [`clean`], but keeps the per-row decision trace.
pub fn clean_with_trace(
    demand: &[DemandObservation],
    stock: &[StockObservation],
    config: &CleanConfig,
) -> Result<Vec<TracedRow>, CleanError> {
    config.validate()?;

    let recent = recent_months(demand, config.recent_period_months);
    let stock_index = StockIndex::build(stock, config);

    let mut groups: HashMap<&str, Vec<(usize, &DemandObservation)>> = HashMap::new();
    for (idx, obs) in demand.iter().enumerate() {
        groups.entry(obs.sku.as_str()).or_default().push((idx, obs));
    }
    let groups: Vec<_> = groups.into_iter().collect();

    let mut indexed: Vec<(usize, TracedRow)> = groups
        .par_iter()
        .flat_map_iter(|(sku, rows)| clean_sku(sku, rows, stock_index.for_sku(sku), &recent, config))
        .collect();
    indexed.sort_unstable_by_key(|(idx, _)| *idx);

    Ok(indexed.into_iter().map(|(_, row)| row).collect())
}

/// The `n` most recent distinct calendar months present in the demand data.
pub fn recent_months(demand: &[DemandObservation], n: usize) -> HashSet<YearMonth> {
    let months: BTreeSet<YearMonth> = demand.iter().map(|o| YearMonth::of(o.date)).collect();
    months.into_iter().rev().take(n).collect()
}

fn clean_sku(
    sku: &str,
    rows: &[(usize, &DemandObservation)],
    evidence: &StockEvidence,
    recent: &HashSet<YearMonth>,
    config: &CleanConfig,
) -> Vec<(usize, TracedRow)> {
    // Stable sort: same-date rows keep their input order.
    let mut order: Vec<(usize, &DemandObservation)> = rows.to_vec();
    order.sort_by_key(|(_, obs)| obs.date);
    let sorted: Vec<&DemandObservation> = order.iter().map(|(_, obs)| *obs).collect();

    let mut cursor = WindowCursor::new(&sorted);
    let mut out = Vec::with_capacity(order.len());
    let (mut imputed, mut capped) = (0usize, 0usize);

    for &(idx, obs) in &order {
        cursor.advance_to(obs.date, evidence);
        let row = clean_row(obs, &cursor, evidence, recent, config);
        imputed += usize::from(row.trace.action.is_imputed());
        capped += usize::from(row.trace.action.is_capped());
        out.push((idx, row));
    }

    debug!(sku, rows = out.len(), imputed, capped, "cleaned sku");
    out
}

fn clean_row(
    obs: &DemandObservation,
    cursor: &WindowCursor<'_>,
    evidence: &StockEvidence,
    recent: &HashSet<YearMonth>,
    config: &CleanConfig,
) -> TracedRow {
    let window: Vec<f64> = cursor
        .trailing_positive(config.trailing_positive)
        .iter()
        .map(|o| o.original_demand)
        .collect();
    let [p_low, p_impute, p_cap] = percentiles(
        &window,
        [config.low_percentile, config.impute_percentile, config.cap_percentile],
    );

    let recent_positive = !cursor
        .trailing_months(obs.date, config.recent_positive_months)
        .is_empty();
    let stockout_months = cursor.stockout_months(obs.date, config.stockout_lookback_months);
    let low_stock_nearby = evidence.has_low_stock_nearby(obs.date);
    let future_replenished = evidence.has_future_replenishment(obs.date);
    let recent_period = recent.contains(&YearMonth::of(obs.date));

    let suspicious = obs.original_demand < p_low;
    let corroborated = stockout_months >= config.min_stockout_months
        || (low_stock_nearby && (future_replenished || recent_period));

    let mut estimate = obs.original_demand;
    let is_imputed = suspicious && corroborated && recent_positive;
    if is_imputed {
        estimate = p_impute;
    }

    let is_capped = p_cap > 0.0 && estimate > p_cap;
    if is_capped {
        estimate = p_cap;
    }

    let action = match (is_imputed, is_capped) {
        (false, false) => CleanAction::Kept,
        (true, false) => CleanAction::Imputed,
        (false, true) => CleanAction::Capped,
        (true, true) => CleanAction::ImputedAndCapped,
    };

    TracedRow {
        cleaned: CleanedDemand {
            sku: obs.sku.clone(),
            date: obs.date,
            demand_floor: obs.original_demand,
            cleaned_demand: round_demand(estimate),
        },
        trace: CleaningTrace {
            p_low,
            p_impute,
            p_cap,
            window_len: window.len(),
            recent_positive,
            stockout_months,
            low_stock_nearby,
            future_replenished,
            recent_period,
            action,
        },
    }
}

/// Round half away from zero, floored at zero.
fn round_demand(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

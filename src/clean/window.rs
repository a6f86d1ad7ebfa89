//! Trailing windows over one SKU's history.
//!
//! `WindowCursor` walks a SKU's chronologically sorted observations once. Before
//! evaluating a row it is advanced to that row's date, absorbing every earlier
//! observation, so each window query only touches the "strictly before" prefix.
//! Reference dates must be visited in non-decreasing order.

use chrono::NaiveDate;

use crate::clean::months_before;
use crate::clean::stock::StockEvidence;
use crate::domain::{DemandObservation, YearMonth};

#[derive(Debug, Clone)]
pub struct WindowCursor<'a> {
    sorted: &'a [&'a DemandObservation],
    next: usize,
    /// Positive-demand observations absorbed so far, oldest first.
    positives: Vec<&'a DemandObservation>,
    /// Zero-demand observations that fall in a low-stock month, oldest first.
    stockout_rows: Vec<(NaiveDate, YearMonth)>,
    /// `distinct_prefix[i]` = distinct months among `stockout_rows[..i]`.
    distinct_prefix: Vec<usize>,
}

impl<'a> WindowCursor<'a> {
    /// `sorted` must be one SKU's observations in ascending date order.
    pub fn new(sorted: &'a [&'a DemandObservation]) -> Self {
        Self {
            sorted,
            next: 0,
            positives: Vec::new(),
            stockout_rows: Vec::new(),
            distinct_prefix: vec![0],
        }
    }

    /// Absorb every observation dated strictly before `date`.
    pub fn advance_to(&mut self, date: NaiveDate, evidence: &StockEvidence) {
        let sorted = self.sorted;
        while let Some(&obs) = sorted.get(self.next) {
            if obs.date >= date {
                break;
            }
            self.absorb(obs, evidence);
            self.next += 1;
        }
    }

    fn absorb(&mut self, obs: &'a DemandObservation, evidence: &StockEvidence) {
        if obs.original_demand > 0.0 {
            self.positives.push(obs);
        } else if obs.original_demand == 0.0 {
            let month = YearMonth::of(obs.date);
            if evidence.is_low_month(month) {
                let is_new_month = self.stockout_rows.last().is_none_or(|(_, m)| *m != month);
                let distinct = self.distinct_prefix.last().copied().unwrap_or(0) + usize::from(is_new_month);
                self.stockout_rows.push((obs.date, month));
                self.distinct_prefix.push(distinct);
            }
        }
    }

    /// Observations absorbed so far (the "strictly before" history).
    pub fn history(&self) -> &'a [&'a DemandObservation] {
        &self.sorted[..self.next]
    }

    /// The last `n` positive observations, oldest first.
    pub fn trailing_positive(&self, n: usize) -> &[&'a DemandObservation] {
        let start = self.positives.len().saturating_sub(n);
        &self.positives[start..]
    }

    /// Positive observations dated strictly after `date - months`.
    pub fn trailing_months(&self, date: NaiveDate, months: u32) -> &[&'a DemandObservation] {
        let cutoff = months_before(date, months);
        let start = self.positives.partition_point(|o| o.date <= cutoff);
        &self.positives[start..]
    }

    /// Distinct stockout months dated strictly after `date - months`.
    pub fn stockout_months(&self, date: NaiveDate, months: u32) -> usize {
        let cutoff = months_before(date, months);
        let lo = self.stockout_rows.partition_point(|(d, _)| *d <= cutoff);
        let hi = self.stockout_rows.len();
        if lo == hi {
            return 0;
        }
        let continues_month = lo > 0 && self.stockout_rows[lo].1 == self.stockout_rows[lo - 1].1;
        self.distinct_prefix[hi] - self.distinct_prefix[lo] + usize::from(continues_month)
    }
}

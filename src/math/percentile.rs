//! Interpolated order statistics.
//!
//! We use the "linear" quantile estimator:
//!
//! ```text
//! i = p/100 * (n - 1)
//! q = x[floor(i)] + (x[ceil(i)] - x[floor(i)]) * (i - floor(i))
//! ```
//!
//! over an ascending copy of the sample. The empty sample maps to `0.0` rather
//! than an error because an empty trailing window is an ordinary state for a new
//! SKU.

/// Percentile `p` (in `[0, 100]`, clamped) of `values`.
///
/// The input slice is left untouched; sorting happens on a copy.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let sorted = sorted_copy(values);
    percentile_of_sorted(&sorted, p)
}

/// Evaluate several percentiles with a single sort.
pub fn percentiles<const N: usize>(values: &[f64], ps: [f64; N]) -> [f64; N] {
    let sorted = sorted_copy(values);
    ps.map(|p| percentile_of_sorted(&sorted, p))
}

/// Percentile of an already ascending sample.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }

    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let rank = p / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(n - 1);
    let w = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * w
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

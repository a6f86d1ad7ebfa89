//! Mathematical utilities: interpolated percentiles.

pub mod percentile;

pub use percentile::*;

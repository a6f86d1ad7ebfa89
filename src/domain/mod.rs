//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input observations (`DemandObservation`, `StockObservation`)
//! - engine outputs (`CleanedDemand`, `CleaningTrace`, `TracedRow`)
//! - calendar-month matching (`YearMonth`)
//! - engine tuning (`CleanConfig`)

pub mod types;

pub use types::*;

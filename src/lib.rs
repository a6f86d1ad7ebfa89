//! `demand-cleaner` library crate.
//!
//! The binary (`dclean`) is a thin wrapper around this library so that:
//!
//! - the cleaning engine is testable without spawning processes
//! - callers that already hold parsed records can use `clean::clean` directly
//! - CSV/CLI concerns stay out of the engine

pub mod app;
pub mod clean;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;

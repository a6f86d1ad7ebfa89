//! Shared "clean pipeline" logic used by the `clean` and `explain` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> validation -> cleaning -> summary
//!
//! The commands can then focus on presentation (tables vs exports).

use std::path::Path;

use tracing::info;

use crate::clean::clean_with_trace;
use crate::domain::{CleanConfig, TracedRow};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_inputs};
use crate::report::{RunSummary, summarize};

/// All computed outputs of a single cleaning run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub rows: Vec<TracedRow>,
    pub summary: RunSummary,
}

/// Load inputs from disk and run the cleaning engine.
pub fn run_clean(demand_path: &Path, stock_path: Option<&Path>, config: &CleanConfig) -> Result<RunOutput, AppError> {
    config.validate()?;
    let ingest = load_inputs(demand_path, stock_path)?;
    run_clean_with_data(ingest, config)
}

/// Run the cleaning engine over already loaded inputs.
pub fn run_clean_with_data(ingest: IngestedData, config: &CleanConfig) -> Result<RunOutput, AppError> {
    if ingest.demand.is_empty() {
        return Err(AppError::new(3, "No demand rows to clean."));
    }

    let rows = clean_with_trace(&ingest.demand, &ingest.stock, config)?;
    let summary = summarize(&rows);
    info!(
        rows = summary.rows,
        imputed = summary.imputed,
        capped = summary.capped,
        "cleaning finished"
    );

    Ok(RunOutput { ingest, rows, summary })
}

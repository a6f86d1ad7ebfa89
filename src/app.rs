//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the cleaning pipeline
//! - prints summaries/tables
//! - writes the cleaned series

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CleanArgs, Command, ExplainArgs, TuningArgs};
use crate::domain::CleanConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `dclean` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Clean(args) => handle_clean(args),
        Command::Explain(args) => handle_explain(args),
    }
}

/// Logs go to stderr so stdout stays clean for the exported series.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let config = clean_config_from_args(&args.tuning);
    let run = pipeline::run_clean(&args.input.demand, args.input.stock.as_deref(), &config)?;

    if !args.quiet {
        eprintln!(
            "{}",
            crate::report::format_run_summary(&run.ingest.stats, &run.summary, &config, args.top)
        );
    }

    crate::io::export::write_cleaned(args.output.as_deref(), &run.rows, args.format, args.explain)?;
    Ok(())
}

fn handle_explain(args: ExplainArgs) -> Result<(), AppError> {
    let config = clean_config_from_args(&args.tuning);
    let run = pipeline::run_clean(&args.input.demand, args.input.stock.as_deref(), &config)?;

    print!("{}", crate::report::format_sku_table(&run.rows, &args.sku));
    Ok(())
}

pub fn clean_config_from_args(args: &TuningArgs) -> CleanConfig {
    CleanConfig {
        low_stock_threshold: args.low_stock_threshold,
        trailing_positive: args.trailing_positive,
        recent_positive_months: args.recent_positive_months,
        stockout_lookback_months: args.stockout_lookback_months,
        min_stockout_months: args.min_stockout_months,
        recent_period_months: args.recent_period_months,
        replenishment_horizon_months: args.replenishment_horizon_months,
        ..CleanConfig::default()
    }
}

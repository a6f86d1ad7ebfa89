//! Command-line parsing for the demand cleaner.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! cleaning engine. Everything here maps onto `CleanConfig` and file paths.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::OutputFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dclean", version, about = "Stockout-aware demand cleaning")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean demand history, print a summary, and write the cleaned series.
    Clean(CleanArgs),
    /// Print the per-row cleaning decisions for one SKU.
    Explain(ExplainArgs),
}

/// Input files.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Demand history CSV (`sku`, `date`/`fecha`, `demand`/`demanda`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub demand: PathBuf,

    /// Stock history CSV (`sku`, `date`/`fecha`, `stock`). Without it no row is imputed.
    #[arg(short = 's', long, value_name = "CSV")]
    pub stock: Option<PathBuf>,
}

/// Engine tuning.
#[derive(Debug, Args, Clone)]
pub struct TuningArgs {
    /// Stock strictly below this level (or null/zero) counts as a stockout.
    #[arg(long, default_value_t = 4.0)]
    pub low_stock_threshold: f64,

    /// Number of most recent positive observations used for percentiles.
    #[arg(long, default_value_t = 24)]
    pub trailing_positive: usize,

    /// Months of history that must contain positive demand before imputing.
    #[arg(long = "recent-months", default_value_t = 6)]
    pub recent_positive_months: u32,

    /// Months scanned for zero-demand stockout months.
    #[arg(long = "lookback-months", default_value_t = 12)]
    pub stockout_lookback_months: u32,

    /// Distinct stockout months that confirm a stockout pattern.
    #[arg(long, default_value_t = 2)]
    pub min_stockout_months: usize,

    /// Most recent distinct months (across all SKUs) treated as the recent period.
    #[arg(long, default_value_t = 3)]
    pub recent_period_months: usize,

    /// Only accept replenishments within this many months after the row (default: unbounded).
    #[arg(long = "replenishment-horizon", value_name = "MONTHS")]
    pub replenishment_horizon_months: Option<u32>,
}

/// Options for `dclean clean`.
#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Output file (default: stdout).
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Append the per-row decision trace to the output.
    #[arg(long)]
    pub explain: bool,

    /// Show top-N most corrected SKUs in the summary.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Do not print the summary.
    #[arg(long)]
    pub quiet: bool,
}

/// Options for `dclean explain`.
#[derive(Debug, Args, Clone)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// SKU to explain.
    #[arg(long)]
    pub sku: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_defaults_match_engine_defaults() {
        let cli = Cli::try_parse_from(["dclean", "clean", "-d", "demand.csv"]).unwrap();
        let Command::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        assert_eq!(args.input.stock, None);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.tuning.low_stock_threshold, 4.0);
        assert_eq!(args.tuning.trailing_positive, 24);
        assert_eq!(args.tuning.replenishment_horizon_months, None);
    }

    #[test]
    fn explain_requires_sku() {
        assert!(Cli::try_parse_from(["dclean", "explain", "-d", "d.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "dclean",
            "explain",
            "-d",
            "d.csv",
            "-s",
            "s.csv",
            "--sku",
            "X1",
            "--replenishment-horizon",
            "3",
        ])
        .unwrap();
        let Command::Explain(args) = cli.command else {
            panic!("expected explain");
        };
        assert_eq!(args.sku, "X1");
        assert_eq!(args.tuning.replenishment_horizon_months, Some(3));
    }
}

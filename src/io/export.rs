//! Export cleaned rows to CSV or JSON.
//!
//! The base columns (`sku`, `date`, `demand_floor`, `cleaned_demand`) are the
//! contract for downstream consumers. With `explain` the decision trace is
//! appended (extra CSV columns, or a nested `trace` object in JSON).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{CleanedDemand, CleaningTrace, OutputFormat, TracedRow};
use crate::error::CleanError;

const BASE_COLUMNS: [&str; 4] = ["sku", "date", "demand_floor", "cleaned_demand"];
const TRACE_COLUMNS: [&str; 10] = [
    "p_low",
    "p_impute",
    "p_cap",
    "window_len",
    "recent_positive",
    "stockout_months",
    "low_stock_nearby",
    "future_replenished",
    "recent_period",
    "action",
];

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(flatten)]
    cleaned: &'a CleanedDemand,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a CleaningTrace>,
}

/// Write cleaned rows to `path`, or to stdout when `path` is `None`.
pub fn write_cleaned(
    path: Option<&Path>,
    rows: &[TracedRow],
    format: OutputFormat,
    explain: bool,
) -> Result<(), CleanError> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| CleanError::io(format!("Failed to create output '{}'", path.display()), e))?;
            write_rows(BufWriter::new(file), rows, format, explain)
        }
        None => write_rows(std::io::stdout().lock(), rows, format, explain),
    }
}

/// Write cleaned rows to any writer.
pub fn write_rows<W: Write>(writer: W, rows: &[TracedRow], format: OutputFormat, explain: bool) -> Result<(), CleanError> {
    match format {
        OutputFormat::Csv => write_csv(writer, rows, explain),
        OutputFormat::Json => write_json(writer, rows, explain),
    }
}

fn write_csv<W: Write>(writer: W, rows: &[TracedRow], explain: bool) -> Result<(), CleanError> {
    let mut out = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| CleanError::csv("Failed to write CSV", e);

    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if explain {
        header.extend(TRACE_COLUMNS);
    }
    out.write_record(&header).map_err(csv_err)?;

    for row in rows {
        let c = &row.cleaned;
        let mut record = vec![
            c.sku.clone(),
            c.date.to_string(),
            format_number(c.demand_floor),
            c.cleaned_demand.to_string(),
        ];
        if explain {
            let t = &row.trace;
            record.extend([
                format!("{:.4}", t.p_low),
                format!("{:.4}", t.p_impute),
                format!("{:.4}", t.p_cap),
                t.window_len.to_string(),
                t.recent_positive.to_string(),
                t.stockout_months.to_string(),
                t.low_stock_nearby.to_string(),
                t.future_replenished.to_string(),
                t.recent_period.to_string(),
                t.action.as_str().to_string(),
            ]);
        }
        out.write_record(&record).map_err(csv_err)?;
    }

    out.flush()
        .map_err(|e| CleanError::io("Failed to flush CSV", e))
}

fn write_json<W: Write>(mut writer: W, rows: &[TracedRow], explain: bool) -> Result<(), CleanError> {
    let json_rows: Vec<JsonRow<'_>> = rows
        .iter()
        .map(|r| JsonRow {
            cleaned: &r.cleaned,
            trace: explain.then_some(&r.trace),
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &json_rows)?;
    writeln!(writer).map_err(|e| CleanError::io("Failed to write JSON", e))
}

/// Integers print without a fractional part; anything else keeps its digits.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

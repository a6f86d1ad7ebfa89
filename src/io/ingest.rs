//! CSV ingest and validation.
//!
//! This module turns the demand and stock CSV exports into typed observations.
//!
//! Design goals:
//! - **Whole-batch validation**: a record whose date (or SKU) cannot be read is
//!   a fatal error for the whole batch; every offending line is reported at once
//! - **Absence is not an error**: a missing/unparseable demand becomes `0`, a
//!   missing/unparseable stock level becomes `None`
//! - **Lenient headers**: case, surrounding whitespace and a UTF-8 BOM are
//!   ignored, and the Spanish column names of the planning exports
//!   (`fecha`, `demanda`) are accepted

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{DemandObservation, StockObservation};
use crate::error::{CleanError, RowError};

const SKU_COLUMNS: &[&str] = &["sku"];
const DATE_COLUMNS: &[&str] = &["date", "fecha"];
const DEMAND_COLUMNS: &[&str] = &["demand", "demanda"];
const STOCK_COLUMNS: &[&str] = &["stock", "stock_level"];

/// Summary stats about the loaded inputs.
#[derive(Debug, Clone, Default)]
pub struct DatasetStats {
    pub demand_rows: usize,
    pub stock_rows: usize,
    pub skus: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Demand values that were missing/unparseable and defaulted to 0.
    pub defaulted_demand: usize,
    /// Stock levels that were missing/unparseable and read as null.
    pub null_stock: usize,
}

/// Ingest output: validated observations + stats.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub demand: Vec<DemandObservation>,
    pub stock: Vec<StockObservation>,
    pub stats: DatasetStats,
}

/// Parsed demand file.
#[derive(Debug, Clone)]
pub struct DemandFile {
    pub rows: Vec<DemandObservation>,
    pub defaulted: usize,
}

/// Parsed stock file.
#[derive(Debug, Clone)]
pub struct StockFile {
    pub rows: Vec<StockObservation>,
    pub null_levels: usize,
}

/// Load the demand CSV and (optionally) the stock CSV.
///
/// Validation errors from both files are reported together.
pub fn load_inputs(demand_path: &Path, stock_path: Option<&Path>) -> Result<IngestedData, CleanError> {
    let demand = read_demand(open(demand_path)?, "demand");
    let stock = match stock_path {
        Some(path) => read_stock(open(path)?, "stock"),
        None => Ok(StockFile {
            rows: Vec::new(),
            null_levels: 0,
        }),
    };

    let (demand, stock) = match (demand, stock) {
        (Ok(d), Ok(s)) => (d, s),
        (d, s) => {
            let mut errors = Vec::new();
            if let Err(mut e) = d {
                errors.append(&mut e);
            }
            if let Err(mut e) = s {
                errors.append(&mut e);
            }
            warn!(bad_records = errors.len(), "input validation failed");
            return Err(CleanError::InvalidInput(errors));
        }
    };

    let stats = compute_stats(&demand, &stock);
    info!(
        demand_rows = stats.demand_rows,
        stock_rows = stats.stock_rows,
        skus = stats.skus,
        "loaded inputs"
    );

    Ok(IngestedData {
        demand: demand.rows,
        stock: stock.rows,
        stats,
    })
}

/// Parse a demand CSV (`sku`, `date`/`fecha`, `demand`/`demanda`).
pub fn parse_demand_csv<R: Read>(reader: R, source: &str) -> Result<DemandFile, CleanError> {
    read_demand(reader, source).map_err(CleanError::InvalidInput)
}

/// Parse a stock CSV (`sku`, `date`/`fecha`, `stock`).
pub fn parse_stock_csv<R: Read>(reader: R, source: &str) -> Result<StockFile, CleanError> {
    read_stock(reader, source).map_err(CleanError::InvalidInput)
}

fn open(path: &Path) -> Result<File, CleanError> {
    File::open(path).map_err(|e| CleanError::io(format!("Failed to open CSV '{}'", path.display()), e))
}

fn read_demand<R: Read>(reader: R, source: &str) -> Result<DemandFile, Vec<RowError>> {
    let table = read_table(reader, source, &[SKU_COLUMNS, DATE_COLUMNS, DEMAND_COLUMNS])?;

    let mut rows = Vec::with_capacity(table.records.len());
    let mut errors = Vec::new();
    let mut defaulted = 0usize;

    for (line, record) in &table.records {
        match parse_keyed(record, &table.header_map, source, *line) {
            Ok((sku, date)) => {
                let demand = parse_opt_f64(get_optional(record, &table.header_map, DEMAND_COLUMNS));
                if demand.is_none() {
                    defaulted += 1;
                }
                rows.push(DemandObservation::new(sku, date, demand.unwrap_or(0.0)));
            }
            Err(e) => errors.push(e),
        }
    }

    errors.extend(table.errors);
    if !errors.is_empty() {
        errors.sort_by_key(|e| e.line);
        return Err(errors);
    }
    Ok(DemandFile { rows, defaulted })
}

fn read_stock<R: Read>(reader: R, source: &str) -> Result<StockFile, Vec<RowError>> {
    let table = read_table(reader, source, &[SKU_COLUMNS, DATE_COLUMNS, STOCK_COLUMNS])?;

    let mut rows = Vec::with_capacity(table.records.len());
    let mut errors = Vec::new();
    let mut null_levels = 0usize;

    for (line, record) in &table.records {
        match parse_keyed(record, &table.header_map, source, *line) {
            Ok((sku, date)) => {
                let level = parse_opt_f64(get_optional(record, &table.header_map, STOCK_COLUMNS));
                if level.is_none() {
                    null_levels += 1;
                }
                rows.push(StockObservation::new(sku, date, level));
            }
            Err(e) => errors.push(e),
        }
    }

    errors.extend(table.errors);
    if !errors.is_empty() {
        errors.sort_by_key(|e| e.line);
        return Err(errors);
    }
    Ok(StockFile { rows, null_levels })
}

struct RawTable {
    header_map: HashMap<String, usize>,
    records: Vec<(usize, StringRecord)>,
    errors: Vec<RowError>,
}

fn read_table<R: Read>(reader: R, source: &str, required: &[&[&str]]) -> Result<RawTable, Vec<RowError>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| vec![row_error(source, 1, format!("Failed to read CSV headers: {e}"))])?
        .clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<RowError> = required
        .iter()
        .filter(|names| !names.iter().any(|n| header_map.contains_key(*n)))
        .map(|names| row_error(source, 1, format!("Missing required column: `{}`", names.join("` or `"))))
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(r) if r.iter().all(str::is_empty) => {}
            Ok(r) => records.push((line, r)),
            Err(e) => errors.push(row_error(source, line, format!("CSV parse error: {e}"))),
        }
    }

    Ok(RawTable {
        header_map,
        records,
        errors,
    })
}

fn parse_keyed(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    source: &str,
    line: usize,
) -> Result<(String, NaiveDate), RowError> {
    let sku = get_optional(record, header_map, SKU_COLUMNS)
        .ok_or_else(|| row_error(source, line, "Missing required value: `sku`"))?;
    let raw_date = get_optional(record, header_map, DATE_COLUMNS)
        .ok_or_else(|| row_error(source, line, "Missing required value: `date`"))?;
    let date = parse_date(raw_date).map_err(|e| row_error(source, line, e))?;
    Ok((sku.to_string(), date))
}

fn row_error(source: &str, line: usize, message: impl Into<String>) -> RowError {
    RowError {
        source: source.to_string(),
        line,
        message: message.into(),
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel likes to prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, names: &[&str]) -> Option<&'a str> {
    let idx = names.iter().find_map(|n| header_map.get(*n))?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a calendar date.
///
/// Accepted: `YYYY-MM-DD`, `DD/MM/YYYY`, `DD-MM-YYYY`, `YYYY/MM/DD`, `YYYY-MM`
/// (read as the first of the month) and ISO timestamps (time part dropped).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    if let Some((day, _time)) = s.split_once(['T', ' ']) {
        if let Ok(d) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD, YYYY-MM."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn compute_stats(demand: &DemandFile, stock: &StockFile) -> DatasetStats {
    let skus: HashSet<&str> = demand.rows.iter().map(|o| o.sku.as_str()).collect();
    DatasetStats {
        demand_rows: demand.rows.len(),
        stock_rows: stock.rows.len(),
        skus: skus.len(),
        first_date: demand.rows.iter().map(|o| o.date).min(),
        last_date: demand.rows.iter().map(|o| o.date).max(),
        defaulted_demand: demand.defaulted,
        null_stock: stock.null_levels,
    }
}

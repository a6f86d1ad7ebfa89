//! Formatted terminal output.
//!
//! We keep formatting code in one place so the engine stays free of
//! presentation concerns and output changes are localized.

use crate::domain::{CleanConfig, TracedRow};
use crate::io::ingest::DatasetStats;
use crate::report::{MonthSummary, RunSummary, SkuSummary};

/// Format the run summary (inputs, configuration, corrections, demand KPIs,
/// monthly totals, top SKUs).
pub fn format_run_summary(stats: &DatasetStats, summary: &RunSummary, config: &CleanConfig, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str("=== dclean - stockout-aware demand cleaning ===\n");
    out.push_str(&format!(
        "Demand: rows={} | skus={} | dates=[{}, {}]\n",
        stats.demand_rows,
        stats.skus,
        stats.first_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
        stats.last_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
    ));
    out.push_str(&format!(
        "Stock:  rows={} | null levels={}\n",
        stats.stock_rows, stats.null_stock
    ));
    if stats.defaulted_demand > 0 {
        out.push_str(&format!(
            "Note: {} demand value(s) missing/unparseable, read as 0\n",
            stats.defaulted_demand
        ));
    }

    out.push_str(&format!(
        "Rules: low stock < {} | P{}/P{}/P{} of last {} positive | stockout months >= {} in {}m | recent demand {}m\n",
        config.low_stock_threshold,
        config.low_percentile,
        config.impute_percentile,
        config.cap_percentile,
        config.trailing_positive,
        config.min_stockout_months,
        config.stockout_lookback_months,
        config.recent_positive_months,
    ));
    if let Some(h) = config.replenishment_horizon_months {
        out.push_str(&format!("Replenishment look-ahead: {h}m\n"));
    }

    out.push_str("\nCorrections:\n");
    out.push_str(&format!(
        "- imputed: {} row(s), +{:.0} units\n",
        summary.imputed, summary.units_added
    ));
    out.push_str(&format!(
        "- capped : {} row(s), -{:.0} units\n",
        summary.capped, summary.units_removed
    ));
    out.push_str(&format!(
        "- kept   : {} row(s)\n",
        summary.rows.saturating_sub(summary.imputed + summary.capped)
    ));

    out.push_str("\nDemand:\n");
    out.push_str(&format!(
        "- real {:.0} | clean {:.0} | lost {:.0} | stockout rate {:.1}%\n",
        summary.real,
        summary.clean,
        summary.lost,
        summary.stockout_rate()
    ));

    if !summary.months.is_empty() {
        out.push_str("\nMonthly:\n");
        out.push_str(&format_months(&summary.months));
    }

    let corrected: Vec<&SkuSummary> = summary
        .skus
        .iter()
        .filter(|s| s.corrections() > 0)
        .take(top_n)
        .collect();
    if !corrected.is_empty() {
        out.push_str("\nMost corrected SKUs:\n");
        out.push_str(&format_sku_summaries(&corrected));
    }

    let by_demand = summary.top_by_clean_demand(top_n);
    if !by_demand.is_empty() {
        out.push_str("\nTop SKUs by clean demand:\n");
        out.push_str(&format_sku_ranking(&by_demand));
    }

    let by_lost = summary.top_by_lost_units(top_n);
    if !by_lost.is_empty() {
        out.push_str("\nTop SKUs by lost units:\n");
        out.push_str(&format_sku_ranking(&by_lost));
    }

    out
}

fn format_months(months: &[MonthSummary]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<7} {:>10} {:>10} {:>10} {:>7}", "month", "real", "clean", "lost", "rate%").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<7} {:-<10} {:-<10} {:-<10} {:-<7}", "", "", "", "", "").trim_end());
    out.push('\n');

    for m in months {
        out.push_str(
            format!(
                "{:<7} {:>10.0} {:>10.0} {:>10.0} {:>7.1}",
                m.month.to_string(),
                m.real,
                m.clean,
                m.lost,
                m.stockout_rate(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn format_sku_ranking(skus: &[&SkuSummary]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:>10} {:>10} {:>10}", "sku", "real", "clean", "lost").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<10} {:-<10} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for s in skus {
        out.push_str(
            format!(
                "{:<24} {:>10.0} {:>10.0} {:>10.0}",
                truncate(&s.sku, 24),
                s.real,
                s.clean,
                s.lost,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn format_sku_summaries(skus: &[&SkuSummary]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:>6} {:>8} {:>7} {:>10} {:>10}", "sku", "rows", "imputed", "capped", "added", "removed").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<6} {:-<8} {:-<7} {:-<10} {:-<10}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for s in skus {
        out.push_str(
            format!(
                "{:<24} {:>6} {:>8} {:>7} {:>10.0} {:>10.0}",
                truncate(&s.sku, 24),
                s.rows,
                s.imputed,
                s.capped,
                s.units_added,
                s.units_removed,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format the per-row decision table for one SKU, in date order.
pub fn format_sku_table(rows: &[TracedRow], sku: &str) -> String {
    let mut selected: Vec<&TracedRow> = rows.iter().filter(|r| r.cleaned.sku == sku).collect();
    if selected.is_empty() {
        return format!("No demand rows for SKU '{sku}'.\n");
    }
    selected.sort_by_key(|r| r.cleaned.date);

    let mut out = String::new();
    out.push_str(&format!("SKU {sku}: {} row(s)\n", selected.len()));
    out.push_str(
        format!(
            "{:<10} {:>9} {:>8} {:>8} {:>8} {:>8} {:>3} {:>4} {:>4} {:>4} {:>4} {:<18}",
            "date", "floor", "cleaned", "p_low", "p_imp", "p_cap", "n", "so", "low", "rep", "rec", "action"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<9} {:-<8} {:-<8} {:-<8} {:-<8} {:-<3} {:-<4} {:-<4} {:-<4} {:-<4} {:-<18}",
            "", "", "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in selected {
        let t = &r.trace;
        out.push_str(
            format!(
                "{:<10} {:>9} {:>8} {:>8.2} {:>8.2} {:>8.2} {:>3} {:>4} {:>4} {:>4} {:>4} {:<18}",
                r.cleaned.date,
                format!("{:.2}", r.cleaned.demand_floor),
                r.cleaned.cleaned_demand,
                t.p_low,
                t.p_impute,
                t.p_cap,
                t.window_len,
                t.stockout_months,
                flag(t.low_stock_nearby),
                flag(t.future_replenished),
                flag(t.recent_period),
                t.action.as_str(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out.push_str("\nn=window size, so=stockout months, low=low stock this/prev month, rep=replenished later, rec=recent period\n");
    out
}

fn flag(v: bool) -> &'static str {
    if v { "y" } else { "." }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CleanAction;
    use crate::report::summarize;
    use crate::report::tests::traced;

    #[test]
    fn summary_mentions_corrections_and_top_skus() {
        let rows = vec![
            traced("A", 1, 1.0, 10, CleanAction::Imputed),
            traced("B", 1, 7.0, 7, CleanAction::Kept),
        ];
        let stats = DatasetStats {
            demand_rows: 2,
            skus: 2,
            ..DatasetStats::default()
        };
        let text = format_run_summary(&stats, &summarize(&rows), &CleanConfig::default(), 10);

        assert!(text.contains("imputed: 1 row(s), +9 units"));
        assert!(text.contains("kept   : 1 row(s)"));
        assert!(text.contains("Most corrected SKUs:"));

        let corrected = section(&text, "Most corrected SKUs:");
        assert!(corrected.iter().any(|l| l.starts_with("A ")));
        assert!(!corrected.iter().any(|l| l.starts_with("B ")));
    }

    #[test]
    fn summary_reports_lost_demand_months_and_rankings() {
        let rows = vec![
            traced("A", 1, 0.0, 10, CleanAction::Imputed),
            traced("B", 1, 30.0, 30, CleanAction::Kept),
        ];
        let stats = DatasetStats::default();
        let text = format_run_summary(&stats, &summarize(&rows), &CleanConfig::default(), 10);

        assert!(text.contains("- real 30 | clean 40 | lost 10 | stockout rate 25.0%"));

        let monthly = section(&text, "Monthly:");
        assert_eq!(monthly.len(), 3);
        assert!(monthly[2].starts_with("2024-01"));
        assert!(monthly[2].ends_with("25.0"));

        let by_demand = section(&text, "Top SKUs by clean demand:");
        assert!(by_demand[2].starts_with("B "));
        assert!(by_demand[3].starts_with("A "));

        let by_lost = section(&text, "Top SKUs by lost units:");
        assert_eq!(by_lost.len(), 3);
        assert!(by_lost[2].starts_with("A "));
    }

    /// Lines after `title` up to the next blank line.
    fn section<'a>(text: &'a str, title: &str) -> Vec<&'a str> {
        text.lines()
            .skip_while(|l| *l != title)
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn sku_table_is_date_ordered() {
        let rows = vec![
            traced("A", 9, 3.0, 3, CleanAction::Kept),
            traced("B", 1, 3.0, 3, CleanAction::Kept),
            traced("A", 2, 0.0, 10, CleanAction::Imputed),
        ];
        let text = format_sku_table(&rows, "A");
        let body: Vec<&str> = text.lines().skip(3).take(2).collect();

        assert!(text.starts_with("SKU A: 2 row(s)"));
        assert!(body[0].starts_with("2024-01-02"));
        assert!(body[0].ends_with("imputed"));
        assert!(body[1].starts_with("2024-01-09"));
        assert_eq!(format_sku_table(&rows, "Z"), "No demand rows for SKU 'Z'.\n");
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("SHORT", 24), "SHORT");
        assert_eq!(truncate("ABCDEFGHIJ", 5), "ABCD.");
    }
}

//! Export: CSV results table and JSON batch report.
//!
//! The CSV holds one row per passing ticker and always carries the header,
//! even when nothing passed. Floats are written at full precision. The JSON
//! report is the full `BatchReport`.

use std::path::Path;

use anyhow::{Context, Result};
use canslim_core::domain::ScreenResult;

use crate::batch::BatchReport;

/// CSV column order.
pub const CSV_COLUMNS: [&str; 6] = [
    "ticker",
    "quarterly_eps_growth_pct",
    "annual_eps_growth_pct",
    "shares_outstanding",
    "institutional_ownership_pct",
    "has_base_on_base",
];

// ─── CSV export ─────────────────────────────────────────────────────

/// Render passing tickers as CSV.
pub fn results_to_csv(results: &[ScreenResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_COLUMNS)?;

    for r in results {
        wtr.write_record([
            &r.ticker,
            &r.quarterly_eps_growth_pct.to_string(),
            &r.annual_eps_growth_pct.to_string(),
            &r.shares_outstanding.to_string(),
            &r.institutional_ownership_pct.to_string(),
            &r.has_base_on_base.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_results_csv(results: &[ScreenResult], path: &Path) -> Result<()> {
    let csv = results_to_csv(results)?;
    create_parent(path)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── JSON report ────────────────────────────────────────────────────

pub fn export_report_json(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BatchReport to JSON")
}

pub fn import_report_json(json: &str) -> Result<BatchReport> {
    serde_json::from_str(json).context("failed to deserialize BatchReport from JSON")
}

pub fn write_report_json(report: &BatchReport, path: &Path) -> Result<()> {
    let json = export_report_json(report)?;
    create_parent(path)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{SkipKind, SkippedTicker};
    use canslim_core::screen::Criterion;
    use std::collections::BTreeMap;

    fn result(ticker: &str) -> ScreenResult {
        ScreenResult {
            ticker: ticker.into(),
            quarterly_eps_growth_pct: 40.0,
            annual_eps_growth_pct: 28.123,
            shares_outstanding: 50_000_000,
            institutional_ownership_pct: 35.5,
            has_base_on_base: true,
        }
    }

    fn report() -> BatchReport {
        let mut rejections = BTreeMap::new();
        rejections.insert(Criterion::SharesOutstanding, 2);
        rejections.insert(Criterion::QuarterlyEarnings, 5);
        BatchReport {
            generated_at: chrono::Utc::now(),
            benchmark: "^GSPC".into(),
            config_hash: "abc".into(),
            evaluated: 9,
            results: vec![result("NVDA")],
            rejections,
            skipped: vec![SkippedTicker {
                ticker: "GONE".into(),
                kind: SkipKind::MissingFundamentals,
                reason: "symbol not found: GONE".into(),
            }],
            elapsed_secs: 1.5,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = results_to_csv(&[result("NVDA"), result("CELH")]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert_eq!(lines[1], "NVDA,40,28.123,50000000,35.5,true");
        assert!(lines[2].starts_with("CELH,"));
    }

    #[test]
    fn csv_keeps_full_precision() {
        let mut r = result("NVDA");
        r.annual_eps_growth_pct = 28.000000000000004;
        let csv = results_to_csv(&[r]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        let annual: f64 = row.split(',').nth(2).unwrap().parse().unwrap();
        assert_eq!(annual, 28.000000000000004);
    }

    #[test]
    fn empty_results_still_write_header() {
        let csv = results_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn report_json_roundtrip() {
        let json = export_report_json(&report()).unwrap();
        assert!(json.contains("\"shares_outstanding\": 2"));
        assert!(json.contains("\"missing_fundamentals\""));

        let back = import_report_json(&json).unwrap();
        assert_eq!(back.results, vec![result("NVDA")]);
        assert_eq!(back.rejections.get(&Criterion::QuarterlyEarnings), Some(&5));
        assert_eq!(back.skipped[0].kind, SkipKind::MissingFundamentals);
    }

    #[test]
    fn writes_into_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out/nested/results.csv");
        let json_path = dir.path().join("out/report.json");

        write_results_csv(&[result("NVDA")], &csv_path).unwrap();
        write_report_json(&report(), &json_path).unwrap();

        assert!(std::fs::read_to_string(&csv_path).unwrap().contains("NVDA"));
        assert!(std::fs::read_to_string(&json_path)
            .unwrap()
            .contains("\"benchmark\": \"^GSPC\""));
    }
}

//! KPI report: per-night occupancy, net revenue and ADR
//!
//! Read-only consumer of `view_kpi`. Filters the requested date range
//! and hotel, drops excluded nights, and exports the four KPI columns
//! as CSV or a rendered HTML table.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use revpipe_core::RecordBatch;
use revpipe_store::StoreEngine as _;

use crate::context::PipelineContext;

const EXPORT_COLUMNS: [&str; 4] = [
    "NIGHT_OF_STAY",
    "OCCUPANCY_PERCENTAGE",
    "TOTAL_NET_REVENUE",
    "ADR",
];

const HTML_TEMPLATE: &str = include_str!("../templates/kpi_report.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    Csv,
    Html,
}

impl ExportType {
    fn extension(&self) -> &'static str {
        match self {
            ExportType::Csv => "csv",
            ExportType::Html => "html",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportType::Csv => write!(f, "CSV"),
            ExportType::Html => write!(f, "HTML"),
        }
    }
}

impl FromStr for ExportType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "CSV" => Ok(ExportType::Csv),
            "HTML" => Ok(ExportType::Html),
            _ => anyhow::bail!("{} is not a valid export type. Allowed values are CSV and HTML", s),
        }
    }
}

/// One exported report line, pre-formatted for rendering.
#[derive(Debug, Serialize)]
struct ReportLine {
    night_of_stay: String,
    occupancy_percentage: String,
    total_net_revenue: String,
    adr: String,
}

/// Parameters of one KPI report run.
pub struct KpiReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hotel_id: i64,
    pub exclude_dates: Vec<NaiveDate>,
    pub export_type: ExportType,
    pub export_path: PathBuf,
}

impl KpiReport {
    /// Query, filter and export. Returns the written file path.
    pub fn run(&self, context: &PipelineContext) -> Result<PathBuf> {
        info!("Generating KPI report");
        info!(hotel_id = self.hotel_id, "Hotel");
        info!(start = %self.start_date, end = %self.end_date, "Date range");
        if !self.exclude_dates.is_empty() {
            info!(
                excluded = %self
                    .exclude_dates
                    .iter()
                    .map(NaiveDate::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                "Excluded nights"
            );
        }
        info!(path = %self.export_path.display(), export_type = %self.export_type, "Export target");

        let query = format!(
            "SELECT * FROM view_kpi \
             WHERE NIGHT_OF_STAY BETWEEN '{}' AND '{}' AND HOTEL_ID = {} \
             ORDER BY NIGHT_OF_STAY",
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d"),
            self.hotel_id
        );
        let table = context
            .engine
            .execute(&query, false)
            .context("Error calculating KPI report")?
            .into_table()
            .context("KPI query did not produce a result set")?;

        let lines = self.report_lines(&table)?;

        let filename = format!(
            "kpi_{}_{}_to_{}.{}",
            self.hotel_id,
            self.start_date.format("%Y_%m_%d"),
            self.end_date.format("%Y_%m_%d"),
            self.export_type.extension()
        );
        let export_filepath = self.export_path.join(filename);
        if let Some(parent) = export_filepath.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating export directory '{}'", parent.display()))?;
        }

        match self.export_type {
            ExportType::Csv => self.export_csv(&export_filepath, &lines)?,
            ExportType::Html => self.export_html(&export_filepath, &lines)?,
        }

        info!(file = %export_filepath.display(), "KPI report generated");
        Ok(export_filepath)
    }

    /// Project the view rows onto the export columns, dropping excluded
    /// nights.
    fn report_lines(&self, table: &RecordBatch) -> Result<Vec<ReportLine>> {
        let mut lines = Vec::new();
        for row in 0..table.len() {
            let night_text = cell_text(table, row, "NIGHT_OF_STAY")?;
            let night = NaiveDate::parse_from_str(&night_text, "%Y-%m-%d")
                .with_context(|| format!("unparseable NIGHT_OF_STAY '{night_text}'"))?;
            if self.exclude_dates.contains(&night) {
                continue;
            }
            lines.push(ReportLine {
                night_of_stay: night_text,
                occupancy_percentage: format!("{:.2}", cell_number(table, row, "OCCUPANCY_PERCENTAGE")?),
                total_net_revenue: format!("{:.2}", cell_number(table, row, "TOTAL_NET_REVENUE")?),
                adr: format!("{:.2}", cell_number(table, row, "ADR")?),
            });
        }
        Ok(lines)
    }

    fn export_csv(&self, path: &Path, lines: &[ReportLine]) -> Result<()> {
        let mut out = String::new();
        out.push_str(&EXPORT_COLUMNS.join(","));
        out.push('\n');
        for line in lines {
            out.push_str(&format!(
                "{},{},{},{}\n",
                line.night_of_stay, line.occupancy_percentage, line.total_net_revenue, line.adr
            ));
        }
        fs::write(path, out).with_context(|| format!("writing '{}'", path.display()))
    }

    fn export_html(&self, path: &Path, lines: &[ReportLine]) -> Result<()> {
        let mut tera = tera::Tera::default();
        tera.add_raw_template("kpi_report.html", HTML_TEMPLATE)
            .context("KPI report template is invalid")?;

        let mut template_context = tera::Context::new();
        template_context.insert(
            "report_date",
            &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        template_context.insert("hotel_id", &self.hotel_id);
        template_context.insert("start_date", &self.start_date.format("%Y-%m-%d").to_string());
        template_context.insert("end_date", &self.end_date.format("%Y-%m-%d").to_string());
        template_context.insert(
            "exclude_dates",
            &if self.exclude_dates.is_empty() {
                "No dates excluded!".to_string()
            } else {
                self.exclude_dates
                    .iter()
                    .map(NaiveDate::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );
        template_context.insert("report_lines", lines);

        let html = tera
            .render("kpi_report.html", &template_context)
            .context("Error rendering KPI report")?;
        fs::write(path, html).with_context(|| format!("writing '{}'", path.display()))
    }
}

fn cell_text(table: &RecordBatch, row: usize, column: &str) -> Result<String> {
    let cell = table
        .cell(row, column)
        .with_context(|| format!("view_kpi is missing column '{column}'"))?;
    Ok(cell.to_string())
}

fn cell_number(table: &RecordBatch, row: usize, column: &str) -> Result<f64> {
    let cell = table
        .cell(row, column)
        .with_context(|| format!("view_kpi is missing column '{column}'"))?;
    cell.as_real()
        .with_context(|| format!("view_kpi column '{column}' is not numeric"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revpipe_core::DbValue;

    fn kpi_table() -> RecordBatch {
        let mut table = RecordBatch::new([
            "HOTEL_ID",
            "NIGHT_OF_STAY",
            "OCCUPANCY_PERCENTAGE",
            "TOTAL_NET_REVENUE",
            "ADR",
        ]);
        table.push_row(vec![
            DbValue::Integer(1),
            DbValue::Text("2025-05-10".into()),
            DbValue::Real(75.0),
            DbValue::Real(300.0),
            DbValue::Real(100.0),
        ]);
        table.push_row(vec![
            DbValue::Integer(1),
            DbValue::Text("2025-05-11".into()),
            DbValue::Real(50.0),
            DbValue::Real(200.0),
            DbValue::Real(100.0),
        ]);
        table
    }

    fn report(exclude: Vec<NaiveDate>, export_type: ExportType, dir: &Path) -> KpiReport {
        KpiReport {
            start_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
            hotel_id: 1,
            exclude_dates: exclude,
            export_type,
            export_path: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_export_type_parsing() {
        assert_eq!("csv".parse::<ExportType>().unwrap(), ExportType::Csv);
        assert_eq!("HTML".parse::<ExportType>().unwrap(), ExportType::Html);
        assert!("pdf".parse::<ExportType>().is_err());
    }

    #[test]
    fn test_excluded_nights_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let excluded = vec![NaiveDate::from_ymd_opt(2025, 5, 11).unwrap()];
        let kpi = report(excluded, ExportType::Csv, dir.path());
        let lines = kpi.report_lines(&kpi_table()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].night_of_stay, "2025-05-10");
    }

    #[test]
    fn test_csv_export_shape() {
        let dir = tempfile::tempdir().unwrap();
        let kpi = report(Vec::new(), ExportType::Csv, dir.path());
        let lines = kpi.report_lines(&kpi_table()).unwrap();
        let path = dir.path().join("kpi_1_2025_05_10_to_2025_05_12.csv");
        kpi.export_csv(&path, &lines).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut rows = content.lines();
        assert_eq!(
            rows.next().unwrap(),
            "NIGHT_OF_STAY,OCCUPANCY_PERCENTAGE,TOTAL_NET_REVENUE,ADR"
        );
        assert_eq!(rows.next().unwrap(), "2025-05-10,75.00,300.00,100.00");
    }

    #[test]
    fn test_html_export_renders_lines() {
        let dir = tempfile::tempdir().unwrap();
        let kpi = report(Vec::new(), ExportType::Html, dir.path());
        let lines = kpi.report_lines(&kpi_table()).unwrap();
        let path = dir.path().join("report.html");
        kpi.export_html(&path, &lines).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("KPI Report - Hotel 1"));
        assert!(content.contains("2025-05-11"));
        assert!(content.contains("No dates excluded!"));
    }
}

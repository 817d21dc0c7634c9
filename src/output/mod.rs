pub mod display;

use crate::domain::model::{AnalysisReport, TableGrid};
use crate::output::display::column_keys;
use crate::utils::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

pub const BUNDLE_FILENAME: &str = "invoice_analysis.zip";

/// 表格轉 CSV：第一欄為 row index，欄位取所有列的聯集
pub fn grid_to_csv(grid: &TableGrid) -> Result<String> {
    let columns = column_keys(grid);
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["row".to_string()];
    header.extend(columns.iter().map(|c| format!("col_{}", c)));
    writer.write_record(&header)?;

    for (row_index, row) in grid {
        let mut record = vec![row_index.to_string()];
        record.extend(
            columns
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    let data = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// 將分析結果寫入輸出目錄
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_path: PathBuf,
    results_file: String,
    csv: bool,
    bundle: bool,
}

impl ReportWriter {
    pub fn new(output_path: impl Into<PathBuf>, results_file: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            results_file: results_file.into(),
            csv: true,
            bundle: false,
        }
    }

    pub fn with_csv(mut self, csv: bool) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_bundle(mut self, bundle: bool) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// 回傳寫入的檔案路徑
    pub fn write(&self, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_path)?;

        // (檔名, 內容)
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        let json_data = serde_json::to_string_pretty(&report.result)?;
        files.push((self.results_file.clone(), json_data.into_bytes()));

        if self.csv {
            for (i, grid) in report.tables.grids().iter().enumerate() {
                files.push((format!("table_{}.csv", i + 1), grid_to_csv(grid)?.into_bytes()));
            }
        }

        let mut written = Vec::with_capacity(files.len() + 1);
        for (name, data) in &files {
            let path = self.output_path.join(name);
            fs::write(&path, data)?;
            tracing::debug!("💾 Wrote {} ({} bytes)", path.display(), data.len());
            written.push(path);
        }

        if self.bundle {
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            let path = self.output_path.join(BUNDLE_FILENAME);
            tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), path.display());
            fs::write(&path, zip_data)?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AnalysisJob, AnalysisResult, InvoiceSummary, StorageReference, TableOutcome,
    };
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample_grid() -> TableGrid {
        BTreeMap::from([
            (
                0,
                BTreeMap::from([(0, "Description".to_string()), (1, "Amount".to_string())]),
            ),
            (1, BTreeMap::from([(0, "Consulting, March".to_string())])),
        ])
    }

    fn sample_report(tables: TableOutcome) -> AnalysisReport {
        AnalysisReport {
            reference: StorageReference::new("https://storage.test/invoices/a.pdf"),
            job: AnalysisJob {
                result_id: "r-1".to_string(),
                operation_location: "https://ocr.test/analyzeResults/r-1".to_string(),
            },
            result: AnalysisResult::new(json!({"status": "succeeded", "analyzeResult": {"tables": []}})),
            tables,
            summary: InvoiceSummary {
                invoice_date: "N/A".to_string(),
                due_date: "N/A".to_string(),
                total_due: "N/A".to_string(),
            },
            attempts: 1,
        }
    }

    #[test]
    fn test_grid_to_csv_quotes_and_blanks() {
        let csv = grid_to_csv(&sample_grid()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "row,col_0,col_1");
        assert_eq!(lines[1], "0,Description,Amount");
        assert_eq!(lines[2], "1,\"Consulting, March\",");
    }

    #[test]
    fn test_write_results_and_csv() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp_dir.path(), "local_results.json");

        let written = writer
            .write(&sample_report(TableOutcome::Tables(vec![sample_grid()])))
            .unwrap();

        assert_eq!(written.len(), 2);
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp_dir.path().join("local_results.json")).unwrap())
                .unwrap();
        assert_eq!(saved["status"], "succeeded");
        assert!(temp_dir.path().join("table_1.csv").exists());
    }

    #[test]
    fn test_no_tables_writes_only_results() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp_dir.path().join("nested"), "results.json");

        let written = writer.write(&sample_report(TableOutcome::NoTables)).unwrap();
        assert_eq!(written, vec![temp_dir.path().join("nested").join("results.json")]);
    }

    #[test]
    fn test_bundle_contains_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp_dir.path(), "local_results.json")
            .with_csv(true)
            .with_bundle(true);

        writer
            .write(&sample_report(TableOutcome::Tables(vec![sample_grid(), sample_grid()])))
            .unwrap();

        let zip_data = fs::read(temp_dir.path().join(BUNDLE_FILENAME)).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut csv_file = archive.by_name("table_2.csv").unwrap();
        let mut content = String::new();
        csv_file.read_to_string(&mut content).unwrap();
        assert!(content.starts_with("row,col_0,col_1"));
    }
}

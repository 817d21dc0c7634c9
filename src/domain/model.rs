use crate::utils::error::Result;
use crate::utils::validation::validate_document_extension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// 待上傳的文件，上傳後即丟棄
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// 讀取本機 PDF 或 Word 文件
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content_type = validate_document_extension("file", path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, content_type, data))
    }

    pub fn size_kb(&self) -> f64 {
        self.data.len() as f64 / 1024.0
    }

    pub fn details(&self) -> String {
        format!(
            "Name: {} | Type: {} | Size: {:.2} KB",
            self.name,
            self.content_type,
            self.size_kb()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReference {
    pub url: String,
}

impl StorageReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// 去掉 query string (SAS / 預簽簽章) 後的 URL，供日誌與畫面輸出
    pub fn redacted(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// 顯示時一律不含簽章
impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub result_id: String,
    pub operation_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(rename = "rowIndex")]
    pub row_index: i64,
    #[serde(rename = "columnIndex")]
    pub column_index: i64,
    #[serde(default)]
    pub content: String,
}

/// row index -> column index -> cell text
pub type TableGrid = BTreeMap<i64, BTreeMap<i64, String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Tables(Vec<TableGrid>),
    NoTables,
}

impl TableOutcome {
    pub fn grids(&self) -> &[TableGrid] {
        match self {
            TableOutcome::Tables(grids) => grids,
            TableOutcome::NoTables => &[],
        }
    }

    pub fn has_tables(&self) -> bool {
        matches!(self, TableOutcome::Tables(_))
    }
}

/// 分析服務回傳的 JSON 文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    pub body: serde_json::Value,
}

impl AnalysisResult {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    /// 頂層 `status` 欄位；舊版回應可能沒有
    pub fn status(&self) -> Option<&str> {
        self.body.get("status").and_then(|s| s.as_str())
    }

    pub fn analyze_result(&self) -> Option<&serde_json::Value> {
        self.body.get("analyzeResult")
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
    }

    /// 移除 `analyzeResult.pages`，顯示及儲存前使用
    pub fn without_pages(mut self) -> Self {
        if let Some(result) = self
            .body
            .get_mut("analyzeResult")
            .and_then(|r| r.as_object_mut())
        {
            result.remove("pages");
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoice_date: String,
    pub due_date: String,
    pub total_due: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub reference: StorageReference,
    pub job: AnalysisJob,
    pub result: AnalysisResult,
    pub tables: TableOutcome,
    pub summary: InvoiceSummary,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// 只在初始延遲後讀取一次
    SingleShot,
    #[default]
    UntilComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub mode: PollMode,
    pub initial_delay: Duration,
    pub interval: Duration,
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn single_shot(initial_delay: Duration) -> Self {
        Self {
            mode: PollMode::SingleShot,
            initial_delay,
            ..Self::default()
        }
    }

    pub fn effective_max_attempts(&self) -> u32 {
        match self.mode {
            PollMode::SingleShot => 1,
            PollMode::UntilComplete => self.max_attempts.max(1),
        }
    }

    /// 下一次等待時間，套用倍率並以 `max_interval` 為上限
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            mode: PollMode::UntilComplete,
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(10),
            max_attempts: 30,
            timeout: Duration::from_secs(120),
        }
    }
}

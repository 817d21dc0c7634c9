use crate::domain::model::PollPolicy;
use crate::utils::error::{InvoiceError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 分析服務接受的文件類型
pub const SUPPORTED_DOCUMENTS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> InvoiceError {
    InvoiceError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        // 金鑰類欄位不回顯內容
        return Err(InvoiceError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// 輪詢設定的合理範圍。`field` 把鍵名 (如 `interval_ms`) 轉成設定來源的欄位名稱
pub fn validate_poll_policy(policy: &PollPolicy, field: impl Fn(&str) -> String) -> Result<()> {
    let millis = |d: std::time::Duration| d.as_millis().min(u64::MAX as u128) as u64;

    validate_range(&field("max_attempts"), policy.max_attempts, 1, 1000)?;
    validate_range(
        &field("backoff_multiplier"),
        policy.backoff_multiplier,
        1.0,
        10.0,
    )?;
    validate_range(
        &field("initial_delay_ms"),
        millis(policy.initial_delay),
        0,
        600_000,
    )?;
    // 間隔為 0 時會連續打 API
    validate_range(&field("interval_ms"), millis(policy.interval), 10, 300_000)?;
    validate_range(
        &field("max_interval_ms"),
        millis(policy.max_interval),
        10,
        300_000,
    )?;
    validate_range(&field("timeout_seconds"), policy.timeout.as_secs(), 1, 3600)?;

    if policy.max_interval < policy.interval {
        return Err(invalid(
            &field("max_interval_ms"),
            &millis(policy.max_interval).to_string(),
            format!("must not be smaller than {}", field("interval_ms")),
        ));
    }
    Ok(())
}

/// 檢查副檔名並回傳對應的 media type
pub fn validate_document_extension(field_name: &str, file: &Path) -> Result<&'static str> {
    let display = file.display().to_string();
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| invalid(field_name, &display, "File has no extension or invalid filename"))?;

    SUPPORTED_DOCUMENTS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, media_type)| *media_type)
        .ok_or_else(|| {
            let allowed: Vec<&str> = SUPPORTED_DOCUMENTS.iter().map(|(ext, _)| *ext).collect();
            invalid(
                field_name,
                &display,
                format!(
                    "Unsupported file extension: {}. Allowed extensions: {}",
                    extension,
                    allowed.join(", ")
                ),
            )
        })
}

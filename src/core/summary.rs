use crate::domain::model::{AnalysisResult, InvoiceSummary};
use serde_json::Value;

const NOT_AVAILABLE: &str = "N/A";

fn trimmed(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 欄位文字：優先使用 OCR 原文，其次才是語意值
fn field_text(field: &Value) -> Option<String> {
    trimmed(field, "content")
        .or_else(|| trimmed(field, "valueDate"))
        .or_else(|| trimmed(field, "valueString"))
        .or_else(|| {
            field
                .get("valueCurrency")
                .and_then(|c| c.get("amount"))
                .and_then(|a| a.as_f64())
                .map(|n| n.to_string())
        })
        .or_else(|| {
            field
                .get("valueNumber")
                .and_then(|v| v.as_f64())
                .map(|n| n.to_string())
        })
}

fn lookup(fields: Option<&Value>, names: &[&str]) -> String {
    fields
        .and_then(|fields| {
            names
                .iter()
                .find_map(|name| fields.get(*name).and_then(field_text))
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// 讀取 prebuilt-invoice 第一份文件的日期與應付金額
pub fn extract_invoice_summary(result: &AnalysisResult) -> InvoiceSummary {
    let fields = result
        .analyze_result()
        .and_then(|analyze| analyze.get("documents"))
        .and_then(|docs| docs.as_array())
        .and_then(|docs| docs.first())
        .and_then(|doc| doc.get("fields"));

    InvoiceSummary {
        invoice_date: lookup(fields, &["InvoiceDate"]),
        due_date: lookup(fields, &["DueDate"]),
        total_due: lookup(fields, &["AmountDue", "InvoiceTotal"]),
    }
}

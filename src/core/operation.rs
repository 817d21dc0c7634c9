use crate::utils::error::{InvoiceError, Result};

/// 從 `Operation-Location` 取出結果 id：
/// 先去除 query string，再取最後一段路徑。
pub fn extract_result_id(operation_location: &str) -> Result<String> {
    let without_query = operation_location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let result_id = without_query
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if result_id.is_empty() {
        return Err(InvoiceError::InvalidOperationLocation {
            value: operation_location.to_string(),
        });
    }

    Ok(result_id.to_string())
}

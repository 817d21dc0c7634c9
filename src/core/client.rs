use crate::core::operation::extract_result_id;
use crate::domain::model::{AnalysisJob, AnalysisResult};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{InvoiceError, Result};
use reqwest::{Client, Response};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// 文件分析服務的 HTTP 客戶端 (analyze / analyzeResults)
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: Client,
    endpoint: String,
    model_id: String,
    api_version: String,
    subscription_key: String,
}

impl AnalysisClient {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client<C: ConfigProvider>(http: Client, config: &C) -> Self {
        Self {
            http,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model_id: config.model_id().to_string(),
            api_version: config.api_version().to_string(),
            subscription_key: config.subscription_key().to_string(),
        }
    }

    pub fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze",
            self.endpoint, self.model_id
        )
    }

    pub fn result_url(&self, result_id: &str) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}/analyzeResults/{}",
            self.endpoint, self.model_id, result_id
        )
    }

    async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("❌ {} failed with status {}: {}", operation, status, body);
        Err(InvoiceError::HttpStatusError {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// 送出分析請求，回傳 `Operation-Location` 中的結果 id
    pub async fn submit(&self, document_url: &str) -> Result<AnalysisJob> {
        let url = self.analyze_url();
        tracing::debug!("📡 POST {} (model: {})", url, self.model_id);

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .json(&serde_json::json!({ "urlSource": document_url }))
            .send()
            .await?;

        tracing::debug!("📡 Analyze response status: {}", response.status());
        let response = Self::ensure_success("Submit analysis", response).await?;

        let operation_location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(InvoiceError::MissingOperationLocation)?
            .to_string();

        let result_id = extract_result_id(&operation_location)?;
        Ok(AnalysisJob {
            result_id,
            operation_location,
        })
    }

    /// 單次讀取分析結果；非 2xx 直接回傳錯誤，不重試
    pub async fn get_result(&self, result_id: &str) -> Result<AnalysisResult> {
        let url = self.result_url(result_id);
        tracing::debug!("📡 GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .send()
            .await?;

        let response = Self::ensure_success("Fetch analysis result", response).await?;
        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(AnalysisResult::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(base_url: &str) -> TomlConfig {
        let toml_content = format!(
            r#"
[analysis]
endpoint = "{}/"
subscription_key = "test-key"

[storage]
account_url = "https://account.blob.core.windows.net"
container = "invoices"
"#,
            base_url
        );
        TomlConfig::from_toml_str(&toml_content).unwrap()
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = AnalysisClient::from_config(&config_for("https://ocr.example.com")).unwrap();
        assert_eq!(
            client.analyze_url(),
            "https://ocr.example.com/formrecognizer/documentModels/prebuilt-invoice:analyze"
        );
        assert_eq!(
            client.result_url("abc"),
            "https://ocr.example.com/formrecognizer/documentModels/prebuilt-invoice/analyzeResults/abc"
        );
    }

    #[tokio::test]
    async fn test_submit_returns_result_id() {
        let server = MockServer::start();
        let analyze_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-invoice:analyze")
                .query_param("api-version", "2023-07-31")
                .header("ocp-apim-subscription-key", "test-key")
                .json_body(json!({"urlSource": "https://blob/invoices/a.pdf"}));
            then.status(202).header(
                "Operation-Location",
                format!(
                    "{}/formrecognizer/documentModels/prebuilt-invoice/analyzeResults/job-42?api-version=2023-07-31",
                    server.base_url()
                ),
            );
        });

        let client = AnalysisClient::from_config(&config_for(&server.base_url())).unwrap();
        let job = client.submit("https://blob/invoices/a.pdf").await.unwrap();

        analyze_mock.assert();
        assert_eq!(job.result_id, "job-42");
        assert!(job.operation_location.ends_with("?api-version=2023-07-31"));
    }

    #[tokio::test]
    async fn test_submit_without_operation_location_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(202);
        });

        let client = AnalysisClient::from_config(&config_for(&server.base_url())).unwrap();
        let err = client.submit("https://blob/a.pdf").await.unwrap_err();
        assert!(matches!(err, InvoiceError::MissingOperationLocation));
    }

    #[tokio::test]
    async fn test_submit_rejected_by_service() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(401)
                .json_body(json!({"error": {"code": "401", "message": "Access denied"}}));
        });

        let client = AnalysisClient::from_config(&config_for(&server.base_url())).unwrap();
        match client.submit("https://blob/a.pdf").await {
            Err(InvoiceError::HttpStatusError { status, body, .. }) => {
                assert_eq!(status, 401);
                assert!(body.contains("Access denied"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_result_with_malformed_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(
                "/formrecognizer/documentModels/prebuilt-invoice/analyzeResults/job-1",
            );
            then.status(200).body("{not json");
        });

        let client = AnalysisClient::from_config(&config_for(&server.base_url())).unwrap();
        let err = client.get_result("job-1").await.unwrap_err();
        assert!(matches!(err, InvoiceError::SerializationError(_)));
    }
}

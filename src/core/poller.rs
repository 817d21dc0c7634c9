use crate::core::client::AnalysisClient;
use crate::domain::model::{AnalysisJob, PollPolicy};
use crate::domain::ports::PollOutcome;
use crate::utils::error::{InvoiceError, Result};
use std::time::Instant;

const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_FAILED: &str = "failed";

/// 依 [`PollPolicy`] 讀取分析結果。
///
/// 第一次請求前一定先等待 `initial_delay`。之後每次讀取：
/// - 非 2xx：立即失敗，不重試
/// - `succeeded` 或沒有 `status`：完成
/// - `failed`：回傳 [`InvoiceError::AnalysisFailed`]
/// - 其他狀態：退避後再讀，直到次數或時間用盡，回傳 [`PollOutcome::StillProcessing`]
#[derive(Debug, Clone)]
pub struct ResultPoller {
    policy: PollPolicy,
}

impl ResultPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn poll(&self, client: &AnalysisClient, job: &AnalysisJob) -> Result<PollOutcome> {
        let max_attempts = self.policy.effective_max_attempts();

        tracing::info!(
            "⏳ Waiting {:?} before fetching result {}",
            self.policy.initial_delay,
            job.result_id
        );
        tokio::time::sleep(self.policy.initial_delay).await;

        let started = Instant::now();
        let mut interval = self.policy.interval;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let result = client.get_result(&job.result_id).await?;

            let status = match result.status() {
                None => {
                    tracing::debug!("Result has no status field, treating it as final");
                    return Ok(PollOutcome::Completed { result, attempts });
                }
                Some(STATUS_SUCCEEDED) => {
                    tracing::info!(
                        "✅ Analysis {} succeeded after {} attempt(s)",
                        job.result_id,
                        attempts
                    );
                    return Ok(PollOutcome::Completed { result, attempts });
                }
                Some(STATUS_FAILED) => {
                    return Err(InvoiceError::AnalysisFailed {
                        result_id: job.result_id.clone(),
                        message: result.error_message().unwrap_or("Unknown error").to_string(),
                    });
                }
                Some(other) => other.to_string(),
            };

            let out_of_time = started.elapsed() + interval > self.policy.timeout;
            if attempts >= max_attempts || out_of_time {
                tracing::warn!(
                    "⚠️ Analysis {} still {} after {} attempt(s)",
                    job.result_id,
                    status,
                    attempts
                );
                return Ok(PollOutcome::StillProcessing { status, attempts });
            }

            tracing::debug!(
                "Analysis {} is {}, retrying in {:?} (attempt {}/{})",
                job.result_id,
                status,
                interval,
                attempts,
                max_attempts
            );
            tokio::time::sleep(interval).await;
            interval = self.policy.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;
    use crate::domain::model::PollMode;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const RESULT_PATH: &str = "/formrecognizer/documentModels/prebuilt-invoice/analyzeResults/job-7";

    fn client_for(server: &MockServer) -> AnalysisClient {
        let toml_content = format!(
            r#"
[analysis]
endpoint = "{}"
subscription_key = "poll-key"

[storage]
account_url = "https://account.blob.core.windows.net"
container = "invoices"
"#,
            server.base_url()
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        AnalysisClient::from_config(&config).unwrap()
    }

    fn job() -> AnalysisJob {
        AnalysisJob {
            result_id: "job-7".to_string(),
            operation_location: format!("https://host{}?api-version=2023-07-31", RESULT_PATH),
        }
    }

    fn fast_policy(mode: PollMode, max_attempts: u32) -> PollPolicy {
        PollPolicy {
            mode,
            initial_delay: Duration::from_millis(200),
            interval: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(40),
            max_attempts,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_waits_initial_delay_before_single_request() {
        let server = MockServer::start();
        let result_mock = server.mock(|when, then| {
            when.method(GET)
                .path(RESULT_PATH)
                .query_param("api-version", "2023-07-31")
                .header("ocp-apim-subscription-key", "poll-key");
            then.status(200)
                .json_body(json!({"status": "succeeded", "analyzeResult": {"tables": []}}));
        });

        let poller = ResultPoller::new(fast_policy(PollMode::SingleShot, 1));
        let started = Instant::now();
        let outcome = poller.poll(&client_for(&server), &job()).await;

        assert!(started.elapsed() >= Duration::from_millis(200));
        result_mock.assert_hits(1);
        match assert_ok!(outcome) {
            PollOutcome::Completed { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_success_fails_fast_without_retry() {
        let server = MockServer::start();
        let result_mock = server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(500).body("internal error");
        });

        let poller = ResultPoller::new(fast_policy(PollMode::UntilComplete, 10));
        let err = assert_err!(poller.poll(&client_for(&server), &job()).await);

        result_mock.assert_hits(1);
        assert!(matches!(err, InvoiceError::HttpStatusError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_running_until_attempts_exhausted() {
        let server = MockServer::start();
        let result_mock = server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(200).json_body(json!({"status": "running"}));
        });

        let poller = ResultPoller::new(fast_policy(PollMode::UntilComplete, 3));
        let outcome = assert_ok!(poller.poll(&client_for(&server), &job()).await);

        result_mock.assert_hits(3);
        assert_eq!(
            outcome,
            PollOutcome::StillProcessing {
                status: "running".to_string(),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_single_shot_reports_still_processing() {
        let server = MockServer::start();
        let result_mock = server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(200).json_body(json!({"status": "notStarted"}));
        });

        let poller = ResultPoller::new(fast_policy(PollMode::SingleShot, 30));
        let outcome = assert_ok!(poller.poll(&client_for(&server), &job()).await);

        result_mock.assert_hits(1);
        assert!(matches!(outcome, PollOutcome::StillProcessing { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_timeout_stops_polling() {
        let server = MockServer::start();
        let result_mock = server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(200).json_body(json!({"status": "running"}));
        });

        let mut policy = fast_policy(PollMode::UntilComplete, 100);
        policy.interval = Duration::from_millis(300);
        policy.timeout = Duration::from_millis(100);

        let poller = ResultPoller::new(policy);
        let outcome = assert_ok!(poller.poll(&client_for(&server), &job()).await);

        result_mock.assert_hits(1);
        assert!(matches!(outcome, PollOutcome::StillProcessing { .. }));
    }

    #[tokio::test]
    async fn test_failed_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(200).json_body(json!({
                "status": "failed",
                "error": {"code": "InvalidContent", "message": "The file is corrupted"}
            }));
        });

        let poller = ResultPoller::new(fast_policy(PollMode::UntilComplete, 5));
        match poller.poll(&client_for(&server), &job()).await {
            Err(InvoiceError::AnalysisFailed { result_id, message }) => {
                assert_eq!(result_id, "job-7");
                assert_eq!(message, "The file is corrupted");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_body_without_status_is_final() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(RESULT_PATH);
            then.status(200).json_body(json!({"analyzeResult": {"tables": []}}));
        });

        let poller = ResultPoller::new(fast_policy(PollMode::UntilComplete, 5));
        let outcome = assert_ok!(poller.poll(&client_for(&server), &job()).await);
        assert!(matches!(outcome, PollOutcome::Completed { attempts: 1, .. }));
    }
}

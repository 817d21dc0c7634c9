use crate::domain::model::{AnalysisJob, AnalysisResult, Document, PollPolicy, StorageReference};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 物件儲存：寫入文件並回傳可公開解析的 URL
pub trait Storage: Send + Sync {
    fn upload(
        &self,
        document: &Document,
    ) -> impl std::future::Future<Output = Result<StorageReference>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn endpoint(&self) -> &str;
    fn model_id(&self) -> &str;
    fn api_version(&self) -> &str;
    fn subscription_key(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn poll_policy(&self) -> PollPolicy;
    fn output_path(&self) -> &str;
}

/// 輪詢結果：完成，或在次數/時間用盡時仍在處理
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed {
        result: AnalysisResult,
        attempts: u32,
    },
    StillProcessing {
        status: String,
        attempts: u32,
    },
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn upload(&self, document: &Document) -> Result<StorageReference>;
    async fn submit(&self, reference: &StorageReference) -> Result<AnalysisJob>;
    async fn fetch(&self, job: &AnalysisJob) -> Result<PollOutcome>;
}

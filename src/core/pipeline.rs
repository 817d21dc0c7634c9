use crate::core::client::AnalysisClient;
use crate::core::poller::ResultPoller;
use crate::core::{AnalysisJob, ConfigProvider, Document, Pipeline, PollOutcome, Storage, StorageReference};
use crate::utils::error::Result;

/// 上傳 -> 送出分析 -> 輪詢結果
pub struct InvoicePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) client: AnalysisClient,
    pub(crate) poller: ResultPoller,
}

impl<S: Storage, C: ConfigProvider> InvoicePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = AnalysisClient::from_config(&config)?;
        let poller = ResultPoller::new(config.poll_policy());
        Ok(Self {
            storage,
            config,
            client,
            poller,
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for InvoicePipeline<S, C> {
    async fn upload(&self, document: &Document) -> Result<StorageReference> {
        tracing::debug!("Uploading {} to storage", document.name);
        self.storage.upload(document).await
    }

    async fn submit(&self, reference: &StorageReference) -> Result<AnalysisJob> {
        tracing::debug!(
            "Submitting {} to model {} (api-version {})",
            reference,
            self.config.model_id(),
            self.config.api_version()
        );
        self.client.submit(&reference.url).await
    }

    async fn fetch(&self, job: &AnalysisJob) -> Result<PollOutcome> {
        self.poller.poll(&self.client, job).await
    }
}

use crate::config::toml_config::BlobLocation;
use crate::domain::model::{Document, StorageReference};
use crate::domain::ports::Storage;
use crate::utils::error::{InvoiceError, Result};
use reqwest::Client;
use url::Url;

const BLOB_SERVICE_VERSION: &str = "2021-08-06";

/// Azure Blob Storage，以 SAS 授權的 Put Blob 上傳
#[derive(Debug, Clone)]
pub struct BlobStorage {
    client: Client,
    location: BlobLocation,
}

impl BlobStorage {
    pub fn new(client: Client, location: BlobLocation) -> Self {
        Self { client, location }
    }

    /// `{account_url}/{container}/{blob}`，路徑段會被編碼
    pub fn blob_url(&self, blob_name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.location.account_url).map_err(|e| {
            InvoiceError::InvalidConfigValueError {
                field: "storage.account_url".to_string(),
                value: self.location.account_url.clone(),
                reason: e.to_string(),
            }
        })?;

        url.path_segments_mut()
            .map_err(|_| InvoiceError::InvalidConfigValueError {
                field: "storage.account_url".to_string(),
                value: self.location.account_url.clone(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(&self.location.container)
            .push(blob_name);

        Ok(url)
    }

    fn with_sas(&self, mut url: Url) -> Url {
        if let Some(sas) = &self.location.sas_token {
            url.set_query(Some(sas));
        }
        url
    }
}

impl Storage for BlobStorage {
    async fn upload(&self, document: &Document) -> Result<StorageReference> {
        let blob_url = self.blob_url(&document.name)?;
        let upload_url = self.with_sas(blob_url.clone());

        tracing::debug!(
            "Uploading {} ({} bytes) to container {}",
            document.name,
            document.data.len(),
            self.location.container
        );

        // 同名 blob 直接覆寫
        let response = self
            .client
            .put(upload_url.clone())
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", BLOB_SERVICE_VERSION)
            .header(reqwest::header::CONTENT_TYPE, &document.content_type)
            .body(document.data.clone())
            .send()
            .await
            .map_err(|e| InvoiceError::UploadError {
                blob: document.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvoiceError::UploadError {
                blob: document.name.clone(),
                message: format!("storage returned HTTP {}: {}", status, body),
            });
        }

        let link = if self.location.link_with_sas {
            upload_url
        } else {
            blob_url
        };
        Ok(StorageReference::new(link.to_string()))
    }
}

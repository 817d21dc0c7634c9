use crate::domain::model::{Document, StorageReference};
use crate::domain::ports::Storage;
use crate::utils::error::{InvoiceError, Result};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

/// S3 儲存：上傳後回傳預簽的 GET URL，讓分析服務可以直接讀取
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    presign_expires: Duration,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, presign_expires: Duration) -> Self {
        Self {
            client,
            bucket,
            presign_expires,
        }
    }

    /// 對既有物件產生預簽 URL
    pub async fn presign(&self, bucket: &str, key: &str) -> Result<StorageReference> {
        let presigning = PresigningConfig::expires_in(self.presign_expires).map_err(|e| {
            InvoiceError::ConfigError {
                message: format!("Invalid presign expiry: {}", e),
            }
        })?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| InvoiceError::UploadError {
                blob: key.to_string(),
                message: format!("Failed to presign S3 object: {}", e),
            })?;

        Ok(StorageReference::new(request.uri().to_string()))
    }
}

impl Storage for S3Storage {
    async fn upload(&self, document: &Document) -> Result<StorageReference> {
        let key = document.name.clone();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&document.content_type)
            .body(ByteStream::from(document.data.clone()))
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                tracing::error!(
                    "❌ S3 put_object failed: {:?} ({})",
                    service_error.code(),
                    service_error.message().unwrap_or("no message")
                );
                InvoiceError::UploadError {
                    blob: key.clone(),
                    message: service_error.to_string(),
                }
            })?;

        tracing::debug!("Uploaded s3://{}/{}", self.bucket, key);
        self.presign(&self.bucket, &key).await
    }
}

use crate::config::toml_config::{DEFAULT_API_VERSION, DEFAULT_MODEL_ID};
use crate::domain::model::{PollMode, PollPolicy};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{InvoiceError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_poll_policy, validate_range, validate_url, Validate,
};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub endpoint: String,
    pub model_id: String,
    pub api_version: String,
    pub subscription_key: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub presign_expires: Duration,
    pub poll_policy: PollPolicy,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 以任意來源讀取設定 (方便測試)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| InvoiceError::ConfigError {
                message: format!("{} environment variable is required", key),
            })
        };
        let parse_u64 = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|e| InvoiceError::InvalidConfigValueError {
                        field: key.to_string(),
                        value: v.clone(),
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        let defaults = PollPolicy::default();
        let mode = match lookup("POLL_MODE").as_deref() {
            None | Some("until_complete") => PollMode::UntilComplete,
            Some("single_shot") => PollMode::SingleShot,
            Some(other) => {
                return Err(InvoiceError::InvalidConfigValueError {
                    field: "POLL_MODE".to_string(),
                    value: other.to_string(),
                    reason: "expected until_complete or single_shot".to_string(),
                })
            }
        };

        let poll_policy = PollPolicy {
            mode,
            initial_delay: parse_u64("POLL_INITIAL_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_attempts: parse_u64("POLL_MAX_ATTEMPTS")?
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(defaults.max_attempts),
            timeout: parse_u64("POLL_TIMEOUT_SECONDS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        };

        Ok(Self {
            endpoint: required("AZURE_OCR_ENDPOINT")?,
            model_id: lookup("AZURE_OCR_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            api_version: lookup("AZURE_OCR_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            subscription_key: required("AZURE_OCR_KEY")?,
            s3_bucket: required("S3_BUCKET")?,
            s3_region: lookup("S3_REGION").unwrap_or_else(|| "ap-southeast-2".to_string()),
            presign_expires: Duration::from_secs(
                parse_u64("PRESIGN_EXPIRES_SECONDS")?.unwrap_or(3600),
            ),
            poll_policy,
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn subscription_key(&self) -> &str {
        &self.subscription_key
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn poll_policy(&self) -> PollPolicy {
        self.poll_policy.clone()
    }

    fn output_path(&self) -> &str {
        "/tmp"
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("AZURE_OCR_ENDPOINT", &self.endpoint)?;
        validate_non_empty_string("AZURE_OCR_KEY", &self.subscription_key)?;
        validate_s3_bucket_name("S3_BUCKET", &self.s3_bucket)?;
        validate_aws_region("S3_REGION", &self.s3_region)?;
        validate_poll_policy(&self.poll_policy, |key| format!("POLL_{}", key.to_uppercase()))?;
        // 預簽 URL 最長 7 天
        validate_range(
            "PRESIGN_EXPIRES_SECONDS",
            self.presign_expires.as_secs(),
            60,
            604_800,
        )?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let invalid = |reason: &str| InvoiceError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: bucket_name.to_string(),
        reason: reason.to_string(),
    };

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid("S3 bucket name must be between 3 and 63 characters"));
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid("S3 bucket name cannot start or end with a hyphen"));
    }

    Ok(())
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(InvoiceError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

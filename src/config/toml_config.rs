use crate::domain::model::{PollMode, PollPolicy};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{InvoiceError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_poll_policy, validate_range, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_MODEL_ID: &str = "prebuilt-invoice";
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub endpoint: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub subscription_key: String,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub connection_string: Option<String>,
    pub account_url: Option<String>,
    pub container: Option<String>,
    pub sas_token: Option<String>,
    /// 回傳的 URL 是否附帶 SAS (私有容器時需要)
    pub link_with_sas: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingConfig {
    pub mode: Option<PollMode>,
    pub initial_delay_ms: Option<u64>,
    pub interval_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: Option<String>,
    pub results_file: Option<String>,
    pub csv: Option<bool>,
    pub bundle: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// 解析後的 Blob 儲存位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub account_url: String,
    pub container: String,
    pub sas_token: Option<String>,
    pub link_with_sas: bool,
}

impl StorageConfig {
    /// 解析 Azure connection string (`Key=Value;...`)。
    /// 只支援 SAS，含 AccountKey 而沒有 SharedAccessSignature 時回傳錯誤。
    fn parse_connection_string(connection_string: &str) -> Result<(String, Option<String>)> {
        let mut protocol = "https".to_string();
        let mut account_name = None;
        let mut suffix = "core.windows.net".to_string();
        let mut blob_endpoint = None;
        let mut sas = None;
        let mut has_account_key = false;

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "AccountName" => account_name = Some(value.to_string()),
                "EndpointSuffix" => suffix = value.to_string(),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "SharedAccessSignature" => sas = Some(value.to_string()),
                "AccountKey" => has_account_key = true,
                _ => {}
            }
        }

        if sas.is_none() && has_account_key {
            return Err(InvoiceError::InvalidConfigValueError {
                field: "storage.connection_string".to_string(),
                value: "<redacted>".to_string(),
                reason: "shared key authorization is not supported, provide a SharedAccessSignature"
                    .to_string(),
            });
        }

        let account_url = match (blob_endpoint, account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(name)) => format!("{}://{}.blob.{}", protocol, name, suffix),
            (None, None) => {
                return Err(InvoiceError::MissingConfigError {
                    field: "storage.connection_string.AccountName".to_string(),
                })
            }
        };

        Ok((account_url, sas))
    }

    pub fn blob_location(&self) -> Result<BlobLocation> {
        let (account_url, connection_sas) = match &self.connection_string {
            Some(cs) => {
                let (url, sas) = Self::parse_connection_string(cs)?;
                (Some(url), sas)
            }
            None => (None, None),
        };

        let account_url = self
            .account_url
            .clone()
            .or(account_url)
            .ok_or_else(|| InvoiceError::MissingConfigError {
                field: "storage.account_url".to_string(),
            })?;
        let container = self
            .container
            .clone()
            .ok_or_else(|| InvoiceError::MissingConfigError {
                field: "storage.container".to_string(),
            })?;
        let sas_token = self
            .sas_token
            .clone()
            .or(connection_sas)
            .map(|sas| sas.trim_start_matches('?').to_string())
            .filter(|sas| !sas.is_empty());

        Ok(BlobLocation {
            account_url: account_url.trim_end_matches('/').to_string(),
            container,
            sas_token,
            link_with_sas: self.link_with_sas.unwrap_or(false),
        })
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(InvoiceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| InvoiceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AZURE_OCR_KEY})，未設定者保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn results_file(&self) -> &str {
        self.output
            .results_file
            .as_deref()
            .unwrap_or("local_results.json")
    }

    pub fn csv_enabled(&self) -> bool {
        self.output.csv.unwrap_or(true)
    }

    pub fn bundle_enabled(&self) -> bool {
        self.output.bundle.unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    fn validate_polling(&self) -> Result<()> {
        validate_poll_policy(&self.poll_policy(), |key| format!("polling.{}", key))
    }
}

impl ConfigProvider for TomlConfig {
    fn endpoint(&self) -> &str {
        &self.analysis.endpoint
    }

    fn model_id(&self) -> &str {
        &self.analysis.model_id
    }

    fn api_version(&self) -> &str {
        &self.analysis.api_version
    }

    fn subscription_key(&self) -> &str {
        &self.analysis.subscription_key
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.request_timeout_seconds.unwrap_or(30))
    }

    fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        let polling = &self.polling;
        PollPolicy {
            mode: polling.mode.unwrap_or(defaults.mode),
            initial_delay: polling
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            interval: polling
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            backoff_multiplier: polling
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            max_interval: polling
                .max_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_interval),
            max_attempts: polling.max_attempts.unwrap_or(defaults.max_attempts),
            timeout: polling
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    fn output_path(&self) -> &str {
        self.output.output_path.as_deref().unwrap_or("./output")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("analysis.endpoint", &self.analysis.endpoint)?;
        validate_non_empty_string("analysis.model_id", &self.analysis.model_id)?;
        validate_non_empty_string("analysis.api_version", &self.analysis.api_version)?;
        validate_non_empty_string("analysis.subscription_key", &self.analysis.subscription_key)?;
        if self.analysis.subscription_key.starts_with("${") {
            return Err(InvoiceError::MissingConfigError {
                field: "analysis.subscription_key".to_string(),
            });
        }
        validate_range(
            "analysis.request_timeout_seconds",
            self.request_timeout().as_secs(),
            1,
            600,
        )?;

        let location = self.storage.blob_location()?;
        validate_url("storage.account_url", &location.account_url)?;
        validate_non_empty_string("storage.container", &location.container)?;

        self.validate_polling()?;
        validate_path("output.output_path", self.output_path())?;
        validate_path("output.results_file", self.results_file())?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[analysis]
endpoint = "https://ezofic.cognitiveservices.azure.com/"
subscription_key = "secret"

[storage]
account_url = "https://account.blob.core.windows.net/"
container = "invoices"
sas_token = "?sv=2022-11-02&sig=abc"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.model_id(), "prebuilt-invoice");
        assert_eq!(config.api_version(), "2023-07-31");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.output_path(), "./output");
        assert_eq!(config.results_file(), "local_results.json");
        assert!(config.csv_enabled());
        assert!(!config.bundle_enabled());
        assert!(config.validate().is_ok());

        let policy = config.poll_policy();
        assert_eq!(policy, PollPolicy::default());
        assert_eq!(policy.initial_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_blob_location_normalizes_sas() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();
        let location = config.storage.blob_location().unwrap();
        assert_eq!(location.account_url, "https://account.blob.core.windows.net");
        assert_eq!(location.sas_token.as_deref(), Some("sv=2022-11-02&sig=abc"));
        assert!(!location.link_with_sas);
    }

    #[test]
    fn test_polling_section_overrides_defaults() {
        let content = format!(
            "{}\n[polling]\nmode = \"single_shot\"\ninitial_delay_ms = 500\nmax_attempts = 4\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        let policy = config.poll_policy();
        assert_eq!(policy.mode, PollMode::SingleShot);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.effective_max_attempts(), 1);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("INVOICE_OCR_TEST_KEY", "from-env");

        let content = BASIC.replace("\"secret\"", "\"${INVOICE_OCR_TEST_KEY}\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.subscription_key(), "from-env");

        std::env::remove_var("INVOICE_OCR_TEST_KEY");
    }

    #[test]
    fn test_unresolved_key_fails_validation() {
        let content = BASIC.replace("\"secret\"", "\"${INVOICE_OCR_UNSET_VARIABLE}\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(InvoiceError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_connection_string_with_sas() {
        let content = r#"
[analysis]
endpoint = "https://ocr.example.com"
subscription_key = "secret"

[storage]
connection_string = "DefaultEndpointsProtocol=https;AccountName=ezstorage;EndpointSuffix=core.windows.net;SharedAccessSignature=sv=2022&sig=xyz"
container = "ezofic2"
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        let location = config.storage.blob_location().unwrap();
        assert_eq!(location.account_url, "https://ezstorage.blob.core.windows.net");
        assert_eq!(location.container, "ezofic2");
        assert_eq!(location.sas_token.as_deref(), Some("sv=2022&sig=xyz"));
    }

    #[test]
    fn test_connection_string_with_account_key_is_rejected() {
        let storage = StorageConfig {
            connection_string: Some(
                "DefaultEndpointsProtocol=https;AccountName=ezstorage;AccountKey=abc==;EndpointSuffix=core.windows.net"
                    .to_string(),
            ),
            container: Some("invoices".to_string()),
            ..StorageConfig::default()
        };
        assert!(storage.blob_location().is_err());
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC.replace("https://ezofic.cognitiveservices.azure.com/", "invalid-url");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = format!("{}\n[polling]\nbackoff_multiplier = 0.5\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let content = format!(
            "{}\n[polling]\ninterval_ms = 0\nmax_interval_ms = 0\nmax_attempts = 1000\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        match config.validate() {
            Err(InvoiceError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, "polling.interval_ms")
            }
            other => panic!("unexpected validation result: {:?}", other),
        }

        let content = format!("{}\n[polling]\ntimeout_seconds = 0\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.container.as_deref(), Some("invoices"));
    }
}

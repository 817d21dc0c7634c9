use crate::config::toml_config::TomlConfig;
use crate::domain::model::PollMode;
use crate::utils::error::Result;
use crate::utils::validation::{validate_document_extension, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "invoice-ocr")]
#[command(about = "Upload an invoice, run document analysis and print the extracted tables")]
pub struct CliConfig {
    /// Invoice to analyse (PDF or Word document)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = "invoice-ocr.toml")]
    pub config: PathBuf,

    /// Override output directory from config
    #[arg(long)]
    pub output_path: Option<String>,

    /// Read the result once after the initial delay instead of polling until complete
    #[arg(long)]
    pub single_shot: bool,

    /// Also write a zip bundle of the results
    #[arg(long)]
    pub bundle: bool,

    /// Do not write per-table CSV files
    #[arg(long)]
    pub no_csv: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory after each phase")]
    pub monitor: bool,

    /// Validate configuration and input without calling any service
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 載入 TOML 並套用命令列覆蓋設定
    pub fn load_service_config(&self) -> Result<TomlConfig> {
        let mut config = TomlConfig::from_file(&self.config)?;

        if let Some(output_path) = &self.output_path {
            config.output.output_path = Some(output_path.clone());
            tracing::info!("🔧 Output path overridden to: {}", output_path);
        }
        if self.single_shot {
            config.polling.mode = Some(PollMode::SingleShot);
            tracing::info!("🔧 Polling mode overridden to: single_shot");
        }
        if self.bundle {
            config.output.bundle = Some(true);
        }
        if self.no_csv {
            config.output.csv = Some(false);
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_document_extension("file", &self.file)?;
        Ok(())
    }
}

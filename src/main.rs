use clap::Parser;
use invoice_ocr::core::engine::Progress;
use invoice_ocr::core::Document;
use invoice_ocr::domain::ports::ConfigProvider;
use invoice_ocr::output::display::render_report;
use invoice_ocr::utils::error::{ErrorSeverity, InvoiceError};
use invoice_ocr::utils::{logger, validation::Validate};
use invoice_ocr::{
    AnalysisEngine, BlobStorage, CliConfig, InvoicePipeline, ReportWriter, TomlConfig,
};

fn fail(e: &InvoiceError) -> ! {
    tracing::error!(
        "❌ Invoice analysis failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2, // 稍後重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(cli: &CliConfig, config: &TomlConfig) {
    let policy = config.poll_policy();
    tracing::info!("📋 Configuration summary:");
    tracing::info!("   Endpoint: {}", config.endpoint());
    tracing::info!("   Model: {} (api-version {})", config.model_id(), config.api_version());
    tracing::info!(
        "   Polling: {:?}, initial delay {:?}, up to {} attempt(s) within {:?}",
        policy.mode,
        policy.initial_delay,
        policy.effective_max_attempts(),
        policy.timeout
    );
    tracing::info!("   Output: {}", config.output_path());
    tracing::info!("   Input: {}", cli.file.display());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::info!("🚀 Starting invoice-ocr");

    let config = match cli.validate().and_then(|_| cli.load_service_config()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if let Err(e) = config.validate() {
        fail(&e);
    }
    display_config_summary(&cli, &config);

    let document = match Document::from_path(&cli.file).await {
        Ok(document) => document,
        Err(e) => fail(&e),
    };
    println!("### File Details:");
    println!("{}", document.details());

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No upload or analysis will occur");
        println!("✅ Configuration and input are valid");
        return Ok(());
    }

    let location = match config.storage.blob_location() {
        Ok(location) => location,
        Err(e) => fail(&e),
    };
    let writer = ReportWriter::new(config.output_path(), config.results_file())
        .with_csv(config.csv_enabled())
        .with_bundle(config.bundle_enabled());
    let monitor_enabled = cli.monitor || config.monitoring_enabled();

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let storage = BlobStorage::new(http, location);
    let pipeline = match InvoicePipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor_enabled).with_progress(
        |progress| match progress {
            Progress::Uploaded(reference) => {
                println!("✅ File uploaded successfully! View file: {}", reference)
            }
            Progress::Submitted(job) => {
                println!("Document analysis initiated. Result ID: {}", job.result_id)
            }
            Progress::Completed { .. } => println!("✅ Document analysis completed!\n"),
        },
    );

    println!("Uploading file to storage...");
    let report = match engine.run(document).await {
        Ok(report) => report,
        Err(e) => fail(&e),
    };

    println!("{}", render_report(&report));

    match writer.write(&report) {
        Ok(paths) => {
            for path in paths {
                println!("📁 Results saved to {}", path.display());
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use invoice_ocr::core::{StorageReference, TableGrid};
use invoice_ocr::domain::model::InvoiceSummary;
use invoice_ocr::output::display::NO_TABLE_NOTICE;
use invoice_ocr::utils::{logger, validation::Validate};
use invoice_ocr::{AnalysisEngine, InvoicePipeline, LambdaConfig, S3Storage};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Request {
    /// 已上傳到 S3 的文件 key
    pub key: String,
    pub bucket: Option<String>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub result_id: String,
    pub table_count: usize,
    pub tables: Vec<TableGrid>,
    pub summary: InvoiceSummary,
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting invoice analysis Lambda function");

    let config = LambdaConfig::from_env()?;
    config.validate()?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .region(Region::new(config.s3_region.clone()))
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(s3_config);

    let bucket = event
        .payload
        .bucket
        .clone()
        .unwrap_or_else(|| config.s3_bucket.clone());
    let storage = S3Storage::new(s3_client, config.s3_bucket.clone(), config.presign_expires);

    let reference: StorageReference = storage.presign(&bucket, &event.payload.key).await?;
    tracing::info!("Presigned s3://{}/{}", bucket, event.payload.key);

    let pipeline = InvoicePipeline::new(storage, config)?;
    let engine = AnalysisEngine::new(pipeline);
    let report = engine.analyze_reference(reference).await?;

    let tables = report.tables.grids().to_vec();
    let response = Response {
        message: if tables.is_empty() {
            NO_TABLE_NOTICE.to_string()
        } else {
            "Document analysis completed".to_string()
        },
        result_id: report.job.result_id,
        table_count: tables.len(),
        tables,
        summary: report.summary,
    };

    tracing::info!("Invoice analysis Lambda function completed successfully");
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}

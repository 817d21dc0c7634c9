pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod output;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use adapters::S3Storage;
#[cfg(feature = "lambda")]
pub use config::lambda::LambdaConfig;

pub use adapters::BlobStorage;
pub use config::TomlConfig;
pub use core::{engine::AnalysisEngine, pipeline::InvoicePipeline};
pub use output::ReportWriter;
pub use utils::error::{InvoiceError, Result};

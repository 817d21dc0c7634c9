pub mod client;
pub mod engine;
pub mod operation;
pub mod pipeline;
pub mod poller;
pub mod reshape;
pub mod summary;

pub use crate::domain::model::{
    AnalysisJob, AnalysisReport, AnalysisResult, Document, StorageReference, TableGrid,
    TableOutcome,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, PollOutcome, Storage};
pub use crate::utils::error::Result;

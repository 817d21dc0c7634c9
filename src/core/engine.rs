use crate::core::reshape::reshape_tables;
use crate::core::summary::extract_invoice_summary;
use crate::core::{
    AnalysisJob, AnalysisReport, Document, Pipeline, PollOutcome, StorageReference,
};
use crate::utils::error::{InvoiceError, Result};
use crate::utils::monitor::PhaseMonitor;
use std::time::Instant;

/// 每個階段完成時通知呼叫端 (CLI 用來即時輸出)
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    Uploaded(&'a StorageReference),
    Submitted(&'a AnalysisJob),
    Completed { attempts: u32 },
}

type ProgressHook = Box<dyn Fn(Progress<'_>) + Send + Sync>;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: PhaseMonitor,
    on_progress: Option<ProgressHook>,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(monitor_enabled),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, hook: impl Fn(Progress<'_>) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(hook));
        self
    }

    fn notify(&self, progress: Progress<'_>) {
        if let Some(hook) = &self.on_progress {
            hook(progress);
        }
    }

    pub fn monitor(&self) -> &PhaseMonitor {
        &self.monitor
    }

    pub async fn run(&self, document: Document) -> Result<AnalysisReport> {
        tracing::info!("📄 {}", document.details());

        // Upload
        tracing::info!("☁️ Uploading file to storage...");
        let started = Instant::now();
        let reference = self.pipeline.upload(&document).await?;
        self.monitor.record("upload", started.elapsed());
        tracing::info!("✅ File uploaded successfully: {}", reference);
        self.notify(Progress::Uploaded(&reference));
        drop(document);

        self.analyze_reference(reference).await
    }

    /// 已在儲存空間中的文件，直接送出分析
    pub async fn analyze_reference(&self, reference: StorageReference) -> Result<AnalysisReport> {
        // Submit
        let started = Instant::now();
        let job = self.pipeline.submit(&reference).await?;
        self.monitor.record("submit", started.elapsed());
        tracing::info!("🔎 Document analysis initiated. Result ID: {}", job.result_id);
        self.notify(Progress::Submitted(&job));

        // Poll
        let started = Instant::now();
        let outcome = self.pipeline.fetch(&job).await?;
        self.monitor.record("poll", started.elapsed());

        let (result, attempts) = match outcome {
            PollOutcome::Completed { result, attempts } => (result, attempts),
            PollOutcome::StillProcessing { status, attempts } => {
                return Err(InvoiceError::StillProcessing {
                    result_id: job.result_id,
                    status,
                    attempts,
                });
            }
        };
        tracing::info!("✅ Document analysis completed!");
        self.notify(Progress::Completed { attempts });

        // Render
        let started = Instant::now();
        let result = result.without_pages();
        let tables = reshape_tables(&result);
        let summary = extract_invoice_summary(&result);
        self.monitor.record("render", started.elapsed());

        if self.monitor.is_enabled() {
            self.monitor.log_final_stats();
        }

        Ok(AnalysisReport {
            reference,
            job,
            result,
            tables,
            summary,
            attempts,
        })
    }
}

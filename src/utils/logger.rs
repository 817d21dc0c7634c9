use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 輸出格式：終端機用精簡格式，Lambda 用 JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// `RUST_LOG` 優先；否則只開本 crate 的日誌，並壓低 HTTP 堆疊的雜訊
pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = if verbose {
            "invoice_ocr=debug,reqwest=info,hyper=warn,info"
        } else {
            "invoice_ocr=info,warn"
        };
        EnvFilter::new(directives)
    })
}

pub fn init(format: LogFormat, verbose: bool) {
    let registry = tracing_subscriber::registry().with(build_filter(verbose));
    let base = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => registry.with(base.compact()).init(),
        // CloudWatch 自帶時間戳
        LogFormat::Json => registry.with(base.without_time().json()).init(),
    }
}

pub fn init_cli_logger(verbose: bool) {
    init(LogFormat::Compact, verbose);
}

pub fn init_lambda_logger() {
    init(LogFormat::Json, false);
}

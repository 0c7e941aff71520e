use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 日誌輸出格式；兩者都寫到 stderr，stdout 留給報告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    /// CI 日誌收集使用
    Json,
}

/// `RUST_LOG` 未設定時使用的過濾規則
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "docs_toml_verify=debug,info"
    } else {
        "docs_toml_verify=info"
    }
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let layer = match format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
}

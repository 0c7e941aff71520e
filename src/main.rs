use clap::Parser;
use docs_toml_verify::utils::logger::{self, LogFormat};
use docs_toml_verify::utils::validation::Validate;
use docs_toml_verify::{CliConfig, FailurePolicy, SnippetState, VerificationReport, VerifyEngine};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    // 初始化日誌
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("Starting docs-toml-verify");

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            return ExitCode::from(e.exit_code());
        }
    };
    tracing::debug!("Resolved config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        return ExitCode::from(e.exit_code());
    }

    let engine = VerifyEngine::new(config);

    match engine.run().await {
        Ok(report) => {
            display_report(&report);
            if report.is_success() {
                println!("\nAll snippets verified successfully!");
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!("❌ Verification run failed: {} ({:?})", e, e.severity());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            ExitCode::from(e.exit_code())
        }
    }
}

fn display_report(report: &VerificationReport) {
    for outcome in &report.outcomes {
        match &outcome.state {
            SnippetState::Verified { role, .. } => println!(
                "{} is a valid {} snippet",
                outcome.snippet.location(),
                role.label()
            ),
            SnippetState::Skipped { marker } => {
                println!("{} skipped (contains {})", outcome.snippet.location(), marker)
            }
            _ => {}
        }
    }

    let failures = report.failures();
    if failures.is_empty() {
        return;
    }

    eprintln!();
    for failure in &failures {
        eprintln!("{}", failure);
    }

    if report.policy == FailurePolicy::FailFast && report.unchecked > 0 {
        eprintln!(
            "⏭️ {} snippet(s) not checked (stopped at first failure)",
            report.unchecked
        );
    }
    eprintln!("❌ {} snippet(s) failed verification", failures.len());
}

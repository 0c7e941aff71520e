use crate::config::{FailurePolicy, TomlConfig, ValidatorKind, VerifyConfig};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "docs-toml-verify")]
#[command(about = "Verify the TOML snippets embedded in the documentation against pgdog configcheck")]
pub struct CliConfig {
    /// Optional TOML file with any subset of the settings below
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Documentation root to scan
    #[arg(long)]
    pub docs_root: Option<PathBuf>,

    /// Scratch directory for snippet files (cleared at start, removed at end)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Attempts per snippet before it is reported as failed
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Wall-clock budget for one attempt, in milliseconds
    #[arg(long)]
    pub attempt_timeout_ms: Option<u64>,

    /// Pinned validator image reference
    #[arg(long)]
    pub validator_image: Option<String>,

    #[arg(long, value_enum)]
    pub validator: Option<ValidatorKind>,

    /// Local pgdog binary used with `--validator binary`
    #[arg(long)]
    pub validator_binary: Option<String>,

    #[arg(long)]
    pub docker_binary: Option<String>,

    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Documentation file extension, without the dot
    #[arg(long)]
    pub doc_extension: Option<String>,

    #[arg(long, value_enum)]
    pub failure_policy: Option<FailurePolicy>,

    /// Shorthand for `--failure-policy fail-fast`
    #[arg(long, conflicts_with = "failure_policy")]
    pub fail_fast: bool,

    /// Snippets verified at the same time (each uses up to two processes)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Pause between attempts of the same snippet, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Skip snippets containing this text (repeatable)
    #[arg(long = "skip-marker")]
    pub skip_markers: Vec<String>,

    /// Leave the scratch directory in place after the run
    #[arg(long)]
    pub keep_scratch: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    /// 預設值 < 設定檔 < 命令列參數
    pub fn resolve(&self) -> Result<VerifyConfig> {
        let mut config = VerifyConfig::default();

        if let Some(path) = &self.config_file {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            config.apply_file(TomlConfig::from_file(path)?);
        }

        if let Some(v) = &self.docs_root {
            config.docs_root = v.clone();
        }
        if let Some(v) = &self.scratch_dir {
            config.scratch_dir = v.clone();
        }
        if let Some(v) = self.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = self.attempt_timeout_ms {
            config.attempt_timeout_ms = v;
        }
        if let Some(v) = &self.validator_image {
            config.validator_image = v.clone();
        }
        if let Some(v) = self.validator {
            config.validator = v;
        }
        if let Some(v) = &self.validator_binary {
            config.validator_binary = v.clone();
        }
        if let Some(v) = &self.docker_binary {
            config.docker_binary = v.clone();
        }
        if let Some(v) = &self.entrypoint {
            config.entrypoint = v.clone();
        }
        if let Some(v) = &self.doc_extension {
            config.doc_extension = v.clone();
        }
        if let Some(v) = self.failure_policy {
            config.failure_policy = v;
        }
        if self.fail_fast {
            config.failure_policy = FailurePolicy::FailFast;
        }
        if let Some(v) = self.max_concurrency {
            config.max_concurrency = v;
        }
        if let Some(v) = self.retry_delay_ms {
            config.retry_delay_ms = v;
        }
        if !self.skip_markers.is_empty() {
            config.skip_markers = self.skip_markers.clone();
        }
        if self.keep_scratch {
            config.keep_scratch = true;
        }

        Ok(config)
    }
}

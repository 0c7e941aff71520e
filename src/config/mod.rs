#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::{BinaryValidator, DockerValidator};
use crate::domain::ports::Validator;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_extension, validate_min, validate_non_empty_string, validate_path, validate_range,
    validate_scratch_outside, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use toml_config::TomlConfig;

pub const DEFAULT_DOCS_ROOT: &str = "docs";
pub const DEFAULT_SCRATCH_DIR: &str = "tests/bun/tmp";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// CI job 本身十分鐘就會被終止，每次嘗試給兩分鐘
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 120_000;
// TODO: switch back to the `main` tag once the published image includes `configcheck --users`
pub const DEFAULT_VALIDATOR_IMAGE: &str = "ghcr.io/pgdogdev/pgdog:main@sha256:3036d2ac7b684643dd187c42971f003f9d76e5f54cd129dcba742c309d7debd0";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const MAX_ATTEMPT_TIMEOUT_MS: u64 = 3_600_000;

/// 驗證失敗時的處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// 並行驗證所有片段，最後列出全部失敗
    #[default]
    FullReport,
    /// 依序驗證，遇到第一個失敗就停止
    FailFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorKind {
    #[default]
    Docker,
    Binary,
}

/// 合併預設值、設定檔與命令列參數後的最終設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyConfig {
    pub docs_root: PathBuf,
    pub scratch_dir: PathBuf,
    pub max_retries: u32,
    pub attempt_timeout_ms: u64,
    pub validator_image: String,
    pub validator: ValidatorKind,
    pub validator_binary: String,
    pub docker_binary: String,
    pub entrypoint: String,
    pub doc_extension: String,
    pub failure_policy: FailurePolicy,
    pub max_concurrency: usize,
    pub retry_delay_ms: u64,
    pub skip_markers: Vec<String>,
    pub keep_scratch: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from(DEFAULT_DOCS_ROOT),
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            max_retries: DEFAULT_MAX_RETRIES,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            validator_image: DEFAULT_VALIDATOR_IMAGE.to_string(),
            validator: ValidatorKind::Docker,
            validator_binary: "pgdog".to_string(),
            docker_binary: "docker".to_string(),
            entrypoint: "pgdog".to_string(),
            doc_extension: "md".to_string(),
            failure_policy: FailurePolicy::FullReport,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_delay_ms: 0,
            skip_markers: Vec::new(),
            keep_scratch: false,
        }
    }
}

impl VerifyConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 套用設定檔中有指定的欄位
    pub fn apply_file(&mut self, file: TomlConfig) {
        if let Some(v) = file.docs_root {
            self.docs_root = v;
        }
        if let Some(v) = file.scratch_dir {
            self.scratch_dir = v;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = file.attempt_timeout_ms {
            self.attempt_timeout_ms = v;
        }
        if let Some(v) = file.validator_image {
            self.validator_image = v;
        }
        if let Some(v) = file.validator {
            self.validator = v;
        }
        if let Some(v) = file.validator_binary {
            self.validator_binary = v;
        }
        if let Some(v) = file.docker_binary {
            self.docker_binary = v;
        }
        if let Some(v) = file.entrypoint {
            self.entrypoint = v;
        }
        if let Some(v) = file.doc_extension {
            self.doc_extension = v;
        }
        if let Some(v) = file.failure_policy {
            self.failure_policy = v;
        }
        if let Some(v) = file.max_concurrency {
            self.max_concurrency = v;
        }
        if let Some(v) = file.retry_delay_ms {
            self.retry_delay_ms = v;
        }
        if let Some(v) = file.skip_markers {
            self.skip_markers = v;
        }
        if let Some(v) = file.keep_scratch {
            self.keep_scratch = v;
        }
    }

    /// 依設定建立外部驗證器
    pub fn build_validator(&self) -> Arc<dyn Validator> {
        match self.validator {
            ValidatorKind::Docker => Arc::new(DockerValidator::new(
                self.docker_binary.clone(),
                self.validator_image.clone(),
                self.entrypoint.clone(),
            )),
            ValidatorKind::Binary => Arc::new(BinaryValidator::new(self.validator_binary.clone())),
        }
    }
}

impl Validate for VerifyConfig {
    fn validate(&self) -> Result<()> {
        validate_path("docs_root", &self.docs_root)?;
        validate_path("scratch_dir", &self.scratch_dir)?;
        validate_scratch_outside("scratch_dir", &self.scratch_dir, &self.docs_root)?;
        validate_min("max_retries", self.max_retries, 1)?;
        validate_range(
            "attempt_timeout_ms",
            self.attempt_timeout_ms,
            1,
            MAX_ATTEMPT_TIMEOUT_MS,
        )?;
        validate_min("max_concurrency", self.max_concurrency, 1)?;
        validate_extension("doc_extension", &self.doc_extension)?;

        match self.validator {
            ValidatorKind::Docker => {
                validate_non_empty_string("validator_image", &self.validator_image)?;
                validate_non_empty_string("docker_binary", &self.docker_binary)?;
                validate_non_empty_string("entrypoint", &self.entrypoint)?;
            }
            ValidatorKind::Binary => {
                validate_non_empty_string("validator_binary", &self.validator_binary)?;
            }
        }

        Ok(())
    }
}

use crate::config::{FailurePolicy, ValidatorKind};
use crate::utils::error::{Result, VerifyError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 設定檔內容；所有欄位皆為選填，未指定者沿用預設值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub docs_root: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub max_retries: Option<u32>,
    pub attempt_timeout_ms: Option<u64>,
    pub validator_image: Option<String>,
    pub validator: Option<ValidatorKind>,
    pub validator_binary: Option<String>,
    pub docker_binary: Option<String>,
    pub entrypoint: Option<String>,
    pub doc_extension: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
    pub max_concurrency: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub skip_markers: Option<Vec<String>>,
    pub keep_scratch: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| VerifyError::ConfigError {
            message: format!("Cannot read config file {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| VerifyError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${VALIDATOR_IMAGE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| VerifyError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

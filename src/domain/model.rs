use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 從文件中擷取出的 TOML 片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// 相對於文件根目錄的路徑，使用 `/` 分隔
    #[serde(rename = "file")]
    pub source_file: String,
    pub content: String,
    /// 開頭 fence 所在行 (1-based)
    #[serde(rename = "line")]
    pub start_line: usize,
}

impl Snippet {
    pub fn new(source_file: impl Into<String>, content: impl Into<String>, start_line: usize) -> Self {
        Self {
            source_file: source_file.into(),
            content: content.into(),
            start_line,
        }
    }

    /// 對 `{"file","content","line"}` (依欄位宣告順序) 的 JSON 計算 MD5，作為暫存檔名與去重鍵
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let canonical = serde_json::to_string(self)?;
        Ok(Fingerprint(format!("{:x}", md5::compute(canonical.as_bytes()))))
    }

    /// `file:line` 形式的位置描述
    pub fn location(&self) -> String {
        format!("{}:{}", self.source_file, self.start_line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 前 12 個字元，用於容器名稱
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 片段可能代表的兩種配置檔
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Config,
    Users,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Config, Role::Users];

    /// 傳給 `configcheck` 的旗標
    pub fn flag(&self) -> &'static str {
        match self {
            Role::Config => "--config",
            Role::Users => "--users",
        }
    }

    /// 容器內掛載路徑
    pub fn container_path(&self) -> &'static str {
        match self {
            Role::Config => "/pgdog.toml",
            Role::Users => "/users.toml",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Config => "pgdog.toml",
            Role::Users => "users.toml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Config => "config",
            Role::Users => "users",
        }
    }

    /// 文件沒有標註角色，只能從內容猜測
    pub fn guess(content: &str) -> Role {
        if content.contains("[[users]]") {
            Role::Users
        } else {
            Role::Config
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 單次外部檢查的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    /// `output` 為 stdout/stderr 的節錄，方便追查偶發失敗
    Rejected { exit_code: Option<i32>, output: String },
    Cancelled,
}

impl CheckOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Snippet::new("guide/config.md", "[general]\nport = 6432", 10);
        let b = Snippet::new("guide/config.md", "[general]\nport = 6432", 10);

        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().as_str().len(), 32);
        assert!(a.fingerprint().unwrap().as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_hashes_fields_in_declared_order() {
        let snippet = Snippet::new("a.md", "[general]", 10);

        assert_eq!(
            serde_json::to_string(&snippet).unwrap(),
            r#"{"file":"a.md","content":"[general]","line":10}"#
        );
        assert_eq!(
            snippet.fingerprint().unwrap().as_str(),
            "870443c88b4684d834aa511690224c06"
        );
    }

    #[test]
    fn test_fingerprint_changes_with_each_field() {
        let base = Snippet::new("a.md", "[general]", 3);
        let other_file = Snippet::new("b.md", "[general]", 3);
        let other_content = Snippet::new("a.md", "[admin]", 3);
        let other_line = Snippet::new("a.md", "[general]", 4);

        assert_ne!(base.fingerprint().unwrap(), other_file.fingerprint().unwrap());
        assert_ne!(base.fingerprint().unwrap(), other_content.fingerprint().unwrap());
        assert_ne!(base.fingerprint().unwrap(), other_line.fingerprint().unwrap());
    }

    #[test]
    fn test_role_guess() {
        assert_eq!(Role::guess("[[users]]\nname = \"alice\""), Role::Users);
        assert_eq!(Role::guess("[general]\nhost = \"0.0.0.0\""), Role::Config);
    }

    #[test]
    fn test_location_and_short_fingerprint() {
        let snippet = Snippet::new("features/sharding.md", "[general]", 42);
        assert_eq!(snippet.location(), "features/sharding.md:42");
        assert_eq!(snippet.fingerprint().unwrap().short().len(), 12);
    }
}

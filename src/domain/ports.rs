use crate::domain::model::{CheckOutcome, Role};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub trait Storage: Send + Sync {
    /// 寫入檔案並回傳完整路徑
    fn write_file(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<PathBuf>> + Send;
}

/// 外部驗證器：判斷一個檔案是否為指定角色的合法配置
#[async_trait]
pub trait Validator: Send + Sync {
    /// `cancel` 觸發時必須終止外部程序並回傳 `CheckOutcome::Cancelled`
    async fn check(
        &self,
        role: Role,
        file: &Path,
        context: &CheckContext,
        cancel: &CancellationToken,
    ) -> Result<CheckOutcome>;

    fn describe(&self) -> String;
}

/// 一次檢查的識別資訊，用於命名容器與記錄日誌
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub run_id: String,
    pub fingerprint: String,
    pub attempt: u32,
}

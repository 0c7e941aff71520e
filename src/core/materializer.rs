use crate::domain::model::{Fingerprint, Role, Snippet};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, VerifyError};
use std::path::{Path, PathBuf};

/// 暫存目錄：開始時清空，結束時 (包含錯誤路徑) 自動刪除
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    keep: bool,
}

impl ScratchDir {
    /// 建立目錄 (若不存在) 並清除上次執行留下的檔案
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let setup_error = |source| VerifyError::SetupError {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&path).map_err(setup_error)?;

        for entry in std::fs::read_dir(&path).map_err(setup_error)? {
            let entry = entry.map_err(setup_error)?;
            let entry_path = entry.path();
            let file_type = entry.file_type().map_err(setup_error)?;
            if file_type.is_dir() {
                std::fs::remove_dir_all(&entry_path).map_err(setup_error)?;
            } else {
                std::fs::remove_file(&entry_path).map_err(setup_error)?;
            }
        }

        tracing::debug!("🧹 Scratch directory ready: {}", path.display());
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保留目錄，不在 drop 時刪除
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }

    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!("📁 Keeping scratch directory: {}", self.path.display());
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("🧹 Removed scratch directory: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "⚠️ Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Storage for ScratchDir {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let full_path = self.path.join(name);
        tokio::fs::write(&full_path, data).await?;
        Ok(full_path)
    }
}

/// 暫存檔的命名與內容格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `{fingerprint}.toml`，內容為片段本身
    Verify,
    /// `{role}_{fingerprint}.toml`，帶來源註解
    Export,
}

impl Layout {
    pub fn file_name(&self, snippet: &Snippet, fingerprint: &Fingerprint) -> String {
        match self {
            Layout::Verify => format!("{}.toml", fingerprint),
            Layout::Export => format!("{}_{}.toml", Role::guess(&snippet.content), fingerprint),
        }
    }

    pub fn render(&self, snippet: &Snippet) -> String {
        match self {
            Layout::Verify => format!("{}\n", snippet.content),
            Layout::Export => format!(
                "# file: {}\n# line_number: {}\n\n{}\n",
                snippet.source_file, snippet.start_line, snippet.content
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterializedSnippet {
    pub snippet: Snippet,
    pub fingerprint: Fingerprint,
    pub path: PathBuf,
}

/// 並行寫入所有片段；檔名由內容決定，不同片段不會互相覆蓋
pub async fn materialize<S: Storage>(
    storage: &S,
    snippets: Vec<Snippet>,
    layout: Layout,
) -> Result<Vec<MaterializedSnippet>> {
    let writes = snippets.into_iter().map(|snippet| async move {
        let fingerprint = snippet.fingerprint()?;
        let name = layout.file_name(&snippet, &fingerprint);
        let path = storage
            .write_file(&name, layout.render(&snippet).as_bytes())
            .await?;

        Ok::<_, VerifyError>(MaterializedSnippet {
            snippet,
            fingerprint,
            path,
        })
    });

    let materialized = futures::future::try_join_all(writes).await?;
    tracing::debug!("💾 Wrote {} snippet file(s)", materialized.len());
    Ok(materialized)
}

use crate::domain::model::Snippet;
use crate::utils::error::{Result, VerifyError};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// 開頭 fence：任意空白縮排 + ```toml + 同行其餘內容 + 換行
fn opening_fence() -> &'static Regex {
    static OPENING: OnceLock<Regex> = OnceLock::new();
    OPENING.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)```toml[^\n]*\r?\n").expect("opening fence pattern is valid")
    })
}

/// 結尾 fence 必須與開頭 fence 使用完全相同的縮排
fn closing_fence(indent: &str) -> Result<Regex> {
    let pattern = format!(r"(?m)^{}```", regex::escape(indent));
    Regex::new(&pattern).map_err(|e| VerifyError::ConfigError {
        message: format!("Invalid closing fence pattern: {}", e),
    })
}

/// 從單一文件文字中擷取所有 TOML 片段
pub fn extract_from_text(relative_path: &str, text: &str) -> Result<Vec<Snippet>> {
    let mut snippets = Vec::new();
    let mut position = 0;

    while let Some(open) = opening_fence().captures_at(text, position) {
        let whole = open.get(0).expect("group 0 always participates");
        let indent = open.get(1).map_or("", |m| m.as_str());
        let body_start = whole.end();

        let Some(close) = closing_fence(indent)?.find_at(text, body_start) else {
            // 沒有相同縮排的結尾 fence，從下一行繼續找
            position = body_start;
            continue;
        };

        let body = &text[body_start..close.start()];
        let start_line = text[..whole.start()].matches('\n').count() + 1;

        snippets.push(Snippet::new(relative_path, deindent(body, indent), start_line));
        position = close.end();
    }

    Ok(snippets)
}

/// 移除每行開頭的 fence 縮排；縮排不足的行保持原樣
pub fn deindent(body: &str, indent: &str) -> String {
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| line.strip_prefix(indent).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 遞迴掃描文件目錄，回傳所有片段。任何讀取失敗都會中止整個掃描。
pub fn extract_snippets(docs_root: &Path, extension: &str) -> Result<Vec<Snippet>> {
    let mut snippets = Vec::new();
    let mut files = 0usize;

    for entry in WalkDir::new(docs_root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| docs_root.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            VerifyError::ReadError { path, source }
        })?;

        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|ext| ext.to_str()) != Some(extension)
        {
            continue;
        }

        let text = std::fs::read_to_string(entry.path()).map_err(|source| VerifyError::ReadError {
            path: entry.path().to_path_buf(),
            source,
        })?;

        let relative_path = relative_display(docs_root, entry.path());
        let found = extract_from_text(&relative_path, &text)?;
        tracing::debug!("📄 {} → {} snippet(s)", relative_path, found.len());

        files += 1;
        snippets.extend(found);
    }

    tracing::info!("🔎 Scanned {} file(s), found {} TOML snippet(s)", files, snippets.len());
    Ok(snippets)
}

fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 依 fingerprint 去重，保留第一次出現的順序
pub fn dedup_by_fingerprint(snippets: Vec<Snippet>) -> Result<Vec<Snippet>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(snippets.len());
    for snippet in snippets {
        if seen.insert(snippet.fingerprint()?) {
            unique.push(snippet);
        }
    }
    Ok(unique)
}

use crate::config::{FailurePolicy, VerifyConfig};
use crate::core::extractor::{dedup_by_fingerprint, extract_snippets};
use crate::core::materializer::{materialize, Layout, MaterializedSnippet, ScratchDir};
use crate::core::verifier::{
    RetrySettings, SnippetOutcome, SnippetState, SnippetVerifier, DEFAULT_KILL_GRACE,
};
use crate::domain::model::Snippet;
use crate::domain::ports::Validator;
use crate::utils::error::{Result, VerifyError};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

static RUN_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// 容器名稱的前綴：秒級時間戳 + PID + 行程內序號，同一秒內啟動的多個執行不會撞名
pub fn new_run_id() -> String {
    format!(
        "{}_{}_{}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        std::process::id(),
        RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// 一次完整執行的結果
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub run_id: String,
    pub policy: FailurePolicy,
    /// 依檔案路徑與行號排列
    pub outcomes: Vec<SnippetOutcome>,
    /// fail-fast 時尚未檢查的片段數
    pub unchecked: usize,
    pub duration: Duration,
}

impl VerificationReport {
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(SnippetOutcome::is_failed)
    }

    pub fn failures(&self) -> Vec<VerifyError> {
        self.outcomes.iter().filter_map(SnippetOutcome::failure).collect()
    }

    pub fn verified(&self) -> impl Iterator<Item = &SnippetOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.verified_role().is_some())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SnippetOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.state, SnippetState::Skipped { .. }))
    }

    /// 實際呼叫外部驗證器的總次數
    pub fn total_attempts(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.attempts.len()).sum()
    }
}

pub struct VerifyEngine {
    config: VerifyConfig,
    validator: Arc<dyn Validator>,
    run_id: String,
}

impl VerifyEngine {
    pub fn new(config: VerifyConfig) -> Self {
        let validator = config.build_validator();
        Self::with_validator(config, validator)
    }

    pub fn with_validator(config: VerifyConfig, validator: Arc<dyn Validator>) -> Self {
        Self {
            config,
            validator,
            run_id: new_run_id(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<VerificationReport> {
        let started = Instant::now();
        tracing::info!(
            "🚀 Verifying TOML snippets under {} with {} (run {})",
            self.config.docs_root.display(),
            self.validator.describe(),
            self.run_id
        );

        // 任何離開路徑 (包含錯誤) 都會在 drop 時刪除暫存目錄
        let mut scratch = ScratchDir::prepare(&self.config.scratch_dir)?;
        scratch.set_keep(self.config.keep_scratch);

        let snippets = extract_snippets(&self.config.docs_root, &self.config.doc_extension)?;
        let extracted = snippets.len();
        let snippets = dedup_by_fingerprint(snippets)?;
        if snippets.len() < extracted {
            tracing::info!("♻️ Dropped {} duplicate snippet(s)", extracted - snippets.len());
        }

        let mut skipped = Vec::new();
        let mut to_verify = Vec::new();
        for snippet in snippets {
            match self.skip_marker(&snippet) {
                Some(marker) => {
                    tracing::info!("⏭️ Skipping {} (contains {})", snippet.location(), marker);
                    skipped.push(SnippetOutcome::skipped(snippet, marker));
                }
                None => to_verify.push(snippet),
            }
        }

        let materialized = materialize(&scratch, to_verify, Layout::Verify).await?;
        tracing::info!(
            "📝 Materialized {} snippet(s) in {}",
            materialized.len(),
            scratch.path().display()
        );

        let total = materialized.len();
        let mut outcomes = match self.config.failure_policy {
            FailurePolicy::FullReport => self.verify_all(materialized).await,
            FailurePolicy::FailFast => self.verify_until_failure(materialized).await,
        };
        let unchecked = total - outcomes.len();
        outcomes.extend(skipped);
        outcomes.sort_by(|a, b| {
            (&a.snippet.source_file, a.snippet.start_line)
                .cmp(&(&b.snippet.source_file, b.snippet.start_line))
        });

        let report = VerificationReport {
            run_id: self.run_id.clone(),
            policy: self.config.failure_policy,
            outcomes,
            unchecked,
            duration: started.elapsed(),
        };

        tracing::info!(
            "🏁 Run finished in {:?}: {} verified, {} failed, {} skipped, {} attempt(s)",
            report.duration,
            report.verified().count(),
            report.failures().len(),
            report.skipped().count(),
            report.total_attempts()
        );

        Ok(report)
    }

    fn skip_marker(&self, snippet: &Snippet) -> Option<String> {
        self.config
            .skip_markers
            .iter()
            .find(|marker| snippet.content.contains(marker.as_str()))
            .cloned()
    }

    fn verifier(&self) -> SnippetVerifier {
        SnippetVerifier::new(
            Arc::clone(&self.validator),
            RetrySettings {
                max_retries: self.config.max_retries,
                attempt_timeout: self.config.attempt_timeout(),
                retry_delay: self.config.retry_delay(),
                kill_grace: DEFAULT_KILL_GRACE,
            },
            self.run_id.clone(),
        )
    }

    /// 全部並行驗證 (上限 max_concurrency)，收集所有結果
    async fn verify_all(&self, items: Vec<MaterializedSnippet>) -> Vec<SnippetOutcome> {
        let verifier = self.verifier();
        let verifier = &verifier;

        stream::iter(items)
            .map(|item| async move { verifier.verify(&item).await })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await
    }

    /// 依序驗證，第一個失敗即停止
    async fn verify_until_failure(&self, items: Vec<MaterializedSnippet>) -> Vec<SnippetOutcome> {
        let verifier = self.verifier();
        let mut outcomes = Vec::new();

        for item in items {
            let outcome = verifier.verify(&item).await;
            let failed = outcome.is_failed();
            outcomes.push(outcome);

            if failed {
                tracing::error!("🛑 Stopping at first failure: {}", item.snippet.location());
                break;
            }
        }

        outcomes
    }
}

use crate::core::materializer::MaterializedSnippet;
use crate::domain::model::{CheckOutcome, Role, Snippet};
use crate::domain::ports::{CheckContext, Validator};
use crate::utils::error::VerifyError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// 逾時取消後，等待外部程序結束的上限
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

/// 單一片段的驗證狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetState {
    Pending,
    Attempting { attempt: u32 },
    Retrying { attempt: u32 },
    Verified { role: Role, attempt: u32 },
    Failed { attempts: u32 },
    Skipped { marker: String },
}

/// 根據本次嘗試結果決定下一個狀態
pub fn next_state(attempt: u32, max_retries: u32, passed: Option<Role>) -> SnippetState {
    match passed {
        Some(role) => SnippetState::Verified { role, attempt },
        None if attempt < max_retries => SnippetState::Retrying { attempt },
        None => SnippetState::Failed { attempts: attempt },
    }
}

#[derive(Debug, Clone)]
pub struct RoleCheck {
    pub role: Role,
    /// `Err` 表示驗證器本身無法執行 (例如找不到 docker)
    pub result: std::result::Result<CheckOutcome, String>,
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub checks: Vec<RoleCheck>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl AttemptRecord {
    pub fn passed_role(&self) -> Option<Role> {
        self.checks
            .iter()
            .find(|check| matches!(check.result, Ok(CheckOutcome::Passed)))
            .map(|check| check.role)
    }
}

#[derive(Debug, Clone)]
pub struct SnippetOutcome {
    pub snippet: Snippet,
    pub state: SnippetState,
    pub attempts: Vec<AttemptRecord>,
}

impl SnippetOutcome {
    pub fn skipped(snippet: Snippet, marker: String) -> Self {
        Self {
            snippet,
            state: SnippetState::Skipped { marker },
            attempts: Vec::new(),
        }
    }

    pub fn verified_role(&self) -> Option<Role> {
        match self.state {
            SnippetState::Verified { role, .. } => Some(role),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, SnippetState::Failed { .. })
    }

    /// 失敗時回傳帶有來源位置的錯誤
    pub fn failure(&self) -> Option<VerifyError> {
        match self.state {
            SnippetState::Failed { attempts } => Some(VerifyError::ValidationFailure {
                file: self.snippet.source_file.clone(),
                line: self.snippet.start_line,
                attempts,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
    pub kill_grace: Duration,
}

/// 對單一片段執行「兩種角色 × 有限次重試」的驗證
pub struct SnippetVerifier {
    validator: Arc<dyn Validator>,
    settings: RetrySettings,
    run_id: String,
}

impl SnippetVerifier {
    pub fn new(validator: Arc<dyn Validator>, settings: RetrySettings, run_id: String) -> Self {
        Self {
            validator,
            settings,
            run_id,
        }
    }

    pub async fn verify(&self, item: &MaterializedSnippet) -> SnippetOutcome {
        let mut state = SnippetState::Pending;
        let mut attempts = Vec::new();
        let max_retries = self.settings.max_retries.max(1);

        for attempt in 1..=max_retries {
            state = SnippetState::Attempting { attempt };
            tracing::debug!(
                file = %item.snippet.source_file,
                line = item.snippet.start_line,
                attempt,
                "⏳ {:?}",
                state
            );

            let record = self.run_attempt(item, attempt).await;
            log_attempt(&item.snippet, &record, max_retries, self.settings.attempt_timeout);

            state = next_state(attempt, max_retries, record.passed_role());
            attempts.push(record);

            match state {
                SnippetState::Retrying { .. } => {
                    if !self.settings.retry_delay.is_zero() {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
                _ => break,
            }
        }

        SnippetOutcome {
            snippet: item.snippet.clone(),
            state,
            attempts,
        }
    }

    /// 兩種角色同時檢查並共用同一個取消訊號；任一通過即取消另一個，逾時則全部取消
    async fn run_attempt(&self, item: &MaterializedSnippet, attempt: u32) -> AttemptRecord {
        let cancel = CancellationToken::new();
        let context = CheckContext {
            run_id: self.run_id.clone(),
            fingerprint: item.fingerprint.to_string(),
            attempt,
        };
        let started = Instant::now();

        let check = |role: Role| {
            let cancel = cancel.clone();
            let context = &context;
            let validator = self.validator.as_ref();
            let path = item.path.as_path();
            async move {
                let result = validator.check(role, path, context, &cancel).await;
                if matches!(result, Ok(CheckOutcome::Passed)) {
                    cancel.cancel();
                }
                RoleCheck {
                    role,
                    result: result.map_err(|e| e.to_string()),
                }
            }
        };

        let checks = futures::future::join_all(Role::ALL.map(check));
        tokio::pin!(checks);

        let mut timed_out = false;
        let checks = tokio::select! {
            results = &mut checks => results,
            _ = tokio::time::sleep(self.settings.attempt_timeout) => {
                timed_out = true;
                cancel.cancel();
                match tokio::time::timeout(self.settings.kill_grace, &mut checks).await {
                    Ok(results) => results,
                    Err(_) => {
                        tracing::warn!(
                            "⚠️ Validator did not stop within {:?} of cancellation for {}",
                            self.settings.kill_grace,
                            item.snippet.location()
                        );
                        Role::ALL
                            .iter()
                            .map(|&role| RoleCheck {
                                role,
                                result: Ok(CheckOutcome::Cancelled),
                            })
                            .collect()
                    }
                }
            }
        };

        AttemptRecord {
            attempt,
            checks,
            timed_out,
            elapsed: started.elapsed(),
        }
    }
}

fn log_attempt(snippet: &Snippet, record: &AttemptRecord, max_retries: u32, timeout: Duration) {
    if let Some(role) = record.passed_role() {
        tracing::debug!(
            file = %snippet.source_file,
            line = snippet.start_line,
            attempt = record.attempt,
            role = %role,
            "✅ Accepted in {:?}",
            record.elapsed
        );
        return;
    }

    if record.timed_out {
        let timeout = VerifyError::ValidationTimeout {
            timeout_ms: timeout.as_millis() as u64,
        };
        tracing::warn!(
            file = %snippet.source_file,
            line = snippet.start_line,
            attempt = record.attempt,
            "⏱️ Attempt {}/{}: {}",
            record.attempt,
            max_retries,
            timeout
        );
    }

    for check in &record.checks {
        match &check.result {
            Ok(CheckOutcome::Rejected { exit_code, output }) => tracing::warn!(
                file = %snippet.source_file,
                line = snippet.start_line,
                attempt = record.attempt,
                role = %check.role,
                "❌ Attempt {}/{} rejected as {} (exit {:?}): {}",
                record.attempt,
                max_retries,
                check.role.label(),
                exit_code,
                output
            ),
            Ok(CheckOutcome::Cancelled) => tracing::debug!(
                file = %snippet.source_file,
                line = snippet.start_line,
                attempt = record.attempt,
                role = %check.role,
                "🛑 Check cancelled"
            ),
            Ok(CheckOutcome::Passed) => {}
            Err(message) => tracing::error!(
                file = %snippet.source_file,
                line = snippet.start_line,
                attempt = record.attempt,
                role = %check.role,
                "💥 {}",
                message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Fingerprint;
    use crate::utils::error::Result;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// 依角色回傳預先排好的結果；用完後重複最後一個
    struct ScriptedValidator {
        script: Mutex<HashMap<Role, Vec<Step>>>,
        calls: Mutex<Vec<(Role, u32)>>,
    }

    #[derive(Clone)]
    enum Step {
        Pass,
        Reject,
        Hang,
        Fail,
    }

    impl ScriptedValidator {
        fn new(config: Vec<Step>, users: Vec<Step>) -> Self {
            let mut script = HashMap::new();
            script.insert(Role::Config, config);
            script.insert(Role::Users, users);
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Role, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Validator for ScriptedValidator {
        async fn check(
            &self,
            role: Role,
            _file: &Path,
            context: &CheckContext,
            cancel: &CancellationToken,
        ) -> Result<CheckOutcome> {
            self.calls.lock().unwrap().push((role, context.attempt));
            let step = {
                let mut script = self.script.lock().unwrap();
                let steps = script.get_mut(&role).unwrap();
                if steps.len() > 1 {
                    steps.remove(0)
                } else {
                    steps[0].clone()
                }
            };

            match step {
                Step::Pass => Ok(CheckOutcome::Passed),
                Step::Reject => {
                    // 讓另一個角色有機會先通過
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(20)) => Ok(CheckOutcome::Rejected {
                            exit_code: Some(1),
                            output: "invalid".to_string(),
                        }),
                        _ = cancel.cancelled() => Ok(CheckOutcome::Cancelled),
                    }
                }
                Step::Hang => {
                    cancel.cancelled().await;
                    Ok(CheckOutcome::Cancelled)
                }
                Step::Fail => Err(VerifyError::ValidatorError {
                    message: "docker not found".to_string(),
                }),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn item() -> MaterializedSnippet {
        let snippet = Snippet::new("configuration/index.md", "[general]\nhost = \"0.0.0.0\"", 10);
        let fingerprint: Fingerprint = snippet.fingerprint().unwrap();
        MaterializedSnippet {
            path: PathBuf::from(format!("/tmp/{}.toml", fingerprint)),
            snippet,
            fingerprint,
        }
    }

    fn settings(max_retries: u32, timeout_ms: u64) -> RetrySettings {
        RetrySettings {
            max_retries,
            attempt_timeout: Duration::from_millis(timeout_ms),
            retry_delay: Duration::ZERO,
            kill_grace: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_next_state_transitions() {
        assert_eq!(
            next_state(1, 3, Some(Role::Users)),
            SnippetState::Verified {
                role: Role::Users,
                attempt: 1
            }
        );
        assert_eq!(next_state(1, 3, None), SnippetState::Retrying { attempt: 1 });
        assert_eq!(next_state(3, 3, None), SnippetState::Failed { attempts: 3 });
    }

    #[tokio::test]
    async fn test_config_role_verifies_without_users_role() {
        let validator = Arc::new(ScriptedValidator::new(vec![Step::Pass], vec![Step::Reject]));
        let verifier = SnippetVerifier::new(validator.clone(), settings(3, 1000), "test".to_string());

        let outcome = verifier.verify(&item()).await;

        assert_eq!(outcome.verified_role(), Some(Role::Config));
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.failure().is_none());
        // users 檢查被取消，而不是被拒絕
        let users = outcome.attempts[0]
            .checks
            .iter()
            .find(|c| c.role == Role::Users)
            .unwrap();
        assert_eq!(users.result, Ok(CheckOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_users_role_verifies() {
        let validator = Arc::new(ScriptedValidator::new(vec![Step::Reject], vec![Step::Pass]));
        let verifier = SnippetVerifier::new(validator, settings(3, 1000), "test".to_string());

        let outcome = verifier.verify(&item()).await;

        assert_eq!(outcome.verified_role(), Some(Role::Users));
    }

    #[tokio::test]
    async fn test_malformed_snippet_exhausts_retries() {
        let validator = Arc::new(ScriptedValidator::new(vec![Step::Reject], vec![Step::Reject]));
        let verifier = SnippetVerifier::new(validator.clone(), settings(3, 1000), "test".to_string());

        let outcome = verifier.verify(&item()).await;

        assert_eq!(outcome.state, SnippetState::Failed { attempts: 3 });
        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(validator.calls().len(), 6);

        let failure = outcome.failure().unwrap().to_string();
        assert!(failure.contains("configuration/index.md:10"));
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_on_retry() {
        let validator = Arc::new(ScriptedValidator::new(
            vec![Step::Fail, Step::Reject, Step::Pass],
            vec![Step::Reject],
        ));
        let verifier = SnippetVerifier::new(validator, settings(3, 1000), "test".to_string());

        let outcome = verifier.verify(&item()).await;

        assert_eq!(
            outcome.state,
            SnippetState::Verified {
                role: Role::Config,
                attempt: 3
            }
        );
        assert!(outcome.attempts[0].checks.iter().any(|c| c.result.is_err()));
    }

    #[tokio::test]
    async fn test_timeout_cancels_attempt_and_retries() {
        let validator = Arc::new(ScriptedValidator::new(
            vec![Step::Hang, Step::Pass],
            vec![Step::Hang, Step::Reject],
        ));
        let verifier = SnippetVerifier::new(validator.clone(), settings(3, 50), "test".to_string());

        let started = Instant::now();
        let outcome = verifier.verify(&item()).await;

        assert!(outcome.attempts[0].timed_out);
        assert!(outcome.attempts[0]
            .checks
            .iter()
            .all(|c| c.result == Ok(CheckOutcome::Cancelled)));
        assert_eq!(
            outcome.state,
            SnippetState::Verified {
                role: Role::Config,
                attempt: 2
            }
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            validator.calls(),
            vec![
                (Role::Config, 1),
                (Role::Users, 1),
                (Role::Config, 2),
                (Role::Users, 2)
            ]
        );
    }
}

use crate::adapters::process::run_cancellable;
use crate::domain::model::{CheckOutcome, Role};
use crate::domain::ports::{CheckContext, Validator};
use crate::utils::error::{Result, VerifyError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// 在容器中執行 `pgdog configcheck`
#[derive(Debug, Clone)]
pub struct DockerValidator {
    docker_binary: String,
    image: String,
    entrypoint: String,
}

impl DockerValidator {
    pub fn new(
        docker_binary: impl Into<String>,
        image: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            docker_binary: docker_binary.into(),
            image: image.into(),
            entrypoint: entrypoint.into(),
        }
    }

    /// 每次檢查使用唯一的容器名稱，逾時後才能強制移除
    pub fn container_name(role: Role, context: &CheckContext) -> String {
        let short: String = context.fingerprint.chars().take(12).collect();
        format!(
            "docs-toml-verify-{}-{}-{}-{}",
            context.run_id, short, role, context.attempt
        )
    }

    pub fn command_args(&self, role: Role, host_file: &Path, context: &CheckContext) -> Vec<String> {
        let container_path = role.container_path();
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            Self::container_name(role, context),
            "--entrypoint".to_string(),
            self.entrypoint.clone(),
            "-v".to_string(),
            format!("{}:{}:ro", host_file.display(), container_path),
            self.image.clone(),
            "configcheck".to_string(),
            role.flag().to_string(),
            container_path.to_string(),
        ]
    }

    /// 終止 docker client 不會停止容器本身
    async fn force_remove(&self, name: &str) {
        let result = Command::new(&self.docker_binary)
            .args(["rm", "--force", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => tracing::debug!("🗑️ Removed container {}", name),
            Ok(status) => tracing::debug!("Container {} not removed (exit {:?})", name, status.code()),
            Err(e) => tracing::warn!("⚠️ Failed to remove container {}: {}", name, e),
        }
    }
}

#[async_trait]
impl Validator for DockerValidator {
    async fn check(
        &self,
        role: Role,
        file: &Path,
        context: &CheckContext,
        cancel: &CancellationToken,
    ) -> Result<CheckOutcome> {
        // bind mount 需要絕對路徑
        let host_file = absolute_path(file)?;
        let mut command = Command::new(&self.docker_binary);
        command.args(self.command_args(role, &host_file, context));

        let outcome = run_cancellable(command, cancel).await?;
        if outcome == CheckOutcome::Cancelled {
            self.force_remove(&Self::container_name(role, context)).await;
        }
        Ok(outcome)
    }

    fn describe(&self) -> String {
        format!("docker image {}", self.image)
    }
}

/// 直接執行本機的 pgdog 執行檔，不經過容器
#[derive(Debug, Clone)]
pub struct BinaryValidator {
    binary: String,
}

impl BinaryValidator {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn command_args(&self, role: Role, file: &Path) -> Vec<String> {
        vec![
            role.flag().to_string(),
            file.display().to_string(),
            "configcheck".to_string(),
        ]
    }
}

#[async_trait]
impl Validator for BinaryValidator {
    async fn check(
        &self,
        role: Role,
        file: &Path,
        _context: &CheckContext,
        cancel: &CancellationToken,
    ) -> Result<CheckOutcome> {
        let mut command = Command::new(&self.binary);
        command.args(self.command_args(role, file));
        run_cancellable(command, cancel).await
    }

    fn describe(&self) -> String {
        format!("binary {}", self.binary)
    }
}

fn absolute_path(file: &Path) -> Result<PathBuf> {
    std::path::absolute(file).map_err(|e| VerifyError::ValidatorError {
        message: format!("Cannot resolve absolute path for {}: {}", file.display(), e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CheckContext {
        CheckContext {
            run_id: "20260101_120000".to_string(),
            fingerprint: "0123456789abcdef0123456789abcdef".to_string(),
            attempt: 2,
        }
    }

    #[test]
    fn test_docker_command_args() {
        let validator = DockerValidator::new("docker", "ghcr.io/pgdogdev/pgdog:main", "pgdog");
        let args = validator.command_args(Role::Users, Path::new("/tmp/scratch/abc.toml"), &context());

        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "docs-toml-verify-20260101_120000-0123456789ab-users-2",
                "--entrypoint",
                "pgdog",
                "-v",
                "/tmp/scratch/abc.toml:/users.toml:ro",
                "ghcr.io/pgdogdev/pgdog:main",
                "configcheck",
                "--users",
                "/users.toml",
            ]
        );
    }

    #[test]
    fn test_binary_command_args() {
        let validator = BinaryValidator::new("pgdog");
        let args = validator.command_args(Role::Config, Path::new("tmp/abc.toml"));

        assert_eq!(args, vec!["--config", "tmp/abc.toml", "configcheck"]);
        assert_eq!(validator.describe(), "binary pgdog");
    }

    #[test]
    fn test_container_names_differ_per_role_and_attempt() {
        let ctx = context();
        let mut next = context();
        next.attempt = 3;

        assert_ne!(
            DockerValidator::container_name(Role::Config, &ctx),
            DockerValidator::container_name(Role::Users, &ctx)
        );
        assert_ne!(
            DockerValidator::container_name(Role::Config, &ctx),
            DockerValidator::container_name(Role::Config, &next)
        );
    }
}

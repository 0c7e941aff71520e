use crate::domain::model::CheckOutcome;
use crate::utils::error::{Result, VerifyError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 輸出節錄的最大字元數
const OUTPUT_EXCERPT_CHARS: usize = 2000;

/// 程序結束後等待輸出讀取完成的上限
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 執行外部程序，exit code 0 視為通過。`cancel` 觸發時終止並回收程序。
pub async fn run_cancellable(mut command: Command, cancel: &CancellationToken) -> Result<CheckOutcome> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| VerifyError::ValidatorError {
        message: format!("Failed to spawn '{}': {}", program, e),
    })?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            if status.success() {
                stdout.abort();
                stderr.abort();
                return Ok(CheckOutcome::Passed);
            }

            let mut output = drain(stderr).await;
            let stdout_text = drain(stdout).await;
            if !stdout_text.trim().is_empty() {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&stdout_text);
            }

            Ok(CheckOutcome::Rejected {
                exit_code: status.code(),
                output: excerpt(&output),
            })
        }
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!("⚠️ Failed to kill '{}': {}", program, e);
            }
            stdout.abort();
            stderr.abort();
            Ok(CheckOutcome::Cancelled)
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).await.is_ok() {
                buffer = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        buffer
    })
}

async fn drain(handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

/// 只保留結尾部分；錯誤訊息通常在最後
fn excerpt(output: &str) -> String {
    let trimmed = output.trim();
    let count = trimmed.chars().count();
    if count <= OUTPUT_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - OUTPUT_EXCERPT_CHARS).collect();
    format!("…{}", tail)
}

#![cfg(unix)]

use docs_toml_verify::{ValidatorKind, VerifyConfig, VerifyEngine};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 模擬 docker CLI：記錄每次呼叫的參數，`run` 永遠不會結束
fn write_fake_docker(dir: &Path, log: &Path) -> PathBuf {
    let path = dir.join("docker");
    let body = format!(
        "#!/bin/sh\necho \"$*\" >> '{}'\nif [ \"$1\" = \"run\" ]; then exec sleep 30; fi\nexit 0\n",
        log.display()
    );
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// `run --rm --name <name> ...` 中的容器名稱
fn container_name(run_line: &str) -> String {
    let args: Vec<&str> = run_line.split_whitespace().collect();
    let index = args.iter().position(|arg| *arg == "--name").unwrap();
    args[index + 1].to_string()
}

#[tokio::test]
async fn test_timed_out_containers_are_force_removed() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("docker.log");
    let docker = write_fake_docker(temp_dir.path(), &log);

    let docs_root = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs_root).unwrap();
    std::fs::write(docs_root.join("slow.md"), "```toml\n[general]\n```\n").unwrap();

    let config = VerifyConfig {
        docs_root,
        scratch_dir: temp_dir.path().join("scratch"),
        validator: ValidatorKind::Docker,
        docker_binary: docker.display().to_string(),
        max_retries: 2,
        attempt_timeout_ms: 300,
        ..VerifyConfig::default()
    };

    let report = VerifyEngine::new(config).run().await.unwrap();

    assert!(!report.is_success());
    assert!(report.outcomes[0].attempts.iter().all(|a| a.timed_out));

    let calls = std::fs::read_to_string(&log).unwrap();
    let runs: Vec<&str> = calls.lines().filter(|l| l.starts_with("run ")).collect();
    let removals: Vec<&str> = calls
        .lines()
        .filter(|l| l.starts_with("rm --force "))
        .collect();

    assert_eq!(runs.len(), 4);
    assert_eq!(removals.len(), 4);

    let prefix = format!("docs-toml-verify-{}-", report.run_id);
    for attempt in 1..=2 {
        for role in ["config", "users"] {
            let suffix = format!("-{}-{}", role, attempt);
            let started = runs
                .iter()
                .map(|line| container_name(line))
                .find(|name| name.ends_with(&suffix))
                .unwrap_or_else(|| panic!("no container started for {}", suffix));

            assert!(started.starts_with(&prefix));
            assert!(
                removals.contains(&format!("rm --force {}", started).as_str()),
                "container {} was not removed",
                started
            );
        }
    }
}

#[tokio::test]
async fn test_only_cancelled_sibling_container_is_removed() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("docker.log");
    let docker = temp_dir.path().join("docker");
    // config 角色通過，users 角色卡住直到被取消
    std::fs::write(
        &docker,
        format!(
            "#!/bin/sh\necho \"$*\" >> '{}'\ncase \"$*\" in\n  run*--config*) exit 0 ;;\n  run*) exec sleep 30 ;;\nesac\nexit 0\n",
            log.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&docker, std::fs::Permissions::from_mode(0o755)).unwrap();

    let docs_root = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs_root).unwrap();
    std::fs::write(docs_root.join("ok.md"), "```toml\n[general]\n```\n").unwrap();

    let config = VerifyConfig {
        docs_root,
        scratch_dir: temp_dir.path().join("scratch"),
        validator: ValidatorKind::Docker,
        docker_binary: docker.display().to_string(),
        attempt_timeout_ms: 10_000,
        ..VerifyConfig::default()
    };

    let report = VerifyEngine::new(config).run().await.unwrap();
    assert!(report.is_success());

    let calls = std::fs::read_to_string(&log).unwrap();
    let removals: Vec<&str> = calls
        .lines()
        .filter(|l| l.starts_with("rm --force "))
        .collect();

    assert_eq!(removals.len(), 1);
    assert!(removals[0].ends_with("-users-1"));
}

// SPDX-License-Identifier: MIT

use super::*;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn run_script_captures_stdout_and_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "ok.sh", "echo hello; exit 0");
    let out = run_script(&script, &[], None, Duration::from_secs(2)).await.unwrap();
    assert!(out.status.success());
    assert_eq!(out.stdout, b"hello\n");
}

#[tokio::test]
async fn run_script_captures_nonzero_exit_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "fail.sh", "echo boom >&2; exit 3");
    let out = run_script(&script, &[], None, Duration::from_secs(2)).await.unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(out.stderr, b"boom\n");
}

#[tokio::test]
async fn run_script_feeds_stdin_to_process() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "echo_stdin.sh", "cat");
    let out = run_script(&script, &[], Some(b"ping"), Duration::from_secs(2)).await.unwrap();
    assert_eq!(out.stdout, b"ping");
}

#[tokio::test]
async fn run_script_times_out_and_kills_process() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "slow.sh", "sleep 10");
    let result = run_script(&script, &[], None, Duration::from_millis(100)).await;
    assert!(matches!(result, Err(RunError::TimedOut)));
}

#[tokio::test]
async fn run_script_enforces_deadline_even_when_stdin_write_blocks() {
    let dir = tempfile::tempdir().unwrap();
    // Never reads stdin, so a large enough payload fills the pipe buffer and
    // the write blocks; the deadline must still fire.
    let script = write_script(&dir, "ignores_stdin.sh", "sleep 10");
    let payload = vec![0u8; 4 * 1024 * 1024];
    let deadline = Duration::from_millis(200);

    let started = std::time::Instant::now();
    let result = run_script(&script, &[], Some(&payload), deadline).await;
    assert!(matches!(result, Err(RunError::TimedOut)));
    assert!(started.elapsed() < Duration::from_secs(5), "deadline was not honored during stdin write");
}

#[tokio::test]
async fn run_script_reports_spawn_failure_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.sh");
    let result = run_script(&missing, &[], None, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(RunError::SpawnFailed(_))));
}

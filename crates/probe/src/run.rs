// SPDX-License-Identifier: MIT

//! Low-level subprocess execution: spawn, feed stdin, capture both streams,
//! enforce a deadline with SIGTERM-then-SIGKILL escalation.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Grace period between SIGTERM and a hard kill once a deadline expires.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

pub(crate) struct RawOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug)]
pub(crate) enum RunError {
    SpawnFailed(std::io::Error),
    TimedOut,
}

/// Spawn `path` with `args`, optionally feeding `stdin` and closing it,
/// capture both output streams, and enforce `deadline`.
pub(crate) async fn run_script(
    path: &Path,
    args: &[String],
    stdin: Option<&[u8]>,
    deadline: Duration,
) -> Result<RawOutput, RunError> {
    let mut command = Command::new(path);
    command.args(args);
    command.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);

    let mut child = command.spawn().map_err(RunError::SpawnFailed)?;

    match timeout(deadline, collect_output(&mut child, stdin)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(RunError::SpawnFailed(e)),
        Err(_elapsed) => {
            terminate_with_grace(&mut child).await;
            Err(RunError::TimedOut)
        }
    }
}

async fn collect_output(child: &mut Child, stdin: Option<&[u8]>) -> std::io::Result<RawOutput> {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let mut stdin_handle = child.stdin.take();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // A script that never reads its stdin must not be able to block past the
    // deadline on the write, so this is raced alongside the output streams
    // rather than done before entering the timed future.
    let stdin_fut = async {
        if let Some(payload) = stdin {
            if let Some(handle) = stdin_handle.as_mut() {
                // Ignored: a script that exits without reading stdin makes
                // this a broken pipe, which isn't a failure of the script.
                let _ = handle.write_all(payload).await;
                let _ = handle.shutdown().await;
            }
        }
        drop(stdin_handle.take());
    };
    let stdout_fut = async {
        if let Some(s) = stdout.as_mut() {
            s.read_to_end(&mut stdout_buf).await
        } else {
            Ok(0)
        }
    };
    let stderr_fut = async {
        if let Some(s) = stderr.as_mut() {
            s.read_to_end(&mut stderr_buf).await
        } else {
            Ok(0)
        }
    };
    let ((), stdout_res, stderr_res) = tokio::join!(stdin_fut, stdout_fut, stderr_fut);
    stdout_res?;
    stderr_res?;

    let status = child.wait().await?;
    Ok(RawOutput { status, stdout: stdout_buf, stderr: stderr_buf })
}

/// Send SIGTERM, wait up to [`KILL_GRACE`], then SIGKILL if it's still alive.
async fn terminate_with_grace(child: &mut Child) {
    if let Some(id) = child.id() {
        let pid = Pid::from_raw(id as i32);
        let _ = signal::kill(pid, Signal::SIGTERM);
    }
    if timeout(KILL_GRACE, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

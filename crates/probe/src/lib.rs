// SPDX-License-Identifier: MIT

//! Script Probe & Invoker: the sole adapter between a filesystem path and a
//! running script process, in either *describe* (`info`) or *handle* mode.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod run;

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use scriptmesh_core::{descriptor, ServiceDescriptor};
use thiserror::Error;

pub use run::KILL_GRACE;

/// Upper bound on captured stderr kept for diagnostics (rest is dropped).
pub const STDERR_EXCERPT_LIMIT: usize = 4096;

/// Default deadline for a `describe` (`info`) probe.
pub const DEFAULT_DESCRIBE_DEADLINE: Duration = Duration::from_secs(5);

/// Failure modes of the `describe` operation.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("probe exited non-zero: {stderr}")]
    ProbeFailed { stderr: String },
    #[error("descriptor invalid: {reason}")]
    InvalidDescriptor { reason: String },
    #[error("script unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Outcome of a `handle` invocation. Always produced — there is no
/// separate error channel, because every outcome maps to a bus reply.
#[derive(Debug)]
pub enum ExecutionRecord {
    Ok { stdout: Bytes, stderr: Bytes },
    ScriptFailed { exit_code: i32, stdout: Bytes, stderr: Bytes },
    Timeout,
    SpawnFailed { reason: String },
}

/// Run `path info`, capturing stdout/stderr, and parse+validate the result.
pub async fn describe(path: &Path, deadline: Duration) -> Result<ServiceDescriptor, ProbeError> {
    let outcome = run::run_script(path, &["info".to_string()], None, deadline).await;
    match outcome {
        Err(run::RunError::SpawnFailed(e)) => {
            Err(ProbeError::Unavailable { reason: e.to_string() })
        }
        Err(run::RunError::TimedOut) => Err(ProbeError::Timeout),
        Ok(output) => {
            if !output.status.success() {
                let stderr = truncate_lossy(&output.stderr, STDERR_EXCERPT_LIMIT);
                return Err(ProbeError::ProbeFailed { stderr });
            }
            match descriptor::parse_and_validate(&output.stdout) {
                Ok(descriptor) => Ok(descriptor),
                Err(e) => Err(ProbeError::InvalidDescriptor { reason: e.to_string() }),
            }
        }
    }
}

/// Run `path <subject>` with `payload` on stdin, producing an execution record.
pub async fn handle(
    path: &Path,
    subject: &str,
    payload: &[u8],
    deadline: Duration,
) -> ExecutionRecord {
    let outcome = run::run_script(path, &[subject.to_string()], Some(payload), deadline).await;
    match outcome {
        Err(run::RunError::SpawnFailed(e)) => ExecutionRecord::SpawnFailed { reason: e.to_string() },
        Err(run::RunError::TimedOut) => ExecutionRecord::Timeout,
        Ok(output) => {
            if output.status.success() {
                ExecutionRecord::Ok { stdout: output.stdout.into(), stderr: output.stderr.into() }
            } else {
                ExecutionRecord::ScriptFailed {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: output.stdout.into(),
                    stderr: output.stderr.into(),
                }
            }
        }
    }
}

fn truncate_lossy(bytes: &[u8], max: usize) -> String {
    let truncated = &bytes[..bytes.len().min(max)];
    let mut s = String::from_utf8_lossy(truncated).into_owned();
    if bytes.len() > max {
        s.push_str("... (truncated)");
    }
    s
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

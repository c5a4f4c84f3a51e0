//! Subprocess invocation with a uniform timeout.
//!
//! Both the DUT and the memory consistency checker run through
//! [`run_with_timeout`]. A child still running when the timeout expires is
//! killed and reported with `timed_out` set rather than as an error.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};

/// Captured result of one subprocess run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl RunOutput {
    /// A run that exited cleanly with the given standard output.
    pub fn completed(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
        }
    }

    /// A run killed at the timeout, with whatever it printed until then.
    pub fn timed_out(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: None,
            timed_out: true,
        }
    }

    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawn `command`, capture its output and wait at most `timeout`.
///
/// Launch failures (missing executable, permissions) map to
/// [`HarnessError::ToolInvocation`]; a non-zero exit is returned as a
/// normal [`RunOutput`]. Output is drained as it arrives, so a run killed
/// at the timeout still reports everything printed before it.
pub async fn run_with_timeout(
    mut command: Command,
    program: &str,
    timeout: Duration,
) -> HarnessResult<RunOutput> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|err| HarnessError::ToolInvocation {
        program: program.to_string(),
        reason: err.to_string(),
    })?;
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let finished = tokio::time::timeout(timeout, async {
        let (out, err, status) = tokio::join!(
            drain(stdout_pipe, &mut stdout),
            drain(stderr_pipe, &mut stderr),
            child.wait()
        );
        out?;
        err?;
        status
    })
    .await;

    match finished {
        Ok(status) => {
            let status = status?;
            Ok(RunOutput {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code: status.code(),
                timed_out: false,
            })
        }
        Err(_) => {
            tracing::warn!(program, ?timeout, "subprocess timed out, killed");
            if let Err(err) = child.kill().await {
                tracing::warn!(program, error = %err, "failed to kill subprocess");
            }
            Ok(RunOutput::timed_out(
                String::from_utf8_lossy(&stdout),
                String::from_utf8_lossy(&stderr),
            ))
        }
    }
}

/// Append everything `reader` yields to `buf`.
///
/// Bytes land in `buf` chunk by chunk, so cancelling the future keeps what
/// was read so far.
async fn drain<R>(reader: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

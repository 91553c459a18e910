use std::{path::Path, process::Stdio, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
};

/// Per-invocation options for [`run`]. The timeout is owned by the
/// runner itself: first of "child exited" and "budget elapsed" wins, and
/// on expiry the child is force-killed before the call returns.
#[derive(Debug)]
pub struct RunOptions<'a> {
    pub cwd: &'a Path,
    pub stdin: Option<String>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

/// Both streams of a zero-exit child, capped at `max_output_bytes` each.
#[derive(Debug, Default)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// Non-zero exit or signal termination. `message` is the captured
    /// stderr when there is any, otherwise a generic exit description.
    #[error("{message}")]
    Exit {
        message: String,
        stdout: String,
        stderr: String,
    },
    #[error("wall-clock budget exhausted")]
    Timeout,
    #[error("failed waiting for child: {0}")]
    Wait(std::io::Error),
    #[error("child stdio pipe unavailable")]
    Pipe,
}

/// Spawns one child process with piped stdio, feeds it the stdin payload,
/// and resolves with both captured streams once it exits cleanly.
pub async fn run(program: &str, args: &[&str], opts: RunOptions<'_>) -> Result<Captured, RunError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(opts.cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Write the payload from a detached task; dropping the handle closes
    // the pipe so the child sees EOF either way.
    if let Some(mut pipe) = child.stdin.take() {
        if let Some(payload) = opts.stdin {
            tokio::spawn(async move {
                let _ = pipe.write_all(payload.as_bytes()).await;
                let _ = pipe.shutdown().await;
            });
        }
    }

    let stdout_pipe = child.stdout.take().ok_or(RunError::Pipe)?;
    let stderr_pipe = child.stderr.take().ok_or(RunError::Pipe)?;
    let limit = opts.max_output_bytes;
    let stdout_task = tokio::spawn(async move { read_limited(stdout_pipe, limit).await });
    let stderr_task = tokio::spawn(async move { read_limited(stderr_pipe, limit).await });

    let status = match tokio::time::timeout(opts.timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            let _ = child.kill().await;
            return Err(RunError::Wait(err));
        }
        Err(_) => {
            let _ = child.kill().await;
            return Err(RunError::Timeout);
        }
    };

    let (stdout_bytes, stdout_truncated) = stdout_task.await.unwrap_or_default();
    let (stderr_bytes, stderr_truncated) = stderr_task.await.unwrap_or_default();
    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    if !status.success() {
        let message = if stderr.trim().is_empty() {
            exit_detail(&status)
        } else {
            stderr.trim_end().to_string()
        };
        return Err(RunError::Exit {
            message,
            stdout,
            stderr,
        });
    }

    Ok(Captured {
        stdout,
        stderr,
        truncated: stdout_truncated || stderr_truncated,
    })
}

fn exit_detail(status: &std::process::ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Exit signal {signal}");
        }
    }
    "Exit (unknown status)".to_string()
}

async fn read_limited<R>(mut reader: R, limit: usize) -> (Vec<u8>, bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut out = Vec::with_capacity(limit.min(8192));
    let mut truncated = false;
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let take = (limit - out.len()).min(n);
                out.extend_from_slice(&chunk[..take]);
                if take < n {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    (out, truncated)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{RunError, RunOptions, run};

    fn opts(timeout_ms: u64) -> RunOptions<'static> {
        RunOptions {
            cwd: std::path::Path::new("/tmp"),
            stdin: None,
            timeout: Duration::from_millis(timeout_ms),
            max_output_bytes: 64 * 1024,
        }
    }

    #[tokio::test]
    async fn captures_stdout_of_a_clean_exit() {
        let captured = run("echo", &["hello"], opts(5_000)).await.unwrap();
        assert_eq!(captured.stdout.trim(), "hello");
        assert!(captured.stderr.is_empty());
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn pipes_stdin_payload_to_the_child() {
        let mut options = opts(5_000);
        options.stdin = Some("ping\n".to_string());
        let captured = run("cat", &[], options).await.unwrap();
        assert_eq!(captured.stdout, "ping\n");
    }

    #[tokio::test]
    async fn nonzero_exit_surfaces_stderr_or_a_generic_detail() {
        let err = run("sh", &["-c", "exit 3"], opts(5_000)).await.unwrap_err();
        match err {
            RunError::Exit { message, .. } => assert_eq!(message, "Exit code 3"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = run("sh", &["-c", "echo boom >&2; exit 1"], opts(5_000))
            .await
            .unwrap_err();
        match err {
            RunError::Exit { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn kills_the_child_when_the_budget_expires() {
        let started = Instant::now();
        let err = run("sleep", &["30"], opts(200)).await.unwrap_err();
        assert!(matches!(err, RunError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn spawn_failure_reports_the_program() {
        let err = run("definitely-not-a-real-binary", &[], opts(1_000))
            .await
            .unwrap_err();
        match err {
            RunError::Spawn { program, .. } => {
                assert_eq!(program, "definitely-not-a-real-binary")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn caps_captured_output_and_flags_truncation() {
        let mut options = opts(5_000);
        options.max_output_bytes = 16;
        let captured = run("sh", &["-c", "printf '%0.s-' $(seq 1 4096)"], options)
            .await
            .unwrap();
        assert_eq!(captured.stdout.len(), 16);
        assert!(captured.truncated);
    }
}

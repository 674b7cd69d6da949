use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, trace};

use crate::{AgentError, CommandConfig, ProcessOutput};

/// Utility for spawning external processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, feed it `stdin_payload` and capture its output.
    ///
    /// The child is killed when the returned future is dropped, including when
    /// the configured timeout fires.
    pub async fn spawn(
        program: &Path,
        args: &[String],
        stdin_payload: Option<&str>,
        config: &CommandConfig,
    ) -> Result<ProcessOutput, AgentError> {
        let start = Instant::now();

        debug!(
            program = %program.display(),
            args = ?args,
            working_dir = %config.working_dir.display(),
            "Spawning process"
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if stdin_payload.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null()); // Non-interactive
        }

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        let (stdout, stderr, status) = match config.timeout {
            Some(limit) => tokio::time::timeout(limit, Self::collect(&mut child, stdin_payload))
                .await
                .map_err(|_| AgentError::Timeout(limit))??,
            None => Self::collect(&mut child, stdin_payload).await?,
        };

        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            exit_code,
            duration_ms = duration.as_millis(),
            "Process completed"
        );

        Ok(ProcessOutput::new(stdout, stderr, exit_code, duration))
    }

    /// Write stdin and drain both output streams concurrently, then reap the child
    async fn collect(
        child: &mut Child,
        stdin_payload: Option<&str>,
    ) -> Result<(String, String, ExitStatus), AgentError> {
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stderr not captured".into()))?;

        let (written, stdout, stderr) = tokio::join!(
            write_stdin(stdin, stdin_payload),
            read_lines(stdout, "stdout"),
            read_lines(stderr, "stderr"),
        );

        written.map_err(|e| AgentError::ExecutionFailed(format!("Failed to write stdin: {}", e)))?;
        let stdout =
            stdout.map_err(|e| AgentError::ExecutionFailed(format!("Failed to read stdout: {}", e)))?;
        let stderr =
            stderr.map_err(|e| AgentError::ExecutionFailed(format!("Failed to read stderr: {}", e)))?;

        let status = child.wait().await?;
        Ok((stdout, stderr, status))
    }
}

async fn write_stdin(stdin: Option<ChildStdin>, payload: Option<&str>) -> std::io::Result<()> {
    let (Some(mut stdin), Some(payload)) = (stdin, payload) else {
        return Ok(());
    };

    match stdin.write_all(payload.as_bytes()).await {
        // The child may exit without reading its input
        Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
        other => other?,
    }
    // Close stdin so the child sees EOF
    drop(stdin);
    Ok(())
}

async fn read_lines<R>(reader: R, stream: &'static str) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut buffer = String::new();
    while let Some(line) = lines.next_line().await? {
        trace!(stream, line = %line);
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&line);
    }
    Ok(buffer)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (
            PathBuf::from("sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    #[tokio::test]
    async fn test_spawn_captures_both_streams() {
        let (program, args) = sh("echo out; echo err 1>&2; exit 3");
        let output = ProcessSpawner::spawn(&program, &args, None, &CommandConfig::default())
            .await
            .unwrap();

        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn test_spawn_feeds_stdin() {
        let (program, args) = sh("cat");
        let output = ProcessSpawner::spawn(
            &program,
            &args,
            Some("line one\nline two\n"),
            &CommandConfig::default(),
        )
        .await
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "line one\nline two");
    }

    #[tokio::test]
    async fn test_spawn_times_out() {
        let (program, args) = sh("sleep 5");
        let config = CommandConfig::default().with_timeout(Duration::from_millis(100));
        let result = ProcessSpawner::spawn(&program, &args, None, &config).await;

        assert!(matches!(result, Err(AgentError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let result = ProcessSpawner::spawn(
            Path::new("/nonexistent/refineloops-test-binary"),
            &[],
            None,
            &CommandConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(AgentError::SpawnFailed(_))));
    }
}

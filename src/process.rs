use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::errors::BuildError;

/// One external tool invocation: program, arguments, working directory.
///
/// Every subprocess in the crate goes through this type; exit-status
/// handling and output streaming live in one place.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    workdir: PathBuf,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: workdir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null());
        cmd
    }

    /// Run to completion and return captured stdout.
    pub async fn capture(&self) -> Result<String, BuildError> {
        let output = self.command().output().await.map_err(|source| {
            BuildError::Spawn {
                tool: self.program.clone(),
                source,
            }
        })?;
        self.check_status(output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Spawn the tool and forward its combined stdout/stderr into `tx` line
    /// by line, in arrival order. Returns once the process has exited; a
    /// non-zero exit is `CommandFailed` with the exit code.
    ///
    /// A closed receiver does not abort the child: remaining output is
    /// discarded and the exit status still decides success.
    pub async fn stream_into(&self, tx: &mpsc::Sender<String>) -> Result<(), BuildError> {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BuildError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("child stderr was not captured"))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                line = out_lines.next_line(), if out_open => match line? {
                    Some(line) => send_line(tx, line).await,
                    None => out_open = false,
                },
                line = err_lines.next_line(), if err_open => match line? {
                    Some(line) => send_line(tx, line).await,
                    None => err_open = false,
                },
            }
        }

        let status = child.wait().await?;
        self.check_status(status)
    }

    fn check_status(&self, status: ExitStatus) -> Result<(), BuildError> {
        if status.success() {
            Ok(())
        } else {
            Err(BuildError::CommandFailed {
                tool: self.program.clone(),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

async fn send_line(tx: &mpsc::Sender<String>, mut line: String) {
    line.push('\n');
    // The receiver may already be gone (client hung up); the tool keeps
    // running and the exit status is still checked.
    let _ = tx.send(line).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(cmd: &ToolCommand) -> (Vec<String>, Result<(), BuildError>) {
        let (tx, mut rx) = mpsc::channel(256);
        let result = cmd.stream_into(&tx).await;
        drop(tx);
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        (chunks, result)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_stdout_lines_in_order() {
        let cmd = ToolCommand::new("sh", std::env::temp_dir())
            .args(["-c", "printf 'one\\ntwo\\n'"]);
        let (chunks, result) = collect(&cmd).await;
        assert!(result.is_ok());
        assert_eq!(chunks, vec!["one\n".to_string(), "two\n".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_part_of_the_stream_and_exit_code_is_reported() {
        let cmd = ToolCommand::new("sh", std::env::temp_dir())
            .args(["-c", "echo oops >&2; exit 7"]);
        let (chunks, result) = collect(&cmd).await;
        assert!(chunks.contains(&"oops\n".to_string()));
        match result {
            Err(BuildError::CommandFailed { tool, code }) => {
                assert_eq!(tool, "sh");
                assert_eq!(code, 7);
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_returns_stdout() {
        let cmd = ToolCommand::new("sh", std::env::temp_dir()).args(["-c", "echo captured"]);
        assert_eq!(cmd.capture().await.unwrap(), "captured\n");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let cmd = ToolCommand::new("hangar-no-such-tool", std::env::temp_dir());
        match cmd.capture().await {
            Err(BuildError::Spawn { tool, .. }) => assert_eq!(tool, "hangar-no-such-tool"),
            other => panic!("expected Spawn, got {other:?}"),
        }
    }
}

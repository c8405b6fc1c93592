//! Tool runner that spawns each tool as a child process

use crate::tools::{ToolCommands, ToolError, ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs tools as subprocesses from the project root.
///
/// No timeout is applied: a hung tool blocks only the pipeline that called it.
#[derive(Debug, Clone)]
pub struct SubprocessToolRunner {
    commands: ToolCommands,
    working_dir: PathBuf,
}

impl SubprocessToolRunner {
    pub fn new(commands: ToolCommands, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl ToolRunner for SubprocessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let tool = invocation.kind();
        let command = self.commands.get(tool).render(&invocation.variables());
        debug!("Spawning {}: {} {:?}", tool, command.program, command.args);

        let stdin = invocation.stdin().map(str::to_owned);
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.working_dir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Spawn {
                tool,
                message: format!("{}: {}", command.program, e),
            })?;

        // stdin must be fed while stdout is being drained
        let writer = match (stdin, child.stdin.take()) {
            (Some(content), Some(mut pipe)) => Some(tokio::spawn(async move {
                let result = pipe.write_all(content.as_bytes()).await;
                drop(pipe);
                result
            })),
            _ => None,
        };

        let output = child.wait_with_output().await.map_err(|e| ToolError::Spawn {
            tool,
            message: e.to_string(),
        })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) => warn!("Failed writing stdin to {}: {}", tool, e),
                Err(e) => warn!("Stdin writer for {} panicked: {}", tool, e),
                Ok(Ok(())) => {}
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", tool, code, stderr);
            return Err(ToolError::Failed { tool, code, stderr });
        }

        debug!("{} returned {} bytes of output", tool, output.stdout.len());
        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

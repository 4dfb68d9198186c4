//! ProcessRunner - tokio::process による ScriptRunner 実装

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ExecError;
use crate::ports::ScriptRunner;

/// Runs programs as child processes.
///
/// stdout/stderr are captured so a chatty script cannot block on a full pipe;
/// they are only logged at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, program: &Path) -> Result<i32, ExecError> {
        let output = Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if !output.stdout.is_empty() || !output.stderr.is_empty() {
            tracing::debug!(
                program = %program.display(),
                stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "Script output"
            );
        }

        output.status.code().ok_or_else(|| ExecError::Signaled {
            program: program.to_path_buf(),
        })
    }
}

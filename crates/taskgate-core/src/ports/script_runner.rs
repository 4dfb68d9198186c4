//! ScriptRunner port - 外部プロセスの実行
//!
//! Both the connection validator and the per-task scripts are opaque
//! executables: run with no arguments and no input, judged only by exit code.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ExecError;

/// Run a program to completion and report its exit code.
///
/// No timeout: implementations wait as long as the process runs.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, program: &Path) -> Result<i32, ExecError>;
}

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure failures: anything that stops the server itself.
#[derive(Debug, Error)]
pub enum TaskgateError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("startup check failed: {0}")]
    Build(#[from] crate::app::BuildError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TaskgateError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A script (or the validator) could not be run to completion.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} was terminated by a signal")]
    Signaled { program: PathBuf },
}

/// Client-facing rejection reasons.
///
/// `Display` is exactly the text after `REJECTED: ` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid REQUEST_TASK format.")]
    MalformedRequest,

    #[error("Invalid number format in request. ServiceNumber and Priority must be integers.")]
    InvalidNumber,

    #[error("For service 2005, format: REQUEST_TASK;2005;ClientName;Priority;UserName")]
    MissingUserName,

    #[error("Invalid user name for service 2005: {0}")]
    InvalidUserName(String),

    #[error("Invalid service number: {0}")]
    UnknownService(i32),

    #[error("Rate limit exceeded for client: {0}")]
    RateLimited(String),

    #[error("Invalid CANCEL_TASK format. Expected: CANCEL_TASK;TaskID")]
    MalformedCancel,

    #[error("Invalid TaskID format. TaskID must be an integer.")]
    InvalidTaskId,

    /// Unknown, executing and finished ids all look the same to the caller.
    #[error("Task {0} not found or already running.")]
    TaskNotFound(i64),

    #[error("Client validation failed (Code: {0})")]
    ValidationFailed(i32),
}

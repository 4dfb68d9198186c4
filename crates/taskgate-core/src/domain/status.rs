//! Task status state machine and the statuses that land in history.

use std::fmt;

/// Live status of a task.
///
/// State transitions:
/// - Queued -> Executing -> Completed
/// - Queued -> Executing -> Error
/// - Queued -> Deferred -> ... -> Executing (resource was locked at selection)
/// - Queued | Deferred -> Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting in the pending queue.
    Queued,

    /// Selected by the dispatcher while its resource was locked; still pending.
    Deferred,

    /// Handed to a worker; the script is running.
    Executing,

    /// Script exited with code 0.
    Completed,

    /// Script exited non-zero or could not be started.
    Error,

    /// Removed from the pending queue by a client.
    Cancelled,
}

/// Status recorded in a [`HistoryRecord`](super::HistoryRecord).
///
/// `Deferred` never appears here: deferral is a scheduling detail, not a
/// transition clients see in `TASK_HISTORY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Queued,
    Cancelled,
    Executing,
    Completed,
    /// `exit_code` is `None` when the process could not be started at all.
    Error { exit_code: Option<i32> },
}

impl HistoryStatus {
    pub fn task_status(self) -> TaskStatus {
        match self {
            HistoryStatus::Queued => TaskStatus::Queued,
            HistoryStatus::Cancelled => TaskStatus::Cancelled,
            HistoryStatus::Executing => TaskStatus::Executing,
            HistoryStatus::Completed => TaskStatus::Completed,
            HistoryStatus::Error { .. } => TaskStatus::Error,
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryStatus::Queued => f.write_str("QUEUED"),
            HistoryStatus::Cancelled => f.write_str("CANCELLED"),
            HistoryStatus::Executing => f.write_str("EXECUTING"),
            HistoryStatus::Completed => f.write_str("COMPLETED"),
            HistoryStatus::Error { exit_code: None } => f.write_str("ERROR"),
            HistoryStatus::Error {
                exit_code: Some(code),
            } => write!(f, "ERROR_CODE_{code}"),
        }
    }
}

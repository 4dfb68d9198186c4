//! History records for task status transitions.

use chrono::{DateTime, Utc};

use super::ids::TaskId;
use super::service::ResourceKey;
use super::status::HistoryStatus;
use super::task::Task;

/// One status transition of a task.
///
/// Records are immutable once appended; the log never rewrites them.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub task_id: TaskId,
    pub resource: ResourceKey,
    pub requester: String,
    pub status: HistoryStatus,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(task: &Task, status: HistoryStatus, recorded_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id,
            resource: task.resource.clone(),
            requester: task.requester.clone(),
            status,
            recorded_at,
        }
    }
}

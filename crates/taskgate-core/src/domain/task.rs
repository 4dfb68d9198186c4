//! Task record and its position in the pending order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::ids::TaskId;
use super::service::{ResourceKey, Service};
use super::status::TaskStatus;

/// A unit of requested work.
///
/// Design:
/// - Owned by the pending queue until dispatched, then by the worker.
/// - `status` only moves forward (see [`TaskStatus`]).
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub service: Service,
    pub resource: ResourceKey,
    pub requester: String,
    /// Lower value = higher precedence.
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(
        id: TaskId,
        service: Service,
        resource: ResourceKey,
        requester: impl Into<String>,
        priority: i32,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            service,
            resource,
            requester: requester.into(),
            priority,
            enqueued_at,
            status: TaskStatus::Queued,
        }
    }

    pub fn order_key(&self) -> OrderKey {
        OrderKey {
            priority: self.priority,
            enqueued_at: self.enqueued_at,
            id: self.id,
        }
    }

    pub fn mark_deferred(&mut self) {
        self.status = TaskStatus::Deferred;
    }

    pub fn mark_executing(&mut self) {
        self.status = TaskStatus::Executing;
    }

    pub fn mark_finished(&mut self, success: bool) {
        self.status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Error
        };
    }

    pub fn mark_cancelled(&mut self) {
        self.status = TaskStatus::Cancelled;
    }
}

/// Position of a task in the pending order.
///
/// (priority ascending, enqueued_at ascending, id ascending). Two tasks
/// enqueued within the same clock tick still compare strictly because ids
/// are unique and monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
    pub id: TaskId,
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.enqueued_at.cmp(&other.enqueued_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

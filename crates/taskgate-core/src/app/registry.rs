//! TaskRegistry - 待ち行列・ID・資源ロック・レート制限をまとめる
//!
//! No I/O: the registry only validates, allocates and stores. History and
//! broadcast are layered on top by [`SchedulerCore`](super::SchedulerCore).

use chrono::{DateTime, Utc};

use super::protocol::TaskRequest;
use crate::domain::{ResourceKey, Service, Task, TaskId};
use crate::error::Rejection;
use crate::ports::IdGenerator;
use crate::queue::{PendingQueue, RateLimiter, ResourceLocks};

pub struct TaskRegistry {
    queue: PendingQueue,
    locks: ResourceLocks,
    rate_limiter: RateLimiter,
    ids: Box<dyn IdGenerator>,
}

impl TaskRegistry {
    pub fn new(ids: Box<dyn IdGenerator>, rate_limiter: RateLimiter) -> Self {
        Self {
            queue: PendingQueue::new(),
            locks: ResourceLocks::new(),
            rate_limiter,
            ids,
        }
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    /// Validate a request and, if admitted, build the task it creates.
    ///
    /// # 検証順序
    /// 1. service number → resource key
    /// 2. rate limit (records the time on success)
    /// 3. id allocation
    ///
    /// Nothing after step 2 can fail, so the rate-limit timestamp is only
    /// ever written for a request that ends up queued. The task is not yet
    /// visible to the dispatcher; call [`insert`](Self::insert) for that.
    pub fn admit(&self, request: &TaskRequest, now: DateTime<Utc>) -> Result<Task, Rejection> {
        let service = Service::from_number(request.service_number)
            .ok_or(Rejection::UnknownService(request.service_number))?;
        let resource = service.resource_key(request.extra.as_deref())?;

        self.rate_limiter.try_admit(&request.requester, now)?;

        Ok(Task::new(
            self.ids.generate_task_id(),
            service,
            resource,
            request.requester.clone(),
            request.priority,
            now,
        ))
    }

    /// Make an admitted task visible to the dispatcher.
    pub async fn insert(&self, task: Task) {
        self.queue.push(task).await;
    }

    /// Remove a pending task. Dispatched, finished and unknown ids all fail
    /// the same way.
    pub async fn cancel(&self, raw_id: i64) -> Result<Task, Rejection> {
        let id = TaskId::from_raw(raw_id).ok_or(Rejection::TaskNotFound(raw_id))?;
        let mut task = self
            .queue
            .remove(id)
            .await
            .ok_or(Rejection::TaskNotFound(raw_id))?;
        task.mark_cancelled();
        Ok(task)
    }

    pub async fn pending(&self) -> Vec<Task> {
        self.queue.snapshot().await
    }

    /// Release a resource lock and let the dispatcher re-scan.
    pub fn release(&self, resource: &ResourceKey) {
        if !self.locks.release(resource) {
            tracing::warn!(resource = %resource, "Released a resource that was not locked");
        }
        self.queue.wake();
    }
}

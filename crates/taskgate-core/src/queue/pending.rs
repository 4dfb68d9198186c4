//! Pending queue: tasks waiting for dispatch, in priority order.

use std::collections::BTreeMap;

use tokio::sync::{Mutex, Notify};

use crate::domain::{OrderKey, ResourceKey, Task, TaskId, TaskStatus};

/// Priority queue of pending tasks.
///
/// Design:
/// - `BTreeMap<OrderKey, Task>` keeps the total order, so the head is
///   `first_key_value()` and a snapshot is already sorted.
/// - `Notify` wakes the dispatcher on push and on resource release.
/// - 内部ロックは各メソッド内で完結（ロック跨ぎ await しない）
#[derive(Debug, Default)]
pub struct PendingQueue {
    tasks: Mutex<BTreeMap<OrderKey, Task>>,
    notify: Notify,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task and wake the dispatcher.
    pub async fn push(&self, task: Task) {
        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(task.order_key(), task);
        }
        // Notify outside the lock
        self.notify.notify_one();
    }

    /// Remove the head task, waiting until one exists.
    pub async fn pop(&self) -> Task {
        loop {
            {
                let mut tasks = self.tasks.lock().await;
                if let Some((_, task)) = tasks.pop_first() {
                    return task;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Remove the earliest task whose resource `try_lock` accepts, waiting
    /// until one exists.
    ///
    /// `try_lock` is expected to acquire the resource as a side effect when it
    /// returns `true`, so selection and locking happen under the queue lock.
    /// Tasks passed over are marked `Deferred` and stay queued.
    pub async fn pop_ready<F>(&self, mut try_lock: F) -> Task
    where
        F: FnMut(&ResourceKey) -> bool,
    {
        loop {
            {
                let mut tasks = self.tasks.lock().await;
                let mut chosen = None;
                for (key, task) in tasks.iter_mut() {
                    if try_lock(&task.resource) {
                        chosen = Some(*key);
                        break;
                    }
                    if task.status != TaskStatus::Deferred {
                        tracing::debug!(
                            task_id = %task.id,
                            resource = %task.resource,
                            "Task deferred, resource busy"
                        );
                        task.mark_deferred();
                    }
                }
                if let Some(key) = chosen
                    && let Some(task) = tasks.remove(&key)
                {
                    return task;
                }
            }
            // Nothing runnable: wait for a push or a release.
            self.notify.notified().await;
        }
    }

    /// Remove a pending task by id. O(n).
    pub async fn remove(&self, id: TaskId) -> Option<Task> {
        let mut tasks = self.tasks.lock().await;
        let key = tasks
            .iter()
            .find_map(|(key, task)| (task.id == id).then_some(*key))?;
        tasks.remove(&key)
    }

    /// Ordered copy of every pending task.
    pub async fn snapshot(&self) -> Vec<Task> {
        let tasks = self.tasks.lock().await;
        tasks.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    /// Wake a waiting `pop`/`pop_ready` without inserting anything.
    pub fn wake(&self) {
        self.notify.notify_one();
    }
}

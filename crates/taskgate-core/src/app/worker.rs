//! WorkerPool - 1 task = 1 tokio task で外部スクリプトを実行
//!
//! # フロー
//! 1. status `Executing`, history, broadcast `EXECUTING: ...`
//! 2. `<script_dir>/<resource>` を最後まで実行（タイムアウトなし）
//! 3. 終了コードで `Completed` / `Error` を決定し、history → broadcast
//! 4. resource lock を解放（drop guard なので panic 時も解放される）

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use super::scheduler::SchedulerCore;
use super::protocol;
use crate::domain::{HistoryStatus, ResourceKey, Task};

/// Capacity reserved for one task before it is dispatched.
///
/// Holding a slot before selecting a task means the dispatcher never locks a
/// resource it has no worker for.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

pub struct WorkerPool {
    core: Arc<SchedulerCore>,
    /// `None` = unbounded.
    limit: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(core: Arc<SchedulerCore>) -> Self {
        let limit = core
            .config()
            .max_concurrent_workers
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            core,
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for free capacity. Returns immediately when unbounded.
    pub async fn reserve(&self) -> WorkerSlot {
        match &self.limit {
            Some(limit) => WorkerSlot {
                _permit: Arc::clone(limit).acquire_owned().await.ok(),
            },
            None => WorkerSlot { _permit: None },
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run `task` on its own tokio task.
    ///
    /// The caller must already hold the lock on `task.resource`; the worker
    /// takes ownership of it and releases it when done.
    pub fn spawn(&self, task: Task, slot: WorkerSlot) -> JoinHandle<()> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = RunGuard {
            core: Arc::clone(&self.core),
            resource: task.resource.clone(),
            in_flight: Arc::clone(&self.in_flight),
            _slot: slot,
        };
        let core = Arc::clone(&self.core);
        tokio::spawn(async move {
            let _guard = guard;
            execute(&core, task).await;
        })
    }
}

/// Releases the resource lock and the worker slot on drop.
struct RunGuard {
    core: Arc<SchedulerCore>,
    resource: ResourceKey,
    in_flight: Arc<AtomicUsize>,
    _slot: WorkerSlot,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.core.registry().release(&self.resource);
    }
}

async fn execute(core: &SchedulerCore, mut task: Task) {
    task.mark_executing();
    core.record(&task, HistoryStatus::Executing);
    tracing::info!(task_id = %task.id, resource = %task.resource, "Task executing");
    core.broadcast(&protocol::started_event(&task));

    let program = core.script_path(&task.resource);
    match core.runner().run(&program).await {
        Ok(code) => {
            let status = if code == 0 {
                HistoryStatus::Completed
            } else {
                HistoryStatus::Error {
                    exit_code: Some(code),
                }
            };
            task.mark_finished(code == 0);
            core.record(&task, status);
            if code == 0 {
                tracing::info!(task_id = %task.id, resource = %task.resource, "Task completed");
            } else {
                tracing::warn!(
                    task_id = %task.id,
                    resource = %task.resource,
                    exit_code = code,
                    "Task finished with error"
                );
            }
            core.broadcast(&protocol::finished_event(&task, status));
        }
        Err(err) => {
            task.mark_finished(false);
            core.record(&task, HistoryStatus::Error { exit_code: None });
            tracing::error!(
                task_id = %task.id,
                resource = %task.resource,
                error = %err,
                "Task could not be started"
            );
            core.broadcast(&protocol::launch_failed_event(&task, &err));
        }
    }
}

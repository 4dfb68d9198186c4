//! Dispatcher - 待ち行列から実行可能な task を選び WorkerPool に渡す
//!
//! # モード
//! - `SkipBlocked`: 資源が空いている最も優先度の高い task を選ぶ。
//!   何も動かせないときは push / release まで待つ（busy-wait なし）。
//! - `RetryHead`: 先頭 task の資源が埋まっていれば `Deferred` にして戻し、
//!   `deferral_delay` 後に再試行する。

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::scheduler::SchedulerCore;
use super::worker::WorkerPool;
use crate::config::{DispatchConfig, DispatchMode};
use crate::domain::Task;

pub struct Dispatcher {
    core: Arc<SchedulerCore>,
    pool: WorkerPool,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(core: Arc<SchedulerCore>) -> Self {
        let config = core.config().dispatch.clone();
        let pool = WorkerPool::new(Arc::clone(&core));
        Self { core, pool, config }
    }

    /// Run the dispatch loop on its own tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Dispatch forever. Stops only when the owning task is aborted.
    pub async fn run(self) {
        tracing::info!(mode = ?self.config.mode, "Dispatcher started");
        loop {
            let slot = self.pool.reserve().await;
            let task = match self.config.mode {
                DispatchMode::SkipBlocked => self.next_ready().await,
                DispatchMode::RetryHead => self.next_head().await,
            };
            tracing::debug!(task_id = %task.id, resource = %task.resource, "Task dispatched");
            self.pool.spawn(task, slot);
        }
    }

    /// Earliest task whose resource is free. The lock is taken during
    /// selection.
    async fn next_ready(&self) -> Task {
        let locks = self.core.registry().locks();
        self.core
            .registry()
            .queue()
            .pop_ready(|resource| locks.try_acquire(resource))
            .await
    }

    /// Head of the queue, retried after a delay while its resource is busy.
    async fn next_head(&self) -> Task {
        let registry = self.core.registry();
        loop {
            let mut task = registry.queue().pop().await;
            if registry.locks().try_acquire(&task.resource) {
                return task;
            }
            tracing::debug!(
                task_id = %task.id,
                resource = %task.resource,
                "Task deferred, resource busy"
            );
            task.mark_deferred();
            registry.insert(task).await;
            tokio::time::sleep(self.config.deferral_delay()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::protocol::TaskRequest;
    use crate::config::ServerConfig;
    use crate::domain::{ResourceKey, TaskStatus};
    use crate::testing::{FakeRunner, core_with, wait_until};

    fn request(service: i32, priority: i32) -> TaskRequest {
        TaskRequest {
            service_number: service,
            requester: "c".to_string(),
            priority,
            extra: None,
        }
    }

    fn config(mode: DispatchMode) -> ServerConfig {
        ServerConfig {
            dispatch: DispatchConfig {
                mode,
                deferral_delay_ms: 10,
            },
            ..ServerConfig::default()
        }
    }

    fn completed(core: &SchedulerCore) -> usize {
        core.history()
            .snapshot()
            .iter()
            .filter(|r| r.status.task_status() == TaskStatus::Completed)
            .count()
    }

    #[tokio::test]
    async fn same_resource_never_runs_concurrently() {
        let runner = Arc::new(FakeRunner::gated());
        let core = core_with(Arc::clone(&runner), config(DispatchMode::SkipBlocked));
        let handle = Dispatcher::new(Arc::clone(&core)).spawn();

        for _ in 0..3 {
            core.submit(&request(2001, 1)).await.unwrap();
        }
        wait_until(|| runner.running() == 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert_eq!(runner.running(), 1);

        runner.release(3);
        wait_until(|| completed(&core) == 3).await;
        assert_eq!(runner.max_running("user_setup.sh"), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn blocked_task_is_deferred_while_others_proceed() {
        let runner = Arc::new(FakeRunner::gated());
        let core = core_with(Arc::clone(&runner), config(DispatchMode::SkipBlocked));

        // R が外部で保持されている状態
        let busy = ResourceKey::new("user_setup.sh");
        assert!(core.registry().locks().try_acquire(&busy));

        let handle = Dispatcher::new(Arc::clone(&core)).spawn();
        let blocked = core.submit(&request(2001, 1)).await.unwrap();
        core.submit(&request(2002, 5)).await.unwrap();

        wait_until(|| runner.calls() == vec!["dir_perms.sh"]).await;
        let pending = core.registry().pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, blocked.id);
        assert_eq!(pending[0].status, TaskStatus::Deferred);

        core.registry().release(&busy);
        wait_until(|| runner.calls().len() == 2).await;
        assert_eq!(runner.calls()[1], "user_setup.sh");

        runner.release(2);
        wait_until(|| completed(&core) == 2).await;
        handle.abort();
    }

    #[tokio::test]
    async fn higher_priority_is_dispatched_first() {
        let runner = Arc::new(FakeRunner::new());
        let core = core_with(Arc::clone(&runner), config(DispatchMode::SkipBlocked));

        core.submit(&request(2003, 3)).await.unwrap();
        core.submit(&request(2001, 1)).await.unwrap();
        core.submit(&request(2002, 2)).await.unwrap();

        let handle = Dispatcher::new(Arc::clone(&core)).spawn();
        wait_until(|| completed(&core) == 3).await;
        assert_eq!(
            runner.calls(),
            vec!["user_setup.sh", "dir_perms.sh", "system_monitor.sh"]
        );
        handle.abort();
    }

    #[tokio::test]
    async fn retry_head_waits_for_the_blocked_head() {
        let runner = Arc::new(FakeRunner::gated());
        let core = core_with(Arc::clone(&runner), config(DispatchMode::RetryHead));

        let busy = ResourceKey::new("user_setup.sh");
        assert!(core.registry().locks().try_acquire(&busy));

        let handle = Dispatcher::new(Arc::clone(&core)).spawn();
        core.submit(&request(2001, 1)).await.unwrap();
        core.submit(&request(2002, 5)).await.unwrap();

        // 先頭が詰まっている間は後続も動かない
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(runner.calls().is_empty());

        core.registry().release(&busy);
        wait_until(|| runner.calls().len() == 2).await;
        assert_eq!(runner.calls(), vec!["user_setup.sh", "dir_perms.sh"]);

        runner.release(2);
        wait_until(|| completed(&core) == 2).await;
        handle.abort();
    }
}

//! SchedulerCore - 共有状態の単一ハンドル
//!
//! Sessions, the dispatcher and workers all hold an `Arc<SchedulerCore>`;
//! there is no global state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::broadcast::BroadcastHub;
use super::history::HistoryLog;
use super::protocol::{self, TaskRequest};
use super::registry::TaskRegistry;
use crate::config::ServerConfig;
use crate::domain::{HistoryRecord, HistoryStatus, ResourceKey, Task};
use crate::error::Rejection;
use crate::ports::{Clock, IdGenerator, ScriptRunner};
use crate::queue::RateLimiter;

pub struct SchedulerCore {
    registry: TaskRegistry,
    history: HistoryLog,
    hub: BroadcastHub,
    clock: Arc<dyn Clock>,
    runner: Arc<dyn ScriptRunner>,
    config: ServerConfig,
}

impl SchedulerCore {
    pub fn new(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        runner: Arc<dyn ScriptRunner>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_window());
        Self {
            registry: TaskRegistry::new(ids, rate_limiter),
            history: HistoryLog::new(),
            hub: BroadcastHub::new(),
            clock,
            runner,
            config,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn runner(&self) -> &Arc<dyn ScriptRunner> {
        &self.runner
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn validator_path(&self) -> PathBuf {
        self.config.validator.clone()
    }

    pub fn script_path(&self, resource: &ResourceKey) -> PathBuf {
        self.config.script_path(resource.as_str())
    }

    /// Run the connection validator and return its exit code.
    ///
    /// A validator that cannot be started counts as code `-1`.
    pub async fn validate_client(&self) -> i32 {
        let validator = self.validator_path();
        match self.runner.run(&validator).await {
            Ok(code) => code,
            Err(err) => {
                tracing::error!(error = %err, "Validator could not be run");
                -1
            }
        }
    }

    /// `REQUEST_TASK`: admit, record `Queued`, then make the task visible.
    ///
    /// History is written before the insert so an `EXECUTING` record can
    /// never precede the task's `QUEUED` record.
    pub async fn submit(&self, request: &TaskRequest) -> Result<Task, Rejection> {
        let task = self.registry.admit(request, self.now())?;
        self.record(&task, HistoryStatus::Queued);
        tracing::info!(
            task_id = %task.id,
            client = %task.requester,
            script = %task.resource,
            priority = task.priority,
            "Task queued"
        );
        self.registry.insert(task.clone()).await;
        Ok(task)
    }

    /// `CANCEL_TASK`: pending tasks only.
    pub async fn cancel(&self, raw_id: i64) -> Result<Task, Rejection> {
        let task = self.registry.cancel(raw_id).await?;
        self.record(&task, HistoryStatus::Cancelled);
        tracing::info!(task_id = %task.id, "Task cancelled");
        Ok(task)
    }

    pub async fn queue_report(&self) -> String {
        protocol::render_queue_status(&self.registry.pending().await)
    }

    pub fn history_report(&self) -> String {
        protocol::render_history(&self.history.snapshot())
    }

    pub fn record(&self, task: &Task, status: HistoryStatus) {
        self.history
            .append(HistoryRecord::new(task, status, self.now()));
    }

    /// Stamp `message` and send it to every connected client.
    pub fn broadcast(&self, message: &str) {
        let line = protocol::status_line(&self.now(), message);
        let delivered = self.hub.send(&line);
        tracing::debug!(delivered, "Broadcast sent");
    }

    /// Format a reply for one client.
    pub fn reply(&self, result: Result<String, Rejection>) -> String {
        let message = match result {
            Ok(message) => message,
            Err(reason) => {
                tracing::info!(%reason, "Request rejected");
                protocol::rejected(&reason)
            }
        };
        protocol::status_line(&self.now(), &message)
    }
}

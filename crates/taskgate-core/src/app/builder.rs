//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンで ports の実装を差し替える（テストでは fake を注入）
//! - 起動時検証（Fail-fast 設計）

use std::future::Future;
use std::sync::Arc;

use super::scheduler::SchedulerCore;
use super::server::Server;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::impls::ProcessRunner;
use crate::ports::{Clock, IdGenerator, ScriptRunner, SequentialIdGenerator, SystemClock};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config).build()?;
/// app.serve(async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// ```
///
/// # Fail-fast 設計
/// - `script_dir` が存在するディレクトリか
/// - `max_concurrent_workers` が 0 でないか
///
/// validator 自体は接続ごとに実行されるので、ここでは存在チェックしない。
pub struct AppBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
    runner: Arc<dyn ScriptRunner>,
    ids: Option<Box<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("script_dir {0} is not a directory")]
    ScriptDirMissing(std::path::PathBuf),

    #[error("max_concurrent_workers must be at least 1")]
    ZeroWorkers,
}

impl AppBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            runner: Arc::new(ProcessRunner::new()),
            ids: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ScriptRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the id source. Defaults to a counter seeded from `id_seed`.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> std::result::Result<App, BuildError> {
        if !self.config.script_dir.is_dir() {
            return Err(BuildError::ScriptDirMissing(self.config.script_dir));
        }
        if self.config.max_concurrent_workers == Some(0) {
            return Err(BuildError::ZeroWorkers);
        }

        let ids: Box<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Box::new(SequentialIdGenerator::new(self.config.id_seed)),
        };
        let core = SchedulerCore::new(self.config, self.clock, self.runner, ids);
        Ok(App {
            core: Arc::new(core),
        })
    }
}

/// App は構築済みのサーバー一式
pub struct App {
    core: Arc<SchedulerCore>,
}

impl App {
    pub fn core(&self) -> &Arc<SchedulerCore> {
        &self.core
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> Result<Server> {
        Server::bind(self.core.config().listen_addr, Arc::clone(&self.core)).await
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.bind().await?.run(shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use std::path::PathBuf;

    fn config() -> ServerConfig {
        ServerConfig {
            script_dir: std::env::temp_dir(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_build_success() {
        let app = AppBuilder::new(config())
            .with_runner(Arc::new(FakeRunner::new()))
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_build_missing_script_dir() {
        let cfg = ServerConfig {
            script_dir: PathBuf::from("/nonexistent/taskgate-scripts"),
            ..ServerConfig::default()
        };
        let app = AppBuilder::new(cfg).build();
        assert!(matches!(
            app,
            Err(BuildError::ScriptDirMissing(dir)) if dir == PathBuf::from("/nonexistent/taskgate-scripts")
        ));
    }

    #[test]
    fn test_build_zero_workers() {
        let cfg = ServerConfig {
            max_concurrent_workers: Some(0),
            ..config()
        };
        assert!(matches!(
            AppBuilder::new(cfg).build(),
            Err(BuildError::ZeroWorkers)
        ));
    }

    #[tokio::test]
    async fn test_id_seed_from_config() {
        let cfg = ServerConfig {
            id_seed: 500,
            rate_limit_window_ms: 0,
            ..config()
        };
        let app = AppBuilder::new(cfg)
            .with_runner(Arc::new(FakeRunner::new()))
            .build()
            .unwrap();
        let request = crate::app::TaskRequest {
            service_number: 2001,
            requester: "c".to_string(),
            priority: 1,
            extra: None,
        };
        let task = app.core().submit(&request).await.unwrap();
        assert_eq!(task.id.get(), 501);
    }
}

//! taskgate-core
//!
//! Core building blocks for the taskgate task server.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, service, task, status, history）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, ScriptRunner）
//! - **impls**: 実装（tokio::process による ProcessRunner）
//! - **queue**: 待ち行列・資源ロック・レート制限
//! - **app**: アプリケーションロジック（core, session, dispatcher, worker, server, builder）
//! - **config**: ServerConfig（JSON + CLI 上書き）
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{App, AppBuilder, SchedulerCore, Server};
pub use config::{DispatchConfig, DispatchMode, ServerConfig};
pub use error::{Rejection, Result, TaskgateError};

//! App - アプリケーション層
//!
//! domain / queue / ports を組み合わせてサーバーを構成します。
//!
//! # 主要コンポーネント
//! - **SchedulerCore**: 共有状態（registry, history, hub）の単一ハンドル
//! - **Session**: 接続ごとの handshake と command loop
//! - **Dispatcher**: 待ち行列から実行可能な task を選ぶ
//! - **WorkerPool**: スクリプト実行と結果の記録・配信
//! - **Server**: TCP accept loop
//! - **AppBuilder**: 構築と起動時検証

pub mod broadcast;
pub mod builder;
pub mod dispatcher;
pub mod history;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod worker;

// 主要な型を再エクスポート
pub use self::broadcast::{BroadcastHub, ListenerId};
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::Dispatcher;
pub use self::history::HistoryLog;
pub use self::protocol::{Command, TaskRequest};
pub use self::registry::TaskRegistry;
pub use self::scheduler::SchedulerCore;
pub use self::server::Server;
pub use self::session::Session;
pub use self::worker::{WorkerPool, WorkerSlot};

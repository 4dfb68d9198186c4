//! Ports - 抽象化レイヤー
//!
//! 時刻・ID・外部プロセスへのインターフェースを trait として定義し、
//! テストでは fake に差し替えられるようにします。

pub mod clock;
pub mod id_generator;
pub mod script_runner;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialIdGenerator};
pub use self::script_runner::ScriptRunner;

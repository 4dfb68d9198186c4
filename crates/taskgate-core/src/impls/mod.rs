//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ProcessRunner**: 本番用の ScriptRunner（子プロセスを起動）

pub mod process;

pub use self::process::ProcessRunner;

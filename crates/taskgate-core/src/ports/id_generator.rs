//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **SequentialIdGenerator**: atomic counter, first id is `seed + 1`

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::TaskId;

/// IdGenerator hands out task ids.
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数 session から同時に呼ばれる）
/// - ids must be unique and strictly increasing in call order
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// Monotonic counter seeded above zero.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    last: AtomicU64,
}

impl SequentialIdGenerator {
    pub const DEFAULT_SEED: u64 = 100;

    /// The first id issued is `seed + 1`.
    pub fn new(seed: u64) -> Self {
        Self {
            last: AtomicU64::new(seed),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_task_id(&self) -> TaskId {
        TaskId::new(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

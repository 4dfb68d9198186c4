//! Domain model (IDs, tasks, services, statuses, history records).

pub mod history;
pub mod ids;
pub mod service;
pub mod status;
pub mod task;

pub use history::HistoryRecord;
pub use ids::TaskId;
pub use service::{ResourceKey, Service};
pub use status::{HistoryStatus, TaskStatus};
pub use task::{OrderKey, Task};

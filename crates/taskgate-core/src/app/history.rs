//! History log - append-only record of status transitions.

use std::sync::RwLock;

use crate::domain::HistoryRecord;

/// Append-only, ordered by append time.
///
/// Readers get a copy, so a concurrent append can never show up half-written
/// or twice in a snapshot.
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: RwLock<Vec<HistoryRecord>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: HistoryRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HistoryStatus, ResourceKey, Service, Task, TaskId};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn record(id: u64, status: HistoryStatus) -> HistoryRecord {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let task = Task::new(
            TaskId::new(id),
            Service::FileAudit,
            ResourceKey::new("file_audit.sh"),
            "c",
            1,
            now,
        );
        HistoryRecord::new(&task, status, now)
    }

    #[test]
    fn snapshot_preserves_append_order() {
        let log = HistoryLog::new();
        log.append(record(101, HistoryStatus::Queued));
        log.append(record(101, HistoryStatus::Executing));
        log.append(record(101, HistoryStatus::Completed));

        let statuses: Vec<_> = log.snapshot().into_iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                HistoryStatus::Queued,
                HistoryStatus::Executing,
                HistoryStatus::Completed
            ]
        );
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let log = HistoryLog::new();
        log.append(record(101, HistoryStatus::Queued));
        let before = log.snapshot();
        log.append(record(102, HistoryStatus::Queued));

        assert_eq!(before.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let log = Arc::new(HistoryLog::new());
        let handles: Vec<_> = (0..4u64)
            .map(|n| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.append(record(n * 100 + i, HistoryStatus::Queued));
                        let _ = log.snapshot();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(log.len(), 200);
    }
}

//! BroadcastHub - 全 session へのステータス配信

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;

/// Handle returned by [`BroadcastHub::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Live set of session output channels.
///
/// # 設計
/// - Each session owns an unbounded channel drained by its socket writer.
///   There is no backpressure: a client that stops reading grows its queue
///   until it disconnects.
/// - `send` never waits: a channel whose receiver is gone is dropped from the
///   set on the spot, and the caller is not told.
/// - One lock around the set serializes sends, so every listener sees events
///   in send order.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<ListenerId, UnboundedSender<String>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tx: UnboundedSender<String>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        id
    }

    pub fn unregister(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    /// Deliver an already formatted line to every listener.
    ///
    /// Returns how many listeners received it.
    pub fn send(&self, line: &str) -> usize {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|id, tx| {
            let ok = tx.send(line.to_string()).is_ok();
            if !ok {
                tracing::debug!(listener = id.0, "Dropping closed listener");
            }
            ok
        });
        let delivered = listeners.len();
        if delivered < before {
            tracing::debug!(pruned = before - delivered, "Pruned dead listeners");
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

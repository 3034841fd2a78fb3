use std::collections::VecDeque;
use std::time::Duration;
use subwatch_core::QueueItem;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub oldest_wait: Duration,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    total_enqueued: u64,
    total_dequeued: u64,
}

/// Unbounded FIFO of keyword matches waiting for the classifier.
///
/// The fetch side pushes, the classify side pops. `dequeue` parks the caller
/// until an item is available.
#[derive(Debug, Default)]
pub struct AnalysisQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl AnalysisQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, item: QueueItem) {
        {
            let mut state = self.state.lock().await;
            debug!(
                "Queueing '{}' (keyword: {}), {} already pending",
                item.post.title,
                item.keyword,
                state.items.len()
            );
            state.items.push_back(item);
            state.total_enqueued += 1;
        }
        self.available.notify_one();
    }

    pub async fn try_dequeue(&self) -> Option<QueueItem> {
        let mut state = self.state.lock().await;
        let item = state.items.pop_front()?;
        state.total_dequeued += 1;
        Some(item)
    }

    /// Waits for the next item. Cancel-safe: an item is only removed in the
    /// same poll that returns it.
    pub async fn dequeue(&self) -> QueueItem {
        loop {
            if let Some(item) = self.try_dequeue().await {
                return item;
            }
            self.available.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        QueueStats {
            pending: state.items.len(),
            total_enqueued: state.total_enqueued,
            total_dequeued: state.total_dequeued,
            oldest_wait: state
                .items
                .front()
                .and_then(|item| item.enqueued_at.elapsed().ok())
                .unwrap_or_default(),
        }
    }
}

//! Offline intent capture.
//!
//! When connectivity is down, user actions are captured as data-only
//! intents instead of being dropped or half-applied. On reconnect they
//! replay through the same trigger paths as live actions, so every guard
//! runs again against the then-current state. An intent that no longer
//! applies is dropped with an event, never forced.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

/// A deferred user action. Data only; no logic lives here.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingIntent {
    Accept { booking_id: String, amount: Option<i64> },
    Reject { booking_id: String },
    Cancel { booking_id: String, reason: String },
    Refer { booking_id: String, to_provider: String, note: Option<String> },
    SubmitAttendance { booking_id: String, attended: bool, note: Option<String> },
}

impl BookingIntent {
    /// Booking this intent targets.
    pub fn booking_id(&self) -> &str {
        match self {
            Self::Accept { booking_id, .. }
            | Self::Reject { booking_id }
            | Self::Cancel { booking_id, .. }
            | Self::Refer { booking_id, .. }
            | Self::SubmitAttendance { booking_id, .. } => booking_id,
        }
    }

    /// Short label for events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Reject { .. } => "reject",
            Self::Cancel { .. } => "cancel",
            Self::Refer { .. } => "refer",
            Self::SubmitAttendance { .. } => "attendance",
        }
    }
}

/// FIFO queue of captured intents.
#[derive(Clone, Default)]
pub struct IntentQueue {
    queue: Arc<Mutex<VecDeque<BookingIntent>>>,
}

impl IntentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture an intent.
    pub async fn push(&self, intent: BookingIntent) {
        info!(
            booking_id = intent.booking_id(),
            action = intent.label(),
            "intent captured for replay"
        );
        self.queue.lock().await.push_back(intent);
    }

    /// Take all queued intents in capture order.
    pub async fn drain(&self) -> Vec<BookingIntent> {
        self.queue.lock().await.drain(..).collect()
    }

    /// Number of queued intents.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = IntentQueue::new();
        queue.push(BookingIntent::Reject { booking_id: "bk-1".into() }).await;
        queue
            .push(BookingIntent::Cancel { booking_id: "bk-2".into(), reason: "moved".into() })
            .await;

        assert_eq!(queue.len().await, 2);
        let drained = queue.drain().await;
        assert_eq!(drained[0].booking_id(), "bk-1");
        assert_eq!(drained[1].booking_id(), "bk-2");
        assert!(queue.is_empty().await);
    }

    #[test]
    fn test_labels() {
        let intent = BookingIntent::SubmitAttendance {
            booking_id: "bk-1".into(),
            attended: true,
            note: None,
        };
        assert_eq!(intent.label(), "attendance");
        assert_eq!(intent.booking_id(), "bk-1");
    }
}

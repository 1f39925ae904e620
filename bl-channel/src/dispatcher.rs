//! Broadcast-based frame dispatcher with booking-update deduplication.
//!
//! The server may redeliver a booking snapshot after a reconnect replay.
//! The dispatcher collapses duplicates keyed on `(booking_id, version)`
//! before they reach any subscriber, so downstream consumers never see
//! the same transition twice.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

use bl_core::constants::MAX_DEDUP_HISTORY;

use crate::frames::InboundFrame;

/// Connection state of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Attempting to establish a connection.
    Connecting,
    /// Connected and receiving frames.
    Connected,
    /// Connection lost, retrying with backoff.
    Reconnecting,
    /// Retry budget exhausted. Stays here until an explicit reconnect.
    Offline,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Fan-out point for decoded inbound frames.
///
/// Uses tokio::broadcast so multiple consumers can independently receive
/// frames without blocking each other.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<InboundFrame>,
    /// Rolling window of recently delivered `(booking_id, version)` pairs.
    seen_updates: Arc<Mutex<VecDeque<(String, u64)>>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            seen_updates: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Subscribe to receive inbound frames.
    ///
    /// Slow consumers that fall behind receive `RecvError::Lagged` and
    /// may miss frames; the booking cache recovers via a fetch.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundFrame> {
        self.sender.subscribe()
    }

    /// Dispatch a frame to all active subscribers.
    ///
    /// Returns `false` if the frame was a duplicate booking update and
    /// was collapsed instead of delivered.
    pub fn dispatch(&self, frame: InboundFrame) -> bool {
        if let InboundFrame::BookingUpdate(record) = &frame {
            let key = (record.id.clone(), record.version);
            let mut seen = self
                .seen_updates
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if seen.contains(&key) {
                debug!(
                    booking_id = %key.0,
                    version = key.1,
                    "duplicate booking update collapsed"
                );
                return false;
            }
            seen.push_back(key);
            if seen.len() > MAX_DEDUP_HISTORY {
                seen.pop_front();
            }
        }

        let type_name = frame.type_name().to_string();
        match self.sender.send(frame) {
            Ok(count) => {
                debug!("dispatched {type_name} to {count} subscriber(s)");
            }
            Err(_) => {
                // No active receivers -- fine during startup/shutdown
                debug!("no subscribers for frame {type_name}");
            }
        }
        true
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Clear the deduplication window.
    pub fn clear_dedup_history(&self) {
        self.seen_updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

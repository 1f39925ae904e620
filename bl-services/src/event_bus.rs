//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels to decouple services from one another.
//! Any service can emit events without knowing who is listening, and any
//! number of subscribers can independently consume events.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use bl_models::BookingStatus;

/// All application-level event types that flow through the event bus.
///
/// These are distinct from raw channel frames -- they represent processed,
/// application-meaningful state changes that other services and the UI
/// care about.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A booking's cached record changed (local trigger or remote adopt).
    BookingChanged {
        booking_id: String,
        status: BookingStatus,
        version: u64,
    },
    /// A payment was verified and a receipt recorded.
    PaymentReceipt {
        booking_id: String,
        order_ref: String,
        transaction_id: String,
    },
    /// A payment verification ended ambiguous; manual resolution needed.
    PaymentAmbiguous {
        booking_id: String,
        reason: String,
    },
    /// A chat message arrived in a booking room.
    ChatMessage {
        room: String,
        from: String,
        body: String,
    },
    /// Typing indicator state changed in a booking room.
    TypingChanged {
        room: String,
        from: String,
        is_typing: bool,
    },
    /// Realtime channel connectivity changed.
    ConnectivityChanged {
        connected: bool,
        detail: String,
    },
    /// An action was captured as an intent while offline.
    IntentQueued {
        booking_id: String,
        action: String,
    },
    /// A queued intent was replayed after connectivity returned.
    IntentReplayed {
        booking_id: String,
        action: String,
    },
    /// A queued intent was dropped because it no longer applies.
    IntentDropped {
        booking_id: String,
        action: String,
        reason: String,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Designed for fan-out delivery: every subscriber gets every event.
/// Slow subscribers that fall behind will receive a `Lagged` error
/// and may miss events, which is acceptable for UI-driven consumers.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
pub fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::BookingChanged { .. } => "BookingChanged",
        AppEvent::PaymentReceipt { .. } => "PaymentReceipt",
        AppEvent::PaymentAmbiguous { .. } => "PaymentAmbiguous",
        AppEvent::ChatMessage { .. } => "ChatMessage",
        AppEvent::TypingChanged { .. } => "TypingChanged",
        AppEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
        AppEvent::IntentQueued { .. } => "IntentQueued",
        AppEvent::IntentReplayed { .. } => "IntentReplayed",
        AppEvent::IntentDropped { .. } => "IntentDropped",
    }
}

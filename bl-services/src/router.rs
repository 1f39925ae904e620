//! Routes decoded realtime frames into the service layer.
//!
//! This is the central coordinator for realtime traffic. It receives
//! frames from the channel's EventDispatcher, runs booking snapshots
//! through the cache's stale/legal-edge checks, recovers from gaps by
//! refetching the authoritative record, and re-emits processed AppEvents
//! through the EventBus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use bl_api::BookingApi;
use bl_channel::{EventDispatcher, InboundFrame};
use bl_core::error::{BlError, BlResult};
use bl_models::Applied;

use crate::cache::BookingCache;
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// Routes inbound channel frames to the appropriate service logic.
///
/// Responsibilities:
/// - Runs booking snapshots through [`BookingCache::apply_remote`]
/// - Fetches unknown bookings instead of trusting a pushed snapshot
/// - Re-syncs from the API when a pushed snapshot claims an illegal edge
///   (the local cache has fallen behind)
/// - Converts chat and typing frames into AppEvents
pub struct UpdateRouter {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    event_bus: EventBus,
}

impl UpdateRouter {
    /// Create a new UpdateRouter.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            event_bus,
        }
    }

    /// Process one inbound frame.
    ///
    /// This is the main entry point called by the channel listener task.
    pub async fn handle_frame(&self, frame: InboundFrame) -> BlResult<()> {
        match frame {
            InboundFrame::BookingUpdate(record) => self.handle_booking_update(record).await,
            InboundFrame::ChatMessage(msg) => {
                self.event_bus.emit(AppEvent::ChatMessage {
                    room: msg.room,
                    from: msg.from,
                    body: msg.body,
                });
                Ok(())
            }
            InboundFrame::TypingIndicator(t) => {
                self.event_bus.emit(AppEvent::TypingChanged {
                    room: t.room,
                    from: t.from,
                    is_typing: t.typing,
                });
                Ok(())
            }
            // Pong is consumed by the channel manager; Unknown is dropped
            // there too. Neither should reach the router.
            other => {
                debug!("router ignoring frame: {}", other.type_name());
                Ok(())
            }
        }
    }

    /// Apply a pushed booking snapshot, recovering from cache gaps.
    async fn handle_booking_update(&self, record: bl_models::BookingRecord) -> BlResult<()> {
        let booking_id = record.id.clone();
        match self.cache.apply_remote(record).await {
            Ok(Applied::Updated) => {
                debug!("adopted pushed update for {booking_id}");
                Ok(())
            }
            Ok(Applied::Stale) => Ok(()),
            Err(BlError::BookingNotFound(_)) => {
                // First sighting of this booking on this device. The push
                // is a hint; fetch the authoritative record.
                info!("unknown booking {booking_id} pushed, fetching");
                let fetched = self.api.fetch_booking(&booking_id).await?;
                self.cache.adopt(fetched).await;
                Ok(())
            }
            Err(BlError::InvalidTransition(reason)) => {
                // The cache fell behind (missed intermediate versions while
                // lagged). Re-sync from the source of truth.
                warn!("pushed update refused for {booking_id} ({reason}), re-syncing");
                let fetched = self.api.fetch_booking(&booking_id).await?;
                self.cache.adopt(fetched).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Get a reference to the event bus for external subscriptions.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Start the background listener that consumes channel frames.
    ///
    /// Spawns a tokio task that subscribes to the channel EventDispatcher
    /// and routes each frame through handle_frame.
    pub fn start_listener(
        router: Arc<UpdateRouter>,
        dispatcher: &EventDispatcher,
    ) -> tokio::task::JoinHandle<()> {
        let mut rx = dispatcher.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(frame) => {
                        if let Err(e) = router.handle_frame(frame).await {
                            error!("update router error: {e}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("update router lagged by {n} frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("update router: channel dispatcher closed");
                        break;
                    }
                }
            }
        })
    }
}

impl Service for UpdateRouter {
    fn name(&self) -> &str {
        "update_router"
    }
    fn state(&self) -> ServiceState {
        self.state
    }
    fn init(&mut self) -> BlResult<()> {
        self.state = ServiceState::Running;
        info!("update router initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> BlResult<()> {
        self.state = ServiceState::Stopped;
        info!("update router stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use bl_models::{BookingRecord, BookingStatus, TransitionPolicy};

    fn setup() -> (Arc<BookingCache>, Arc<MockApi>, UpdateRouter, broadcast::Receiver<AppEvent>) {
        let bus = EventBus::new(32);
        let rx = bus.subscribe();
        let cache = Arc::new(BookingCache::new(TransitionPolicy::default(), bus.clone()));
        let api = Arc::new(MockApi::new());
        let router = UpdateRouter::new(
            Arc::clone(&cache),
            Arc::clone(&api) as Arc<dyn BookingApi>,
            bus,
        );
        (cache, api, router, rx)
    }

    #[tokio::test]
    async fn test_booking_update_adopted() {
        let (cache, _api, router, _rx) = setup();
        cache.adopt(crate::testing::sample_record("bk-1")).await;

        let mut pushed = crate::testing::sample_record("bk-1");
        pushed.status = BookingStatus::Confirmed;
        pushed.version = 2;
        router
            .handle_frame(InboundFrame::BookingUpdate(pushed))
            .await
            .unwrap();

        assert_eq!(cache.get("bk-1").await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_stale_update_is_silent() {
        let (cache, api, router, _rx) = setup();
        cache.adopt(crate::testing::sample_record("bk-1")).await;

        let stale = crate::testing::sample_record("bk-1");
        router
            .handle_frame(InboundFrame::BookingUpdate(stale))
            .await
            .unwrap();

        assert_eq!(cache.get("bk-1").await.unwrap().version, 1);
        assert_eq!(api.calls("fetch_booking"), 0);
    }

    #[tokio::test]
    async fn test_unknown_booking_triggers_fetch() {
        let (cache, api, router, _rx) = setup();

        let record = crate::testing::sample_record("bk-new");
        api.seed(record.clone());
        router
            .handle_frame(InboundFrame::BookingUpdate(record))
            .await
            .unwrap();

        assert_eq!(api.calls("fetch_booking"), 1);
        assert!(cache.get("bk-new").await.is_some());
    }

    #[tokio::test]
    async fn test_illegal_edge_resyncs_from_api() {
        let (cache, api, router, _rx) = setup();
        cache.adopt(crate::testing::sample_record("bk-1")).await;

        // The server knows a newer, truthful state.
        let mut authoritative = crate::testing::sample_record("bk-1");
        authoritative.status = BookingStatus::Confirmed;
        authoritative.version = 3;
        api.seed(authoritative);

        // A pushed snapshot that skips ahead to an unreachable status.
        let mut skipped: BookingRecord = crate::testing::sample_record("bk-1");
        skipped.status = BookingStatus::Completed;
        skipped.version = 5;
        router
            .handle_frame(InboundFrame::BookingUpdate(skipped))
            .await
            .unwrap();

        assert_eq!(api.calls("fetch_booking"), 1);
        let cached = cache.get("bk-1").await.unwrap();
        assert_eq!(cached.status, BookingStatus::Confirmed);
        assert_eq!(cached.version, 3);
    }

    #[tokio::test]
    async fn test_chat_frame_becomes_app_event() {
        let (_cache, _api, router, mut rx) = setup();

        router
            .handle_frame(InboundFrame::ChatMessage(bl_channel::ChatMessagePayload {
                room: "bk-1".into(),
                from: "seeker-1".into(),
                body: "running late".into(),
                sent_at: chrono::Utc::now(),
            }))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            AppEvent::ChatMessage { room, body, .. } => {
                assert_eq!(room, "bk-1");
                assert_eq!(body, "running late");
            }
            _ => panic!("unexpected event"),
        }
    }
}

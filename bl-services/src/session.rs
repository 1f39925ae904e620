//! Session service tying the realtime channel to the local services.
//!
//! Owns the channel manager, routes its frames through the update router,
//! and mirrors connectivity into the trigger service so offline capture
//! and replay happen without the caller tracking connection state.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bl_channel::{ChannelManager, ConnectionState};
use bl_core::error::BlResult;

use crate::event_bus::{AppEvent, EventBus};
use crate::router::UpdateRouter;
use crate::service::{Service, ServiceState};
use crate::triggers::TriggerService;

/// Orchestrates the realtime session.
///
/// Startup connects the channel, starts the frame listener, and watches
/// connection state; on every transition to `Connected` the captured
/// intent queue is replayed.
pub struct SessionService {
    state: ServiceState,
    channel: Arc<ChannelManager>,
    router: Arc<UpdateRouter>,
    triggers: Arc<TriggerService>,
    event_bus: EventBus,
    listener_task: Option<JoinHandle<()>>,
    watcher_task: Option<JoinHandle<()>>,
}

impl SessionService {
    pub fn new(
        channel: Arc<ChannelManager>,
        router: Arc<UpdateRouter>,
        triggers: Arc<TriggerService>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            channel,
            router,
            triggers,
            event_bus,
            listener_task: None,
            watcher_task: None,
        }
    }

    pub fn channel(&self) -> &Arc<ChannelManager> {
        &self.channel
    }

    /// Run the startup sequence.
    ///
    /// 1. Start routing decoded frames to the update router
    /// 2. Start mirroring connection state into the trigger service
    /// 3. Connect the realtime channel
    ///
    /// A failed initial connect is not fatal: the channel's reconnect
    /// loop keeps trying, and triggers fall back to intent capture
    /// until connectivity returns.
    pub async fn startup(&mut self) -> BlResult<()> {
        info!("starting realtime session");

        let listener =
            UpdateRouter::start_listener(Arc::clone(&self.router), self.channel.dispatcher());
        self.listener_task = Some(listener);
        self.watcher_task = Some(self.spawn_connectivity_watcher());

        match self.channel.connect().await {
            Ok(()) => {
                info!("realtime session connected");
            }
            Err(e) => {
                warn!("initial channel connect failed: {e}");
                self.triggers.set_online(false);
            }
        }

        self.state = ServiceState::Running;
        Ok(())
    }

    /// Watch the channel's connection state and keep the trigger
    /// service and event bus in step with it.
    fn spawn_connectivity_watcher(&self) -> JoinHandle<()> {
        let mut rx = self.channel.state_receiver();
        let triggers = Arc::clone(&self.triggers);
        let event_bus = self.event_bus.clone();
        tokio::spawn(async move {
            let mut was_connected = false;
            loop {
                let state = *rx.borrow_and_update();
                let connected = state == ConnectionState::Connected;
                triggers.set_online(connected);
                event_bus.emit(AppEvent::ConnectivityChanged {
                    connected,
                    detail: state.to_string(),
                });

                if connected && !was_connected {
                    match triggers.replay_intents().await {
                        Ok(0) => {}
                        Ok(n) => info!("replayed {n} captured intent(s) after reconnect"),
                        Err(e) => warn!("intent replay after reconnect failed: {e}"),
                    }
                }
                was_connected = connected;

                if rx.changed().await.is_err() {
                    debug!("connection state channel closed, watcher exiting");
                    break;
                }
            }
        })
    }

    /// Tear the session down: stop tasks and close the channel.
    pub async fn shutdown_sequence(&mut self) {
        info!("shutting down realtime session");
        self.state = ServiceState::ShuttingDown;

        if let Some(task) = self.watcher_task.take() {
            task.abort();
        }
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.channel.disconnect().await;
        self.triggers.set_online(false);

        self.state = ServiceState::Stopped;
        info!("realtime session stopped");
    }
}

impl Service for SessionService {
    fn name(&self) -> &str {
        "session"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> BlResult<()> {
        self.state = ServiceState::Running;
        info!("session service initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> BlResult<()> {
        self.state = ServiceState::Stopped;
        info!("session service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use bl_channel::{EventDispatcher, ReconnectConfig};
    use bl_core::credentials::CredentialProvider;
    use bl_models::state_machine::TransitionPolicy;

    use crate::cache::BookingCache;
    use crate::testing::{sample_record, MockApi};

    struct StaticProvider;

    #[async_trait]
    impl CredentialProvider for StaticProvider {
        async fn access_token(&self) -> BlResult<String> {
            Ok("token".to_string())
        }

        async fn realtime_ticket(&self) -> BlResult<String> {
            Ok("ticket".to_string())
        }

        async fn clear_session(&self) -> BlResult<()> {
            Ok(())
        }
    }

    #[allow(clippy::type_complexity)]
    fn build_session() -> (
        SessionService,
        Arc<MockApi>,
        Arc<TriggerService>,
        Arc<BookingCache>,
        EventBus,
    ) {
        let bus = EventBus::new(64);
        let api = Arc::new(MockApi::new());
        let cache = Arc::new(BookingCache::new(TransitionPolicy::default(), bus.clone()));
        let router = Arc::new(UpdateRouter::new(
            Arc::clone(&cache),
            api.clone() as Arc<dyn bl_api::BookingApi>,
            bus.clone(),
        ));
        let triggers = Arc::new(TriggerService::new(
            Arc::clone(&cache),
            api.clone() as Arc<dyn bl_api::BookingApi>,
            bus.clone(),
        ));
        let channel = Arc::new(
            ChannelManager::new(
                "provider-1",
                "wss://example.test",
                Arc::new(StaticProvider),
                EventDispatcher::new(64),
            )
            .with_reconnect_config(ReconnectConfig {
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                max_attempts: 2,
            }),
        );
        let session = SessionService::new(channel, router, Arc::clone(&triggers), bus.clone());
        (session, api, triggers, cache, bus)
    }

    #[tokio::test]
    async fn test_startup_connects_and_marks_online() {
        let (mut session, _api, triggers, _cache, _bus) = build_session();
        session.startup().await.unwrap();

        // Give the watcher a chance to observe the Connected state.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(triggers.is_online());
        assert_eq!(session.channel().state().await, ConnectionState::Connected);

        session.shutdown_sequence().await;
        assert_eq!(session.state(), ServiceState::Stopped);
        assert!(!triggers.is_online());
    }

    #[tokio::test]
    async fn test_inbound_frame_reaches_cache_through_listener() {
        let (mut session, api, _triggers, _cache, bus) = build_session();
        let record = sample_record("bk-1");
        api.seed(record.clone());
        session.startup().await.unwrap();

        let mut events = bus.subscribe();
        let raw = format!(
            r#"{{"type":"booking_update","booking":{}}}"#,
            serde_json::to_string(&record).unwrap()
        );
        session.channel().process_frame(&raw).await.unwrap();

        let event = tokio::time::timeout(Duration::from_millis(200), async {
            loop {
                if let AppEvent::BookingChanged { booking_id, .. } = events.recv().await.unwrap() {
                    break booking_id;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(event, "bk-1");

        session.shutdown_sequence().await;
    }

    #[tokio::test]
    async fn test_reconnect_replays_captured_intents() {
        let (mut session, api, triggers, cache, _bus) = build_session();
        let record = sample_record("bk-1");
        api.seed(record.clone());
        session.startup().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        cache.adopt(record).await;

        // Drop connectivity and capture an intent offline.
        session.channel().disconnect().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!triggers.is_online());

        let outcome = triggers.accept("bk-1", None).await.unwrap();
        assert!(matches!(outcome, crate::triggers::TriggerOutcome::Queued));
        assert_eq!(api.calls("update_status"), 0);

        // Reconnecting flips the watcher back online and replays the queue.
        session.channel().connect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(triggers.is_online());
        assert!(triggers.intents().is_empty().await);
        assert_eq!(api.calls("update_status"), 1);

        session.shutdown_sequence().await;
    }
}

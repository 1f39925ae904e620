//! Realtime channel connection manager.
//!
//! Owns the connection lifecycle for the booking marketplace realtime
//! channel: ticketed connects, a fixed-interval outbound heartbeat,
//! linear-backoff reconnection with a bounded attempt budget, and frame
//! routing into the [`EventDispatcher`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use bl_core::config::RealtimeConfig;
use bl_core::credentials::CredentialProvider;
use bl_core::error::{BlError, BlResult};

use crate::dispatcher::{ConnectionState, EventDispatcher};
use crate::frames::{InboundFrame, OutboundFrame};

/// Reconnection behavior for the channel.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Base delay between reconnection attempts; attempt N waits base * N.
    pub base_delay: Duration,
    /// Cap for the linear backoff.
    pub max_delay: Duration,
    /// Attempts before giving up and entering the persistent offline state.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(
                bl_core::constants::DEFAULT_RECONNECT_BASE_DELAY_SECS,
            ),
            max_delay: Duration::from_secs(bl_core::constants::DEFAULT_RECONNECT_MAX_DELAY_SECS),
            max_attempts: bl_core::constants::DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectConfig {
    /// Build from the persisted realtime configuration.
    pub fn from_realtime(config: &RealtimeConfig) -> Self {
        Self {
            base_delay: Duration::from_secs(config.reconnect_base_delay_secs),
            max_delay: Duration::from_secs(config.reconnect_max_delay_secs),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Heartbeat behavior for the channel.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between outbound pings.
    pub interval: Duration,
    /// Consecutive unanswered pings before the connection is declared dead.
    pub max_missed_pongs: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(bl_core::constants::HEARTBEAT_INTERVAL_SECS),
            max_missed_pongs: 3,
        }
    }
}

/// Realtime channel manager.
///
/// Manages the full lifecycle of the channel connection:
/// - Ticketed connect: every attempt mints a fresh single-use ticket
///   from the [`CredentialProvider`], so a replayed URL is worthless
/// - Outbound heartbeat ping on a fixed interval
/// - Linear-backoff reconnection (base * attempt, capped), with a
///   bounded attempt budget and a persistent `Offline` state after it
/// - Frame decoding and routing into the [`EventDispatcher`]
pub struct ChannelManager {
    /// Actor whose event stream this channel carries.
    actor_id: String,
    /// Realtime endpoint base URL.
    endpoint: String,
    /// Ticket source; consulted fresh on every connect attempt.
    credentials: Arc<dyn CredentialProvider>,
    /// Dispatcher for decoded inbound frames.
    dispatcher: EventDispatcher,
    /// Current connection state.
    state: Arc<Mutex<ConnectionState>>,
    /// Watch channel for state change notifications.
    state_tx: watch::Sender<ConnectionState>,
    /// Reconnection configuration.
    reconnect_config: ReconnectConfig,
    /// Heartbeat configuration.
    heartbeat_config: HeartbeatConfig,
    /// Consecutive reconnection attempts since the last successful connect.
    reconnect_attempts: Arc<Mutex<u32>>,
    /// Consecutive heartbeat pings without a pong.
    missed_pongs: Arc<Mutex<u32>>,
    /// Sender side of the outbound frame queue.
    outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
    /// Receiver side, handed to the transport task on connect.
    outbound_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>>,
    /// Handle to the heartbeat task.
    heartbeat_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    /// Handle to the background reconnect task.
    reconnect_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    /// Notify channel to signal an explicit disconnect request.
    disconnect_notify: Arc<Notify>,
}

impl ChannelManager {
    /// Create a new ChannelManager.
    pub fn new(
        actor_id: impl Into<String>,
        endpoint: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        dispatcher: EventDispatcher,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            actor_id: actor_id.into(),
            endpoint: endpoint.into(),
            credentials,
            dispatcher,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            state_tx,
            reconnect_config: ReconnectConfig::default(),
            heartbeat_config: HeartbeatConfig::default(),
            reconnect_attempts: Arc::new(Mutex::new(0)),
            missed_pongs: Arc::new(Mutex::new(0)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(Some(outbound_rx))),
            heartbeat_task: Arc::new(Mutex::new(None)),
            reconnect_task: Arc::new(Mutex::new(None)),
            disconnect_notify: Arc::new(Notify::new()),
        }
    }

    /// Set custom reconnection configuration.
    pub fn with_reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect_config = config;
        self
    }

    /// Set custom heartbeat configuration.
    pub fn with_heartbeat_config(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat_config = config;
        self
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// Get the event dispatcher (for subscribing to frames).
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Take the outbound frame receiver.
    ///
    /// The transport task drains this queue onto the wire. Can only be
    /// taken once.
    pub async fn take_outbound_receiver(
        &self,
    ) -> Option<mpsc::UnboundedReceiver<OutboundFrame>> {
        self.outbound_rx.lock().await.take()
    }

    /// Update the connection state and notify watchers.
    async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.lock().await;
        if *state != new_state {
            info!("channel state: {} -> {}", *state, new_state);
            *state = new_state;
            let _ = self.state_tx.send(new_state);
        }
    }

    /// Open the realtime channel.
    ///
    /// Mints a fresh ticket, opens the connection, resets the reconnect
    /// budget, and starts the heartbeat.
    pub async fn connect(self: &Arc<Self>) -> BlResult<()> {
        let current_state = self.state().await;
        if current_state == ConnectionState::Connected
            || current_state == ConnectionState::Connecting
        {
            debug!("already connected or connecting, skipping");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting).await;

        let ticket = match self.credentials.realtime_ticket().await {
            Ok(t) => t,
            Err(e) => {
                // Surface the failure; the caller (or reconnect loop)
                // decides whether to retry.
                self.set_state(ConnectionState::Disconnected).await;
                return Err(BlError::Channel(format!("ticket request failed: {e}")));
            }
        };

        let _url = format!(
            "{}/realtime/{}?ticket={}",
            self.endpoint.trim_end_matches('/'),
            self.actor_id,
            ticket
        );
        info!("channel connecting to {}/realtime/{}", self.endpoint, self.actor_id);

        // In a full implementation, this would open the WebSocket at _url.
        // The transport task would:
        // 1. Drain take_outbound_receiver() onto the wire
        // 2. Feed every received text frame through process_frame()
        // 3. Call handle_connection_lost() when the socket drops

        self.set_state(ConnectionState::Connected).await;
        *self.reconnect_attempts.lock().await = 0;
        *self.missed_pongs.lock().await = 0;
        self.start_heartbeat().await;
        Ok(())
    }

    /// Close the channel and cancel any pending reconnect.
    pub async fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected).await;
        self.disconnect_notify.notify_waiters();
        *self.reconnect_attempts.lock().await = 0;

        let mut heartbeat = self.heartbeat_task.lock().await;
        if let Some(handle) = heartbeat.take() {
            handle.abort();
        }

        let mut reconnect = self.reconnect_task.lock().await;
        if let Some(handle) = reconnect.take() {
            handle.abort();
        }

        info!("channel disconnected");
    }

    /// Queue an outbound frame.
    ///
    /// Refused while not connected; callers that need delivery guarantees
    /// during an outage should use the intent queue instead.
    pub async fn send(&self, frame: OutboundFrame) -> BlResult<()> {
        if self.state().await != ConnectionState::Connected {
            return Err(BlError::Channel("channel is not connected".into()));
        }
        self.outbound_tx
            .send(frame)
            .map_err(|_| BlError::Channel("outbound queue closed".into()))
    }

    /// Start the heartbeat task, replacing any previous one.
    async fn start_heartbeat(self: &Arc<Self>) {
        let mut task = self.heartbeat_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let manager = Arc::clone(self);
        let interval = self.heartbeat_config.interval;
        *task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(interval) => {}
                    _ = manager.disconnect_notify.notified() => {
                        debug!("heartbeat stopped by disconnect");
                        return;
                    }
                }
                if manager.state().await != ConnectionState::Connected {
                    return;
                }
                if manager.outbound_tx.send(OutboundFrame::Ping).is_err() {
                    return;
                }
            }
        }));
    }

    /// Process a raw frame off the wire.
    ///
    /// Decodes once, tracks heartbeat liveness, and routes everything
    /// else through the dispatcher. Unknown frame types are logged and
    /// dropped, never dispatched.
    pub async fn process_frame(&self, raw: &str) -> BlResult<()> {
        let frame = InboundFrame::decode(raw)?;
        match frame {
            InboundFrame::Pong => {
                self.on_pong_received().await;
            }
            InboundFrame::Unknown(ref name) => {
                warn!("unknown frame type dropped: {name}");
            }
            other => {
                debug!("channel frame: {}", other.type_name());
                self.dispatcher.dispatch(other);
            }
        }
        Ok(())
    }

    /// Record a heartbeat response. Resets the missed-pong counter.
    pub async fn on_pong_received(&self) {
        *self.missed_pongs.lock().await = 0;
    }

    /// Record a heartbeat interval that elapsed with no pong.
    ///
    /// Past the threshold the connection is declared dead and the
    /// reconnect loop takes over.
    pub async fn on_pong_missed(self: &Arc<Self>) {
        let missed = {
            let mut count = self.missed_pongs.lock().await;
            *count += 1;
            *count
        };

        warn!(
            "missed pong #{missed}/{}",
            self.heartbeat_config.max_missed_pongs
        );

        if missed >= self.heartbeat_config.max_missed_pongs {
            error!("connection appears dead ({missed} missed pongs)");
            self.handle_connection_lost().await;
        }
    }

    /// React to a lost connection by spawning the reconnect loop.
    pub async fn handle_connection_lost(self: &Arc<Self>) {
        let current = self.state().await;
        if current == ConnectionState::Reconnecting || current == ConnectionState::Offline {
            debug!("already reconnecting or offline, skipping");
            return;
        }

        let manager = Arc::clone(self);
        let mut task = self.reconnect_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }
        *task = Some(tokio::spawn(async move {
            manager.reconnect_loop().await;
        }));
    }

    /// Calculate the delay before a reconnection attempt.
    ///
    /// Linear backoff: base * attempt, capped at max_delay. With the
    /// defaults that is 2s, 4s, 6s, 8s, 10s.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let scaled = self
            .reconnect_config
            .base_delay
            .saturating_mul(attempt.max(1));
        scaled.min(self.reconnect_config.max_delay)
    }

    /// Attempt reconnection with linear backoff.
    ///
    /// This loop runs until one of:
    /// - a connection is successfully re-established (budget resets)
    /// - the attempt budget is spent (enters persistent `Offline`)
    /// - an explicit disconnect is requested
    ///
    /// Once `Offline`, nothing further is scheduled; only an explicit
    /// `connect()` leaves that state.
    pub async fn reconnect_loop(self: &Arc<Self>) {
        self.set_state(ConnectionState::Reconnecting).await;

        loop {
            let attempt = {
                let mut attempts = self.reconnect_attempts.lock().await;
                *attempts += 1;
                *attempts
            };

            if attempt > self.reconnect_config.max_attempts {
                error!(
                    "reconnect budget spent ({} attempts), going offline",
                    self.reconnect_config.max_attempts
                );
                self.set_state(ConnectionState::Offline).await;
                return;
            }

            let delay = self.reconnect_delay(attempt);
            warn!(
                "reconnection attempt {}/{} in {:.1}s",
                attempt,
                self.reconnect_config.max_attempts,
                delay.as_secs_f64()
            );

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.disconnect_notify.notified() => {
                    info!("reconnection cancelled by disconnect request");
                    return;
                }
            }

            if self.state().await == ConnectionState::Disconnected {
                info!("reconnection aborted: channel was disconnected");
                return;
            }

            // connect() refuses to run while Reconnecting reads as active,
            // so drop back before the attempt.
            self.set_state(ConnectionState::Connecting).await;
            match self.try_connect_once().await {
                Ok(()) => {
                    info!("reconnected after {attempt} attempt(s)");
                    return;
                }
                Err(e) => {
                    error!("reconnection attempt {attempt} failed: {e}");
                    self.set_state(ConnectionState::Reconnecting).await;
                }
            }
        }
    }

    /// One connect attempt with a fresh ticket, no state gating.
    async fn try_connect_once(self: &Arc<Self>) -> BlResult<()> {
        let ticket = self
            .credentials
            .realtime_ticket()
            .await
            .map_err(|e| BlError::Channel(format!("ticket request failed: {e}")))?;
        let _ = ticket;

        self.set_state(ConnectionState::Connected).await;
        *self.reconnect_attempts.lock().await = 0;
        *self.missed_pongs.lock().await = 0;
        self.start_heartbeat().await;
        Ok(())
    }
}

//! In-memory booking cache.
//!
//! The cache is a projection of the server's records, never an independent
//! source of truth. All mutation funnels through three paths, each of
//! which runs the state machine and emits a `BookingChanged` event:
//!
//! - [`BookingCache::adopt`] replaces a record with a server-confirmed
//!   snapshot after a successful API call
//! - [`BookingCache::apply_trigger`] applies a local trigger to the
//!   cached record (used for side effects the client resolves itself)
//! - [`BookingCache::apply_remote`] runs a realtime snapshot through the
//!   stale/legal-edge checks before adopting it

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use bl_core::error::{BlError, BlResult};
use bl_models::{Applied, BookingRecord, BookingStateMachine, TransitionPolicy, Trigger};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// Cache of booking records keyed by id.
pub struct BookingCache {
    state: ServiceState,
    records: Arc<Mutex<HashMap<String, BookingRecord>>>,
    policy: TransitionPolicy,
    event_bus: EventBus,
}

impl BookingCache {
    /// Create a new BookingCache.
    pub fn new(policy: TransitionPolicy, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            records: Arc::new(Mutex::new(HashMap::new())),
            policy,
            event_bus,
        }
    }

    /// The policy the cache validates triggers against.
    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// Get a copy of a cached record.
    pub async fn get(&self, booking_id: &str) -> Option<BookingRecord> {
        self.records.lock().await.get(booking_id).cloned()
    }

    /// Get copies of all cached records.
    pub async fn list(&self) -> Vec<BookingRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Number of cached records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Adopt a server-confirmed snapshot.
    ///
    /// Used after every successful mutating API call and for records seen
    /// for the first time. Duplicate snapshots (same id and version as the
    /// cached record) are a no-op so redeliveries do not re-emit events.
    pub async fn adopt(&self, record: BookingRecord) {
        let mut records = self.records.lock().await;
        if let Some(existing) = records.get(&record.id) {
            if existing.version == record.version && existing.status == record.status {
                debug!(booking_id = %record.id, "duplicate snapshot ignored");
                return;
            }
        }
        self.event_bus.emit(AppEvent::BookingChanged {
            booking_id: record.id.clone(),
            status: record.status,
            version: record.version,
        });
        records.insert(record.id.clone(), record);
    }

    /// Check a trigger against the cached record without mutating it.
    ///
    /// Lets callers refuse an illegal action before spending a network
    /// round-trip on it.
    pub async fn validate(&self, booking_id: &str, trigger: &Trigger) -> BlResult<()> {
        let records = self.records.lock().await;
        let record = records
            .get(booking_id)
            .ok_or_else(|| BlError::BookingNotFound(booking_id.to_string()))?;
        let mut probe = record.clone();
        BookingStateMachine::apply(&mut probe, trigger, &self.policy)?;
        Ok(())
    }

    /// Apply a local trigger to the cached record.
    pub async fn apply_trigger(
        &self,
        booking_id: &str,
        trigger: &Trigger,
    ) -> BlResult<BookingRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(booking_id)
            .ok_or_else(|| BlError::BookingNotFound(booking_id.to_string()))?;
        BookingStateMachine::apply(record, trigger, &self.policy)?;
        self.event_bus.emit(AppEvent::BookingChanged {
            booking_id: record.id.clone(),
            status: record.status,
            version: record.version,
        });
        Ok(record.clone())
    }

    /// Apply a realtime snapshot.
    ///
    /// Returns [`Applied::Stale`] for old versions (normal operation, no
    /// event emitted). A snapshot for an unknown booking fails with
    /// [`BlError::BookingNotFound`] so the router can fetch it instead.
    pub async fn apply_remote(&self, incoming: BookingRecord) -> BlResult<Applied> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&incoming.id)
            .ok_or_else(|| BlError::BookingNotFound(incoming.id.clone()))?;

        let applied = BookingStateMachine::apply_remote(record, incoming)?;
        if applied == Applied::Updated {
            self.event_bus.emit(AppEvent::BookingChanged {
                booking_id: record.id.clone(),
                status: record.status,
                version: record.version,
            });
        }
        Ok(applied)
    }

    /// Drop a record from the cache.
    pub async fn evict(&self, booking_id: &str) -> bool {
        let removed = self.records.lock().await.remove(booking_id).is_some();
        if removed {
            warn!("evicted booking {booking_id} from cache");
        }
        removed
    }

    /// Clear all cached records.
    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}

impl Service for BookingCache {
    fn name(&self) -> &str {
        "booking_cache"
    }
    fn state(&self) -> ServiceState {
        self.state
    }
    fn init(&mut self) -> BlResult<()> {
        self.state = ServiceState::Running;
        Ok(())
    }
    fn shutdown(&mut self) -> BlResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_models::{BookingStatus, DeliveryMode, ServiceDescriptor};
    use chrono::Utc;

    fn record(id: &str) -> BookingRecord {
        BookingRecord::new_request(
            id,
            "seeker-1",
            "provider-1",
            ServiceDescriptor { name: "Garden tidy".into(), category: None },
            Utc::now(),
            2,
            DeliveryMode::InPerson { location: "4 Vine St".into() },
            3000,
        )
    }

    fn cache() -> (BookingCache, tokio::sync::broadcast::Receiver<AppEvent>) {
        let bus = EventBus::new(32);
        let rx = bus.subscribe();
        (BookingCache::new(TransitionPolicy::default(), bus), rx)
    }

    #[tokio::test]
    async fn test_adopt_and_get() {
        let (cache, mut rx) = cache();
        cache.adopt(record("bk-1")).await;

        assert_eq!(cache.get("bk-1").await.unwrap().status, BookingStatus::Requested);
        assert!(matches!(
            rx.recv().await.unwrap(),
            AppEvent::BookingChanged { version: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_adopt_emits_once() {
        let (cache, mut rx) = cache();
        cache.adopt(record("bk-1")).await;
        cache.adopt(record("bk-1")).await;

        let _ = rx.recv().await.unwrap();
        let second =
            tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_apply_trigger_mutates_and_emits() {
        let (cache, mut rx) = cache();
        cache.adopt(record("bk-1")).await;
        let _ = rx.recv().await.unwrap();

        let updated = cache
            .apply_trigger("bk-1", &Trigger::Accept { amount: None })
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Confirmed);
        assert_eq!(updated.version, 2);

        match rx.recv().await.unwrap() {
            AppEvent::BookingChanged { status, version, .. } => {
                assert_eq!(status, BookingStatus::Confirmed);
                assert_eq!(version, 2);
            }
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_apply_trigger_unknown_booking() {
        let (cache, _rx) = cache();
        let err = cache
            .apply_trigger("bk-missing", &Trigger::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, BlError::BookingNotFound(_)));
    }

    #[tokio::test]
    async fn test_validate_does_not_mutate() {
        let (cache, _rx) = cache();
        cache.adopt(record("bk-1")).await;

        cache
            .validate("bk-1", &Trigger::Accept { amount: None })
            .await
            .unwrap();
        assert_eq!(cache.get("bk-1").await.unwrap().version, 1);

        assert!(cache.validate("bk-1", &Trigger::Start).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_remote_stale_and_fresh() {
        let (cache, mut rx) = cache();
        cache.adopt(record("bk-1")).await;
        let _ = rx.recv().await.unwrap();

        // Stale: same version
        let stale = record("bk-1");
        assert_eq!(cache.apply_remote(stale).await.unwrap(), Applied::Stale);

        // Fresh: newer version, legal edge
        let mut fresh = record("bk-1");
        fresh.status = BookingStatus::Confirmed;
        fresh.version = 2;
        assert_eq!(cache.apply_remote(fresh).await.unwrap(), Applied::Updated);

        match rx.recv().await.unwrap() {
            AppEvent::BookingChanged { version, .. } => assert_eq!(version, 2),
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_apply_remote_unknown_booking_asks_for_fetch() {
        let (cache, _rx) = cache();
        let err = cache.apply_remote(record("bk-new")).await.unwrap_err();
        assert!(matches!(err, BlError::BookingNotFound(_)));
    }

    #[tokio::test]
    async fn test_evict_and_clear() {
        let (cache, _rx) = cache();
        cache.adopt(record("bk-1")).await;
        cache.adopt(record("bk-2")).await;
        assert_eq!(cache.len().await, 2);

        assert!(cache.evict("bk-1").await);
        assert!(!cache.evict("bk-1").await);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}

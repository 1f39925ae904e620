//! OTP gate for starting service delivery.
//!
//! The seeker receives a one-time code out-of-band; the provider enters
//! it to prove the parties actually met. The client forwards the entry
//! verbatim and never learns the expected code. A bounded per-booking
//! attempt budget stops brute-force entry; only authoritative mismatch
//! verdicts consume it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use bl_api::BookingApi;
use bl_core::error::{BlError, BlResult};
use bl_models::{BookingRecord, Trigger};

use crate::cache::BookingCache;
use crate::inflight::InFlightSet;
use crate::service::{Service, ServiceState};

/// Gates the Confirmed -> InProgress transition behind the OTP check.
pub struct OtpGate {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    in_flight: InFlightSet,
    /// Mismatches per booking since the last success.
    attempts: Mutex<HashMap<String, u32>>,
    max_attempts: u32,
}

impl OtpGate {
    /// Create a new OtpGate.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>, max_attempts: u32) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            in_flight: InFlightSet::new(),
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
        }
    }

    /// Record that the authority issued a challenge for the booking.
    ///
    /// At most one challenge may be outstanding; the guard refuses a
    /// second issue.
    pub async fn challenge_issued(&self, booking_id: &str) -> BlResult<BookingRecord> {
        self.cache
            .apply_trigger(booking_id, &Trigger::OtpChallengeIssued)
            .await
            .map_err(Into::into)
    }

    /// Forward the provider's code entry to the authority.
    ///
    /// Success adopts the server's InProgress record and clears the
    /// attempt count. A mismatch verdict consumes one attempt; transport
    /// failures do not.
    pub async fn submit(&self, booking_id: &str, code: &str) -> BlResult<BookingRecord> {
        {
            let attempts = self.attempts.lock().await;
            if attempts.get(booking_id).copied().unwrap_or(0) >= self.max_attempts {
                return Err(BlError::OtpAttemptsExhausted(booking_id.to_string()));
            }
        }
        self.cache.validate(booking_id, &Trigger::Start).await?;

        let _guard = self.in_flight.begin(booking_id)?;
        match self.api.start_booking(booking_id, code).await {
            Ok(record) => {
                self.attempts.lock().await.remove(booking_id);
                self.cache.adopt(record.clone()).await;
                info!(booking_id, "otp accepted, service started");
                Ok(record)
            }
            Err(BlError::OtpMismatch(id)) => {
                let mut attempts = self.attempts.lock().await;
                let used = attempts.entry(booking_id.to_string()).or_insert(0);
                *used += 1;
                warn!(booking_id, "otp mismatch ({used}/{})", self.max_attempts);
                if *used >= self.max_attempts {
                    Err(BlError::OtpAttemptsExhausted(id))
                } else {
                    Err(BlError::OtpMismatch(id))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Attempts consumed for the booking since the last success.
    pub async fn attempts_used(&self, booking_id: &str) -> u32 {
        self.attempts
            .lock()
            .await
            .get(booking_id)
            .copied()
            .unwrap_or(0)
    }
}

impl Service for OtpGate {
    fn name(&self) -> &str {
        "otp_gate"
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
    use crate::event_bus::EventBus;
    use crate::testing::{sample_record, MockApi};
    use bl_models::{BookingStatus, TransitionPolicy};

    async fn setup(id: &str) -> (Arc<BookingCache>, Arc<MockApi>, OtpGate) {
        let bus = EventBus::new(32);
        let cache = Arc::new(BookingCache::new(TransitionPolicy::default(), bus.clone()));
        let api = Arc::new(MockApi::new());
        let mut record = sample_record(id);
        // Confirmed booking awaiting the otp gate
        bl_models::BookingStateMachine::apply(
            &mut record,
            &Trigger::Accept { amount: None },
            &TransitionPolicy::default(),
        )
        .unwrap();
        api.seed(record.clone());
        cache.adopt(record).await;
        let gate = OtpGate::new(Arc::clone(&cache), Arc::clone(&api) as Arc<dyn BookingApi>, 3);
        (cache, api, gate)
    }

    #[tokio::test]
    async fn test_correct_code_starts_service() {
        let (cache, api, gate) = setup("bk-1").await;
        api.expect_otp("bk-1", "4821");

        let record = gate.submit("bk-1", "4821").await.unwrap();
        assert_eq!(record.status, BookingStatus::InProgress);
        assert_eq!(cache.get("bk-1").await.unwrap().status, BookingStatus::InProgress);
        assert_eq!(gate.attempts_used("bk-1").await, 0);
    }

    #[tokio::test]
    async fn test_mismatch_consumes_attempt() {
        let (_cache, api, gate) = setup("bk-1").await;
        api.expect_otp("bk-1", "4821");

        let err = gate.submit("bk-1", "0000").await.unwrap_err();
        assert!(matches!(err, BlError::OtpMismatch(_)));
        assert_eq!(gate.attempts_used("bk-1").await, 1);

        // Correct entry still goes through and resets the count.
        gate.submit("bk-1", "4821").await.unwrap();
        assert_eq!(gate.attempts_used("bk-1").await, 0);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_blocks_without_network() {
        let (_cache, api, gate) = setup("bk-1").await;
        api.expect_otp("bk-1", "4821");

        for _ in 0..2 {
            assert!(matches!(
                gate.submit("bk-1", "9999").await.unwrap_err(),
                BlError::OtpMismatch(_)
            ));
        }
        assert!(matches!(
            gate.submit("bk-1", "9999").await.unwrap_err(),
            BlError::OtpAttemptsExhausted(_)
        ));
        assert_eq!(api.calls("start_booking"), 3);

        // Budget spent: even the right code is refused locally.
        assert!(matches!(
            gate.submit("bk-1", "4821").await.unwrap_err(),
            BlError::OtpAttemptsExhausted(_)
        ));
        assert_eq!(api.calls("start_booking"), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_spares_budget() {
        let (_cache, api, gate) = setup("bk-1").await;
        api.queue_error("start_booking", BlError::Transport("reset".into()));

        assert!(gate.submit("bk-1", "4821").await.is_err());
        assert_eq!(gate.attempts_used("bk-1").await, 0);
    }

    #[tokio::test]
    async fn test_single_outstanding_challenge() {
        let (_cache, _api, gate) = setup("bk-1").await;
        gate.challenge_issued("bk-1").await.unwrap();
        assert!(gate.challenge_issued("bk-1").await.is_err());
    }

    #[tokio::test]
    async fn test_gate_only_applies_to_confirmed() {
        let bus = EventBus::new(16);
        let cache = Arc::new(BookingCache::new(TransitionPolicy::default(), bus));
        let api = Arc::new(MockApi::new());
        api.seed(sample_record("bk-raw"));
        cache.adopt(sample_record("bk-raw")).await;
        let gate = OtpGate::new(Arc::clone(&cache), Arc::clone(&api) as Arc<dyn BookingApi>, 3);

        // Still Requested: refused locally, no network call.
        assert!(gate.submit("bk-raw", "1234").await.is_err());
        assert_eq!(api.calls("start_booking"), 0);
    }
}

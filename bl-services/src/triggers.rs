//! User-facing booking triggers.
//!
//! Each trigger follows the same shape: refuse illegal actions locally
//! (zero network cost), claim the per-booking in-flight guard, call the
//! API, and adopt the server-confirmed record into the cache. While
//! offline, triggers are captured as intents and replayed on reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use bl_api::{BookingApi, CreateBookingRequest, StatusAction};
use bl_core::error::{BlError, BlResult};
use bl_models::{BookingRecord, Trigger};

use crate::cache::BookingCache;
use crate::event_bus::{AppEvent, EventBus};
use crate::inflight::InFlightSet;
use crate::intents::{BookingIntent, IntentQueue};
use crate::service::{Service, ServiceState};

/// How a trigger resolved.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// The API confirmed the action; the cache holds the new record.
    Applied(BookingRecord),
    /// Offline: the action was captured for replay.
    Queued,
}

/// Accept / reject / cancel / booking-creation entry points.
pub struct TriggerService {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    event_bus: EventBus,
    in_flight: InFlightSet,
    intents: IntentQueue,
    online: Arc<AtomicBool>,
}

impl TriggerService {
    /// Create a new TriggerService. Starts online.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            event_bus,
            in_flight: InFlightSet::new(),
            intents: IntentQueue::new(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flip the connectivity flag. Set by the session service from
    /// channel state changes.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Whether triggers currently go to the network.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// The intent queue (exposed for the session service and tests).
    pub fn intents(&self) -> &IntentQueue {
        &self.intents
    }

    /// Create a new booking request.
    ///
    /// Creation is not captured as an intent: there is no cached record
    /// to validate against and no id to key a replay on.
    pub async fn create(&self, req: &CreateBookingRequest) -> BlResult<BookingRecord> {
        if !self.is_online() {
            return Err(BlError::ChannelOffline);
        }
        let record = self.api.create_booking(req).await?;
        info!(booking_id = %record.id, "booking created");
        self.cache.adopt(record.clone()).await;
        Ok(record)
    }

    /// Provider accepts a request, optionally overriding the amount.
    pub async fn accept(&self, booking_id: &str, amount: Option<i64>) -> BlResult<TriggerOutcome> {
        self.cache.validate(booking_id, &Trigger::Accept { amount }).await?;
        if !self.is_online() {
            return self
                .capture(BookingIntent::Accept { booking_id: booking_id.into(), amount })
                .await;
        }

        let _guard = self.in_flight.begin(booking_id)?;
        let record = self
            .api
            .update_status(booking_id, &StatusAction::Accept { amount })
            .await?;
        self.cache.adopt(record.clone()).await;
        Ok(TriggerOutcome::Applied(record))
    }

    /// Provider rejects a request.
    pub async fn reject(&self, booking_id: &str) -> BlResult<TriggerOutcome> {
        self.cache.validate(booking_id, &Trigger::Reject).await?;
        if !self.is_online() {
            return self.capture(BookingIntent::Reject { booking_id: booking_id.into() }).await;
        }

        let _guard = self.in_flight.begin(booking_id)?;
        let record = self.api.update_status(booking_id, &StatusAction::Reject).await?;
        self.cache.adopt(record.clone()).await;
        Ok(TriggerOutcome::Applied(record))
    }

    /// Either actor cancels, with a reason.
    pub async fn cancel(&self, booking_id: &str, reason: &str) -> BlResult<TriggerOutcome> {
        self.cache
            .validate(booking_id, &Trigger::Cancel { reason: reason.into() })
            .await?;
        if !self.is_online() {
            return self
                .capture(BookingIntent::Cancel {
                    booking_id: booking_id.into(),
                    reason: reason.into(),
                })
                .await;
        }

        let _guard = self.in_flight.begin(booking_id)?;
        let record = self
            .api
            .update_status(booking_id, &StatusAction::Cancel { reason: reason.into() })
            .await?;
        self.cache.adopt(record.clone()).await;
        Ok(TriggerOutcome::Applied(record))
    }

    /// Capture an intent and emit the matching event.
    async fn capture(&self, intent: BookingIntent) -> BlResult<TriggerOutcome> {
        self.event_bus.emit(AppEvent::IntentQueued {
            booking_id: intent.booking_id().to_string(),
            action: intent.label().to_string(),
        });
        self.intents.push(intent).await;
        Ok(TriggerOutcome::Queued)
    }

    /// Replay captured intents after connectivity returns.
    ///
    /// Every intent re-runs its guards against the current cached state:
    /// an intent that no longer applies (the booking moved on while we
    /// were offline) is dropped with an `IntentDropped` event. A transport
    /// failure stops the replay and re-queues the remainder in order.
    pub async fn replay_intents(&self) -> BlResult<usize> {
        let pending = self.intents.drain().await;
        if pending.is_empty() {
            return Ok(0);
        }
        info!("replaying {} captured intent(s)", pending.len());

        let mut replayed = 0;
        let mut remainder = pending.into_iter();
        while let Some(intent) = remainder.next() {
            let result = match &intent {
                BookingIntent::Accept { booking_id, amount } => {
                    self.accept(booking_id, *amount).await
                }
                BookingIntent::Reject { booking_id } => self.reject(booking_id).await,
                BookingIntent::Cancel { booking_id, reason } => {
                    self.cancel(booking_id, reason).await
                }
                BookingIntent::Refer { booking_id, .. }
                | BookingIntent::SubmitAttendance { booking_id, .. } => {
                    // Captured on behalf of the referral/attendance
                    // services; replayed here to keep the queue ordered.
                    self.replay_foreign(&intent, booking_id).await
                }
            };

            match result {
                Ok(_) => {
                    replayed += 1;
                    self.event_bus.emit(AppEvent::IntentReplayed {
                        booking_id: intent.booking_id().to_string(),
                        action: intent.label().to_string(),
                    });
                }
                Err(e) if e.is_retryable() || matches!(e, BlError::ChannelOffline) => {
                    warn!("replay interrupted ({e}), re-queueing remainder");
                    self.intents.push(intent).await;
                    for rest in remainder {
                        self.intents.push(rest).await;
                    }
                    return Ok(replayed);
                }
                Err(e) => {
                    // Guard refusal: the world moved on. Drop it.
                    self.event_bus.emit(AppEvent::IntentDropped {
                        booking_id: intent.booking_id().to_string(),
                        action: intent.label().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(replayed)
    }

    /// Replay a referral or attendance intent through the API directly.
    async fn replay_foreign(
        &self,
        intent: &BookingIntent,
        booking_id: &str,
    ) -> BlResult<TriggerOutcome> {
        let _guard = self.in_flight.begin(booking_id)?;
        let record = match intent {
            BookingIntent::Refer { booking_id, to_provider, note } => {
                self.api
                    .refer_booking(booking_id, to_provider, note.as_deref())
                    .await?
            }
            BookingIntent::SubmitAttendance { booking_id, attended, note } => {
                self.api
                    .submit_attendance(booking_id, *attended, note.as_deref())
                    .await?
            }
            _ => return Err(BlError::Internal("not a foreign intent".into())),
        };
        self.cache.adopt(record.clone()).await;
        Ok(TriggerOutcome::Applied(record))
    }
}

impl Service for TriggerService {
    fn name(&self) -> &str {
        "triggers"
    }
    fn state(&self) -> ServiceState {
        self.state
    }
    fn init(&mut self) -> BlResult<()> {
        self.state = ServiceState::Running;
        info!("trigger service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> BlResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

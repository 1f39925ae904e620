//! Payment order resolution and verification.
//!
//! Orders are created lazily, exactly once per booking: concurrent
//! requests coalesce on the per-booking in-flight guard and an already
//! attached order ref is returned without a network call. Verification
//! is a single non-retried call; any failure parks the booking in an
//! ambiguous state that is never retried automatically, because the
//! payment may have been taken without confirmation reaching us.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, info};

use bl_api::{BookingApi, PaymentProof};
use bl_core::error::{BlError, BlResult};
use bl_models::Trigger;

use crate::cache::BookingCache;
use crate::event_bus::{AppEvent, EventBus};
use crate::inflight::InFlightSet;
use crate::service::{Service, ServiceState};

/// Proof of a verified payment, kept for display and export.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub booking_id: String,
    pub order_ref: String,
    pub amount: i64,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

/// Resolves payment orders and verification results for bookings.
pub struct PaymentOrderResolver {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    event_bus: EventBus,
    in_flight: InFlightSet,
    receipts: Mutex<HashMap<String, Receipt>>,
    /// Bookings whose verification ended ambiguous, with the reason.
    ambiguous: Mutex<HashMap<String, String>>,
}

impl PaymentOrderResolver {
    /// Create a new PaymentOrderResolver.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            event_bus,
            in_flight: InFlightSet::new(),
            receipts: Mutex::new(HashMap::new()),
            ambiguous: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure the booking has a payment order, creating one if needed.
    ///
    /// Idempotent: an already attached order ref is returned with zero
    /// network calls, and the in-flight guard collapses concurrent
    /// creation into a single API call.
    pub async fn ensure_order(&self, booking_id: &str) -> BlResult<String> {
        let record = self
            .cache
            .get(booking_id)
            .await
            .ok_or_else(|| BlError::BookingNotFound(booking_id.to_string()))?;
        if let Some(order_ref) = record.payment_order_ref {
            return Ok(order_ref);
        }

        let _guard = self.in_flight.begin(booking_id)?;
        // Re-check under the guard: a concurrent caller may have won.
        if let Some(record) = self.cache.get(booking_id).await {
            if let Some(order_ref) = record.payment_order_ref {
                return Ok(order_ref);
            }
        }

        let order_ref = self.api.create_payment_order(booking_id).await?;
        info!(booking_id, order_ref = %order_ref, "payment order created");
        self.cache
            .apply_trigger(
                booking_id,
                &Trigger::PaymentOrderAttached { order_ref: order_ref.clone() },
            )
            .await?;
        Ok(order_ref)
    }

    /// Verify a completed external payment.
    ///
    /// Exactly one non-retried call per attempt. On success the
    /// server-confirmed record is adopted and a receipt recorded. On any
    /// failure the booking enters the ambiguous state and stays there
    /// until [`Self::resolve_ambiguous`] clears it.
    pub async fn verify(&self, booking_id: &str, proof: &PaymentProof) -> BlResult<Receipt> {
        if let Some(reason) = self.ambiguous.lock().await.get(booking_id) {
            return Err(BlError::PaymentVerificationAmbiguous {
                booking_id: booking_id.to_string(),
                reason: reason.clone(),
            });
        }

        let record = self
            .cache
            .get(booking_id)
            .await
            .ok_or_else(|| BlError::BookingNotFound(booking_id.to_string()))?;
        let order_ref = record
            .payment_order_ref
            .clone()
            .ok_or_else(|| BlError::PaymentOrder("no payment order attached".into()))?;

        let _guard = self.in_flight.begin(booking_id)?;
        match self.api.verify_payment(booking_id, proof).await {
            Ok(confirmed) => {
                let receipt = Receipt {
                    booking_id: booking_id.to_string(),
                    order_ref: order_ref.clone(),
                    amount: confirmed.amount,
                    transaction_id: proof.transaction_id.clone(),
                    paid_at: Utc::now(),
                };
                self.cache.adopt(confirmed).await;
                self.receipts
                    .lock()
                    .await
                    .insert(booking_id.to_string(), receipt.clone());
                self.event_bus.emit(AppEvent::PaymentReceipt {
                    booking_id: booking_id.to_string(),
                    order_ref,
                    transaction_id: proof.transaction_id.clone(),
                });
                info!(booking_id, "payment verified");
                Ok(receipt)
            }
            Err(e) => {
                // The charge may have landed even though confirmation did
                // not. Park the booking; no automatic retry.
                let reason = e.to_string();
                error!(booking_id, "payment verification ambiguous: {reason}");
                self.ambiguous
                    .lock()
                    .await
                    .insert(booking_id.to_string(), reason.clone());
                self.event_bus.emit(AppEvent::PaymentAmbiguous {
                    booking_id: booking_id.to_string(),
                    reason: reason.clone(),
                });
                Err(BlError::PaymentVerificationAmbiguous {
                    booking_id: booking_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Whether the booking's payment is parked as ambiguous.
    pub async fn is_ambiguous(&self, booking_id: &str) -> bool {
        self.ambiguous.lock().await.contains_key(booking_id)
    }

    /// Clear the ambiguous state after out-of-band resolution.
    ///
    /// Called once support (or the seeker, after checking their statement)
    /// has established what actually happened.
    pub async fn resolve_ambiguous(&self, booking_id: &str) -> bool {
        let cleared = self.ambiguous.lock().await.remove(booking_id).is_some();
        if cleared {
            info!(booking_id, "ambiguous payment state cleared");
        }
        cleared
    }

    /// Look up the receipt for a verified booking.
    pub async fn receipt(&self, booking_id: &str) -> Option<Receipt> {
        self.receipts.lock().await.get(booking_id).cloned()
    }
}

impl Service for PaymentOrderResolver {
    fn name(&self) -> &str {
        "payment_resolver"
    }
    fn state(&self) -> ServiceState {
        self.state
    }
    fn init(&mut self) -> BlResult<()> {
        self.state = ServiceState::Running;
        info!("payment resolver initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> BlResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

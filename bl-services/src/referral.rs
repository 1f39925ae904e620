//! Referral coordination.
//!
//! A provider who cannot take an unaccepted request forwards it to a
//! colleague. The booking keeps its identity and appends to its referral
//! history; the target provider sees a regular incoming request. Guard
//! checks run client-side first, so a doomed referral costs zero network
//! calls.

use std::sync::Arc;

use tracing::info;

use bl_api::BookingApi;
use bl_core::error::{BlError, BlResult};
use bl_models::{BookingRecord, Trigger};

use crate::cache::BookingCache;
use crate::inflight::InFlightSet;
use crate::service::{Service, ServiceState};

/// Referral entry point.
pub struct ReferralCoordinator {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    in_flight: InFlightSet,
}

impl ReferralCoordinator {
    /// Create a new ReferralCoordinator.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            in_flight: InFlightSet::new(),
        }
    }

    /// Refer the booking to another provider.
    ///
    /// Refused locally (as [`BlError::ReferralRejected`], with no network
    /// call) when the target is the current provider, already appears in
    /// the referral history, or the chain cap is reached.
    pub async fn refer(
        &self,
        booking_id: &str,
        to_provider: &str,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        let trigger = Trigger::Refer {
            to_provider: to_provider.to_string(),
            note: note.map(String::from),
            amount: None,
        };
        if let Err(e) = self.cache.validate(booking_id, &trigger).await {
            return Err(match e {
                BlError::InvalidTransition(reason) => BlError::ReferralRejected(reason),
                other => other,
            });
        }

        let _guard = self.in_flight.begin(booking_id)?;
        let record = self.api.refer_booking(booking_id, to_provider, note).await?;
        info!(
            booking_id,
            to_provider,
            hops = record.referral_history.len(),
            "booking referred"
        );
        self.cache.adopt(record.clone()).await;
        Ok(record)
    }
}

impl Service for ReferralCoordinator {
    fn name(&self) -> &str {
        "referrals"
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

//! Attendance confirmation and completion.
//!
//! Each actor marks attendance once the service window passes. Agreement
//! on `attended = true` completes the booking; any disagreement (either
//! direction, including both-false) disputes it. A lone positive mark
//! completes the booking after the configured timeout; a lone denial
//! never does.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use bl_api::BookingApi;
use bl_core::error::{BlError, BlResult};
use bl_models::{Actor, BookingRecord, BookingStatus, Trigger};

use crate::cache::BookingCache;
use crate::inflight::InFlightSet;
use crate::service::{Service, ServiceState};

/// Attendance confirmation entry points.
pub struct AttendanceService {
    state: ServiceState,
    cache: Arc<BookingCache>,
    api: Arc<dyn BookingApi>,
    in_flight: InFlightSet,
}

impl AttendanceService {
    /// Create a new AttendanceService.
    pub fn new(cache: Arc<BookingCache>, api: Arc<dyn BookingApi>) -> Self {
        Self {
            state: ServiceState::Created,
            cache,
            api,
            in_flight: InFlightSet::new(),
        }
    }

    /// Submit this actor's attendance mark.
    ///
    /// The server decides the resulting status (still in progress,
    /// completed, or disputed) and its record is adopted verbatim.
    pub async fn submit(
        &self,
        booking_id: &str,
        actor: Actor,
        attended: bool,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        self.cache
            .validate(
                booking_id,
                &Trigger::ConfirmAttendance { actor, attended, note: note.map(String::from) },
            )
            .await?;

        let _guard = self.in_flight.begin(booking_id)?;
        let record = self.api.submit_attendance(booking_id, attended, note).await?;
        info!(
            booking_id,
            %actor,
            attended,
            status = %record.status,
            "attendance submitted"
        );
        self.cache.adopt(record.clone()).await;
        Ok(record)
    }

    /// Complete a booking whose lone positive mark has timed out.
    ///
    /// Applied locally: the timeout policy is evaluated client-side and
    /// the realtime channel reconciles if the server resolved it first.
    /// Returns `Ok(true)` if the booking completed, `Ok(false)` if the
    /// timeout has not elapsed or no lone positive mark exists.
    pub async fn check_auto_complete(
        &self,
        booking_id: &str,
        now: DateTime<Utc>,
    ) -> BlResult<bool> {
        match self
            .cache
            .apply_trigger(booking_id, &Trigger::AutoComplete { now })
            .await
        {
            Ok(record) => {
                info!(booking_id, "booking auto-completed after attendance timeout");
                Ok(record.status == BookingStatus::Completed)
            }
            Err(BlError::InvalidTransition(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run the auto-complete check over every cached in-progress booking.
    pub async fn sweep_auto_complete(&self, now: DateTime<Utc>) -> BlResult<usize> {
        let mut completed = 0;
        for record in self.cache.list().await {
            if record.status == BookingStatus::InProgress
                && self.check_auto_complete(&record.id, now).await?
            {
                completed += 1;
            }
        }
        Ok(completed)
    }
}

impl Service for AttendanceService {
    fn name(&self) -> &str {
        "attendance"
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

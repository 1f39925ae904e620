//! The `BookingApi` seam the service layer programs against.
//!
//! Services hold an `Arc<dyn BookingApi>` so the network can be mocked in
//! tests (notably for the "exactly one order-creation call" and "zero
//! network calls on client-side referral rejection" properties). The
//! production implementation lives in [`crate::endpoints`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bl_core::error::BlResult;
use bl_models::{BookingRecord, DeliveryMode, ServiceDescriptor};

/// Body of `POST /bookings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub provider_id: String,
    pub service: ServiceDescriptor,
    pub scheduled_at: DateTime<Utc>,
    pub duration_hours: u32,
    pub delivery: DeliveryMode,
    pub amount: i64,
}

/// Status change actions for `PUT /bookings/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusAction {
    Accept {
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    },
    Reject,
    Cancel { reason: String },
}

/// Proof posted to the verify endpoint after the external payment step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub transaction_id: String,
    pub signature: String,
}

/// Remote Booking API operations the service layer depends on.
///
/// Every method returns the server-confirmed record (or order reference),
/// which the caller then applies to the local cache. The server remains
/// the source of truth; the client never invents a resulting state.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// `POST /bookings`
    async fn create_booking(&self, req: &CreateBookingRequest) -> BlResult<BookingRecord>;

    /// `GET /bookings/{id}`
    async fn fetch_booking(&self, id: &str) -> BlResult<BookingRecord>;

    /// `PUT /bookings/{id}/status` — accept / reject / cancel.
    async fn update_status(&self, id: &str, action: &StatusAction) -> BlResult<BookingRecord>;

    /// `PUT /bookings/{id}/refer`
    async fn refer_booking(
        &self,
        id: &str,
        to_provider: &str,
        note: Option<&str>,
    ) -> BlResult<BookingRecord>;

    /// `POST /bookings/{id}/start` — forwards the OTP entry verbatim.
    async fn start_booking(&self, id: &str, otp_code: &str) -> BlResult<BookingRecord>;

    /// `POST /bookings/{id}/attendance`
    async fn submit_attendance(
        &self,
        id: &str,
        attended: bool,
        note: Option<&str>,
    ) -> BlResult<BookingRecord>;

    /// `POST /bookings/{id}/create-payment-order` — returns the order ref.
    async fn create_payment_order(&self, id: &str) -> BlResult<String>;

    /// `POST /bookings/{id}/payment/verify` — exactly once per attempt,
    /// never retried by the transport layer.
    async fn verify_payment(&self, id: &str, proof: &PaymentProof) -> BlResult<BookingRecord>;
}

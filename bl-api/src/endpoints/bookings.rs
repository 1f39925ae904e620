//! Booking lifecycle endpoints.

use bl_core::error::{BlError, BlResult};
use bl_models::BookingRecord;

use crate::api::{CreateBookingRequest, StatusAction};
use crate::client::ApiClient;
use crate::response::ApiResponse;

/// Map a booking envelope to a record, translating the server's
/// machine-readable error codes into their client-side variants.
pub(crate) fn envelope_to_record(
    booking_id: &str,
    resp: ApiResponse<BookingRecord>,
) -> BlResult<BookingRecord> {
    if resp.is_success() {
        return resp
            .data
            .ok_or_else(|| BlError::Serialization("success envelope without booking data".into()));
    }

    let message = resp.error_message().unwrap_or_default();
    match resp.error_code() {
        Some("otp_mismatch") => Err(BlError::OtpMismatch(booking_id.to_string())),
        Some("invalid_transition") => Err(BlError::InvalidTransition(message)),
        Some("booking_not_found") => Err(BlError::BookingNotFound(booking_id.to_string())),
        _ => Err(BlError::ServerError { status: resp.status, message }),
    }
}

impl ApiClient {
    /// `POST /bookings` — submit a new request as the seeker.
    pub async fn create_booking_req(&self, req: &CreateBookingRequest) -> BlResult<BookingRecord> {
        let body = serde_json::to_value(req)?;
        let resp: ApiResponse<BookingRecord> = self.post_json("/bookings", &body).await?;
        envelope_to_record("new", resp)
    }

    /// `GET /bookings/{id}`
    pub async fn get_booking(&self, id: &str) -> BlResult<BookingRecord> {
        let resp: ApiResponse<BookingRecord> = self.get_json(&format!("/bookings/{id}")).await?;
        envelope_to_record(id, resp)
    }

    /// `GET /bookings` — all bookings visible to the authenticated actor.
    pub async fn list_bookings(&self) -> BlResult<Vec<BookingRecord>> {
        let resp: ApiResponse<Vec<BookingRecord>> = self.get_json("/bookings").await?;
        if resp.is_success() {
            Ok(resp.data.unwrap_or_default())
        } else {
            Err(BlError::ServerError {
                status: resp.status,
                message: resp.error_message().unwrap_or_default(),
            })
        }
    }

    /// `PUT /bookings/{id}/status` — accept, reject, or cancel.
    pub async fn put_booking_status(
        &self,
        id: &str,
        action: &StatusAction,
    ) -> BlResult<BookingRecord> {
        let body = serde_json::to_value(action)?;
        let resp: ApiResponse<BookingRecord> =
            self.put_json(&format!("/bookings/{id}/status"), &body).await?;
        envelope_to_record(id, resp)
    }

    /// `PUT /bookings/{id}/refer` — hand the request to another provider.
    pub async fn put_booking_referral(
        &self,
        id: &str,
        to_provider: &str,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        let body = serde_json::json!({ "toProvider": to_provider, "note": note });
        let resp: ApiResponse<BookingRecord> =
            self.put_json(&format!("/bookings/{id}/refer"), &body).await?;
        envelope_to_record(id, resp)
    }

    /// `POST /bookings/{id}/start` — forward the OTP entry to the
    /// authority. The code is never compared locally.
    pub async fn post_booking_start(&self, id: &str, otp_code: &str) -> BlResult<BookingRecord> {
        let body = serde_json::json!({ "otp": otp_code });
        let resp: ApiResponse<BookingRecord> =
            self.post_json(&format!("/bookings/{id}/start"), &body).await?;
        envelope_to_record(id, resp)
    }

    /// `POST /bookings/{id}/attendance`
    pub async fn post_booking_attendance(
        &self,
        id: &str,
        attended: bool,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        let body = serde_json::json!({ "attended": attended, "note": note });
        let resp: ApiResponse<BookingRecord> =
            self.post_json(&format!("/bookings/{id}/attendance"), &body).await?;
        envelope_to_record(id, resp)
    }
}

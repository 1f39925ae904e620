//! API endpoint implementations organized by category.
//!
//! Each module provides typed methods for a group of related server
//! endpoints; together they implement the [`crate::BookingApi`] trait for
//! [`crate::ApiClient`].

pub mod auth;
pub mod bookings;
pub mod payments;

use async_trait::async_trait;

use bl_core::error::BlResult;
use bl_models::BookingRecord;

use crate::api::{BookingApi, CreateBookingRequest, PaymentProof, StatusAction};
use crate::client::ApiClient;

#[async_trait]
impl BookingApi for ApiClient {
    async fn create_booking(&self, req: &CreateBookingRequest) -> BlResult<BookingRecord> {
        self.create_booking_req(req).await
    }

    async fn fetch_booking(&self, id: &str) -> BlResult<BookingRecord> {
        self.get_booking(id).await
    }

    async fn update_status(&self, id: &str, action: &StatusAction) -> BlResult<BookingRecord> {
        self.put_booking_status(id, action).await
    }

    async fn refer_booking(
        &self,
        id: &str,
        to_provider: &str,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        self.put_booking_referral(id, to_provider, note).await
    }

    async fn start_booking(&self, id: &str, otp_code: &str) -> BlResult<BookingRecord> {
        self.post_booking_start(id, otp_code).await
    }

    async fn submit_attendance(
        &self,
        id: &str,
        attended: bool,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        self.post_booking_attendance(id, attended, note).await
    }

    async fn create_payment_order(&self, id: &str) -> BlResult<String> {
        self.post_create_payment_order(id).await
    }

    async fn verify_payment(&self, id: &str, proof: &PaymentProof) -> BlResult<BookingRecord> {
        self.post_verify_payment(id, proof).await
    }
}

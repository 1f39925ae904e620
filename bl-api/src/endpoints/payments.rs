//! Payment order endpoints.
//!
//! Order creation goes through the normal retry path (creating the same
//! order twice is prevented server-side by idempotent order refs and
//! client-side by the resolver's in-flight guard). Verification does NOT:
//! it is posted exactly once per attempt via the no-retry path, and any
//! failure is surfaced as the ambiguous manual-resolution state by the
//! resolver.

use bl_core::error::{BlError, BlResult};
use bl_models::BookingRecord;

use crate::api::PaymentProof;
use crate::client::ApiClient;
use crate::response::ApiResponse;

use super::bookings::envelope_to_record;

impl ApiClient {
    /// `POST /bookings/{id}/create-payment-order` — returns the order ref.
    pub async fn post_create_payment_order(&self, id: &str) -> BlResult<String> {
        let resp: ApiResponse<serde_json::Value> = self
            .post_json(&format!("/bookings/{id}/create-payment-order"), &serde_json::json!({}))
            .await?;

        if !resp.is_success() {
            return Err(BlError::PaymentOrder(
                resp.error_message().unwrap_or_else(|| "order creation failed".into()),
            ));
        }

        resp.data
            .as_ref()
            .and_then(|d| d.get("orderRef"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| BlError::PaymentOrder("order envelope missing orderRef".into()))
    }

    /// `POST /bookings/{id}/payment/verify` — exactly one attempt.
    pub async fn post_verify_payment(
        &self,
        id: &str,
        proof: &PaymentProof,
    ) -> BlResult<BookingRecord> {
        let body = serde_json::to_value(proof)?;
        let response = self.post_once(&format!("/bookings/{id}/payment/verify"), &body).await?;
        let resp: ApiResponse<BookingRecord> = ApiClient::parse_response(response).await?;
        envelope_to_record(id, resp)
    }
}

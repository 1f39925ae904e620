//! Bookline API - HTTP client for the Booking REST API.
//!
//! This crate provides a typed HTTP client for the booking endpoints
//! (create/status/refer/start/attendance and the two payment calls).
//! It handles bearer-token authentication through the credential
//! provider, bounded request timeouts, and automatic retry with
//! exponential backoff for transport failures — with the one deliberate
//! exception of payment verification, which is never retried.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use api::{BookingApi, CreateBookingRequest, PaymentProof, StatusAction};
pub use client::{ApiClient, RetryConfig};
pub use response::ApiResponse;

//! Bookline Services - Business logic and service layer.
//!
//! This crate provides the service trait and all concrete service
//! implementations covering:
//! - Booking cache (authoritative local records, versioned transitions)
//! - Update routing (realtime frames into the cache, gap recovery)
//! - Triggers (client-validated actions, offline intent capture/replay)
//! - Payment order resolution (exactly-once orders, ambiguous parking)
//! - OTP gating (bounded attempt budget for session start)
//! - Attendance confirmation (two-party agreement, auto-complete sweep)
//! - Referrals (client-side guard checks before the network)
//! - Session orchestration (channel + router + connectivity mirroring)
//! - Event bus (typed intra-service communication)

pub mod attendance;
pub mod cache;
pub mod event_bus;
pub mod inflight;
pub mod intents;
pub mod otp;
pub mod payment;
pub mod referral;
pub mod router;
pub mod service;
pub mod session;
pub mod triggers;

/// Test doubles shared by unit and integration tests.
pub mod testing;

// Re-export key types
pub use attendance::AttendanceService;
pub use cache::BookingCache;
pub use event_bus::{event_label, AppEvent, EventBus};
pub use inflight::{InFlightGuard, InFlightSet};
pub use intents::{BookingIntent, IntentQueue};
pub use otp::OtpGate;
pub use payment::{PaymentOrderResolver, Receipt};
pub use referral::ReferralCoordinator;
pub use router::UpdateRouter;
pub use service::{Service, ServiceState};
pub use session::SessionService;
pub use triggers::{TriggerOutcome, TriggerService};

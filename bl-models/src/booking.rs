//! The booking record and its satellite types.
//!
//! Field names serialize in camelCase to match the server wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two actor roles able to mutate a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Seeker,
    Provider,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seeker => write!(f, "seeker"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Seeker submitted a request; awaiting the provider's decision.
    Requested,
    /// Accepted with a payment order attached; awaiting verification.
    PendingPayment,
    /// Provider accepted (and any required payment verified).
    Confirmed,
    /// Service started after the OTP gate.
    InProgress,
    /// Both sides (or one side plus the timeout policy) confirmed attendance. **Terminal.**
    Completed,
    /// Cancelled by either actor with a reason. **Terminal.**
    Cancelled,
    /// Rejected by the provider. **Terminal.**
    Rejected,
    /// Attendance confirmations disagree; resolved out-of-band.
    Disputed,
}

impl BookingStatus {
    /// Returns `true` if no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Disputed => "disputed",
        };
        write!(f, "{s}")
    }
}

/// What service is being booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// How the service is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The provider travels to (or hosts at) a physical location.
    InPerson { location: String },
    /// Remote delivery over a call.
    Virtual,
}

/// One actor's attendance confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub attended: bool,
    #[serde(default)]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// One hop of the referral chain. The history is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    pub from_provider: String,
    pub to_provider: String,
    #[serde(default)]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// OTP challenge state. At most one challenge is outstanding per booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OtpChallengeState {
    /// No challenge outstanding.
    #[default]
    None,
    /// A challenge was issued to the seeker and awaits the provider's entry.
    Outstanding { issued_at: DateTime<Utc> },
}

impl OtpChallengeState {
    /// Whether a challenge is currently outstanding.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Outstanding { .. })
    }
}

/// The booking entity shared by the seeker/provider pair.
///
/// The client cache holds a read-through, write-through projection of the
/// server's record; it is never an independent source of truth. All
/// mutation goes through [`crate::BookingStateMachine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: String,
    pub seeker_id: String,
    pub provider_id: String,
    pub service: ServiceDescriptor,
    pub scheduled_at: DateTime<Utc>,
    pub duration_hours: u32,
    pub delivery: DeliveryMode,
    /// Price in minor currency units. Fixed once `Confirmed`, except
    /// through an explicit refer-with-new-amount.
    pub amount: i64,
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_order_ref: Option<String>,
    #[serde(default)]
    pub otp_challenge: OtpChallengeState,
    #[serde(default)]
    pub seeker_attendance: Option<AttendanceMark>,
    #[serde(default)]
    pub provider_attendance: Option<AttendanceMark>,
    #[serde(default)]
    pub referral_history: Vec<ReferralEntry>,
    /// Monotonically increasing; +1 per successfully applied transition.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Create a fresh request, as the server would on `POST /bookings`.
    pub fn new_request(
        id: impl Into<String>,
        seeker_id: impl Into<String>,
        provider_id: impl Into<String>,
        service: ServiceDescriptor,
        scheduled_at: DateTime<Utc>,
        duration_hours: u32,
        delivery: DeliveryMode,
        amount: i64,
    ) -> Self {
        Self {
            id: id.into(),
            seeker_id: seeker_id.into(),
            provider_id: provider_id.into(),
            service,
            scheduled_at,
            duration_hours,
            delivery,
            amount,
            status: BookingStatus::Requested,
            payment_order_ref: None,
            otp_challenge: OtpChallengeState::None,
            seeker_attendance: None,
            provider_attendance: None,
            referral_history: Vec::new(),
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Whether the booking has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `provider_id` already appears as a referral target.
    pub fn was_referred_to(&self, provider_id: &str) -> bool {
        self.referral_history.iter().any(|e| e.to_provider == provider_id)
    }

    /// The attendance mark submitted by the given actor, if any.
    pub fn attendance_of(&self, actor: Actor) -> Option<&AttendanceMark> {
        match actor {
            Actor::Seeker => self.seeker_attendance.as_ref(),
            Actor::Provider => self.provider_attendance.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record() -> BookingRecord {
        BookingRecord::new_request(
            "bk-1",
            "seeker-1",
            "provider-1",
            ServiceDescriptor { name: "Math tutoring".into(), category: Some("tutoring".into()) },
            Utc::now(),
            2,
            DeliveryMode::Virtual,
            1500,
        )
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(!BookingStatus::Disputed.is_terminal());
        assert!(!BookingStatus::Requested.is_terminal());
    }

    #[test]
    fn test_new_request_defaults() {
        let record = sample_record();
        assert_eq!(record.status, BookingStatus::Requested);
        assert_eq!(record.version, 1);
        assert!(record.payment_order_ref.is_none());
        assert!(!record.otp_challenge.is_outstanding());
        assert!(record.referral_history.is_empty());
    }

    #[test]
    fn test_serde_wire_names() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("seekerId").is_some());
        assert!(json.get("paymentOrderRef").is_some());
        assert_eq!(json["status"], "requested");

        let back: BookingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_was_referred_to() {
        let mut record = sample_record();
        assert!(!record.was_referred_to("provider-2"));
        record.referral_history.push(ReferralEntry {
            from_provider: "provider-1".into(),
            to_provider: "provider-2".into(),
            note: None,
            at: Utc::now(),
        });
        assert!(record.was_referred_to("provider-2"));
    }
}

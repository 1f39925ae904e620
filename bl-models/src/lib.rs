//! Bookline Models - The booking data entity and its lifecycle state machine.
//!
//! This crate defines `BookingRecord` (the single entity both actors
//! mutate), its satellite types, and `BookingStateMachine`: the only code
//! permitted to move a record between statuses. Both the UI-triggered path
//! and the realtime inbound path converge here, which is what keeps the
//! lifecycle invariants intact under concurrent local and remote writers.

pub mod booking;
pub mod state_machine;

// Re-export key types
pub use booking::{
    Actor, AttendanceMark, BookingRecord, BookingStatus, DeliveryMode, OtpChallengeState,
    ReferralEntry, ServiceDescriptor,
};
pub use state_machine::{Applied, BookingStateMachine, InvalidTransition, TransitionPolicy, Trigger};

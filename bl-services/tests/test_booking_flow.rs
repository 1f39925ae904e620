//! End-to-end booking lifecycle integration tests.
//!
//! Drives the full service stack against a mock server that runs the
//! real state machine: request-mode acceptance, instant-mode payment,
//! OTP-gated start, attendance resolution, referrals, and disputes.

mod common;

use chrono::{Duration, Utc};

use bl_api::{CreateBookingRequest, PaymentProof};
use bl_core::error::BlError;
use bl_models::booking::{Actor, BookingStatus, DeliveryMode, ServiceDescriptor};
use bl_models::state_machine::TransitionPolicy;
use bl_services::event_bus::AppEvent;
use bl_services::testing::sample_record;
use bl_services::TriggerOutcome;

async fn seed(stack: &common::Stack, id: &str) {
    let record = sample_record(id);
    stack.api.seed(record.clone());
    stack.cache.adopt(record).await;
}

/// Accept, issue the OTP challenge, and start the booking.
async fn advance_to_in_progress(stack: &common::Stack, id: &str) {
    stack.triggers.accept(id, None).await.unwrap();
    stack.otp.challenge_issued(id).await.unwrap();
    stack.api.expect_otp(id, "4321");
    stack.otp.submit(id, "4321").await.unwrap();
}

// ---- Request mode: accept, start, attend ----

#[tokio::test]
async fn e2e_request_mode_lifecycle_completes() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;

    let outcome = stack.triggers.accept("bk-1", None).await.unwrap();
    match outcome {
        TriggerOutcome::Applied(record) => {
            // No payment order attached, so acceptance confirms directly.
            assert_eq!(record.status, BookingStatus::Confirmed);
            assert_eq!(record.version, 2);
        }
        TriggerOutcome::Queued => panic!("expected an applied trigger while online"),
    }

    stack.otp.challenge_issued("bk-1").await.unwrap();
    stack.api.expect_otp("bk-1", "9876");
    let started = stack.otp.submit("bk-1", "9876").await.unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);

    stack.api.act_as(Actor::Provider);
    let after_provider = stack
        .attendance
        .submit("bk-1", Actor::Provider, true, Some("all done"))
        .await
        .unwrap();
    assert_eq!(after_provider.status, BookingStatus::InProgress);

    stack.api.act_as(Actor::Seeker);
    let after_seeker = stack
        .attendance
        .submit("bk-1", Actor::Seeker, true, None)
        .await
        .unwrap();
    assert_eq!(after_seeker.status, BookingStatus::Completed);

    let cached = stack.cache.get("bk-1").await.unwrap();
    assert_eq!(cached.status, BookingStatus::Completed);
    assert!(cached.status.is_terminal());
}

#[tokio::test]
async fn e2e_accept_with_amount_override() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;

    let outcome = stack.triggers.accept("bk-1", Some(4500)).await.unwrap();
    let TriggerOutcome::Applied(record) = outcome else {
        panic!("expected an applied trigger");
    };
    assert_eq!(record.amount, 4500);
    assert_eq!(record.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn e2e_create_booking_enters_cache() {
    let stack = common::create_stack();

    let req = CreateBookingRequest {
        provider_id: "provider-1".to_string(),
        service: ServiceDescriptor {
            name: "Garden clearance".to_string(),
            category: Some("gardening".to_string()),
        },
        scheduled_at: Utc::now() + Duration::days(3),
        duration_hours: 4,
        delivery: DeliveryMode::InPerson { location: "12 Elm Rd".to_string() },
        amount: 8000,
    };
    let record = stack.triggers.create(&req).await.unwrap();

    assert_eq!(record.status, BookingStatus::Requested);
    assert_eq!(record.version, 1);
    let cached = stack.cache.get(&record.id).await.unwrap();
    assert_eq!(cached.provider_id, "provider-1");
}

// ---- Instant mode: order, accept, verify ----

#[tokio::test]
async fn e2e_instant_mode_payment_flow() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;
    let mut rx = stack.bus.subscribe();

    let order_ref = stack.payments.ensure_order("bk-1").await.unwrap();

    // Re-requesting the order must not hit the server again.
    let again = stack.payments.ensure_order("bk-1").await.unwrap();
    assert_eq!(again, order_ref);
    assert_eq!(stack.api.calls("create_payment_order"), 1);

    // With an order attached, acceptance routes through PendingPayment.
    let TriggerOutcome::Applied(accepted) = stack.triggers.accept("bk-1", None).await.unwrap()
    else {
        panic!("expected an applied trigger");
    };
    assert_eq!(accepted.status, BookingStatus::PendingPayment);

    let proof = PaymentProof {
        transaction_id: "txn-77".to_string(),
        signature: "sig".to_string(),
    };
    let receipt = stack.payments.verify("bk-1", &proof).await.unwrap();
    assert_eq!(receipt.order_ref, order_ref);
    assert_eq!(receipt.amount, 3000);
    assert_eq!(stack.api.calls("verify_payment"), 1);

    let cached = stack.cache.get("bk-1").await.unwrap();
    assert_eq!(cached.status, BookingStatus::Confirmed);

    let mut saw_receipt = false;
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::PaymentReceipt { booking_id, transaction_id, .. } = event {
            assert_eq!(booking_id, "bk-1");
            assert_eq!(transaction_id, "txn-77");
            saw_receipt = true;
        }
    }
    assert!(saw_receipt, "expected a PaymentReceipt event");
}

#[tokio::test]
async fn e2e_ambiguous_payment_parks_booking_until_resolved() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;
    stack.payments.ensure_order("bk-1").await.unwrap();
    stack.triggers.accept("bk-1", None).await.unwrap();

    let proof = PaymentProof {
        transaction_id: "txn-1".to_string(),
        signature: "sig".to_string(),
    };
    stack
        .api
        .queue_error("verify_payment", BlError::Timeout("verify timed out".into()));

    let err = stack.payments.verify("bk-1", &proof).await.unwrap_err();
    assert!(matches!(err, BlError::PaymentVerificationAmbiguous { .. }));
    assert!(stack.payments.is_ambiguous("bk-1").await);
    assert_eq!(stack.api.calls("verify_payment"), 1);

    // While parked, a retry never reaches the network.
    let err = stack.payments.verify("bk-1", &proof).await.unwrap_err();
    assert!(matches!(err, BlError::PaymentVerificationAmbiguous { .. }));
    assert_eq!(stack.api.calls("verify_payment"), 1);

    // Resolving out of band reopens verification.
    assert!(stack.payments.resolve_ambiguous("bk-1").await);
    let receipt = stack.payments.verify("bk-1", &proof).await.unwrap();
    assert_eq!(receipt.booking_id, "bk-1");
    assert_eq!(stack.cache.get("bk-1").await.unwrap().status, BookingStatus::Confirmed);
}

// ---- Referrals ----

#[tokio::test]
async fn e2e_referral_chain_and_loop_guard() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;

    let referred = stack.referrals.refer("bk-1", "provider-2", Some("fully booked")).await.unwrap();
    assert_eq!(referred.provider_id, "provider-2");
    assert_eq!(referred.status, BookingStatus::Requested);
    assert_eq!(referred.referral_history.len(), 1);

    stack.referrals.refer("bk-1", "provider-3", None).await.unwrap();

    // provider-2 already appears in the history: refused before the network.
    let calls_before = stack.api.calls("refer_booking");
    let err = stack.referrals.refer("bk-1", "provider-2", None).await.unwrap_err();
    assert!(matches!(err, BlError::ReferralRejected(_)));
    assert_eq!(stack.api.calls("refer_booking"), calls_before);

    // The referred booking still accepts normally for the new provider.
    let TriggerOutcome::Applied(record) = stack.triggers.accept("bk-1", None).await.unwrap()
    else {
        panic!("expected an applied trigger");
    };
    assert_eq!(record.status, BookingStatus::Confirmed);
    assert_eq!(record.provider_id, "provider-3");
}

#[tokio::test]
async fn e2e_referral_chain_cap_enforced_locally() {
    let policy = TransitionPolicy { referral_chain_cap: 2, ..TransitionPolicy::default() };
    let stack = common::create_stack_with_policy(policy);
    seed(&stack, "bk-1").await;

    stack.referrals.refer("bk-1", "provider-2", None).await.unwrap();
    stack.referrals.refer("bk-1", "provider-3", None).await.unwrap();

    let err = stack.referrals.refer("bk-1", "provider-4", None).await.unwrap_err();
    assert!(matches!(err, BlError::ReferralRejected(_)));
    assert_eq!(stack.api.calls("refer_booking"), 2);
}

// ---- Attendance outcomes ----

#[tokio::test]
async fn e2e_attendance_disagreement_opens_dispute() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;
    advance_to_in_progress(&stack, "bk-1").await;

    stack.api.act_as(Actor::Provider);
    stack.attendance.submit("bk-1", Actor::Provider, true, None).await.unwrap();

    stack.api.act_as(Actor::Seeker);
    let record = stack
        .attendance
        .submit("bk-1", Actor::Seeker, false, Some("nobody showed up"))
        .await
        .unwrap();

    assert_eq!(record.status, BookingStatus::Disputed);
    assert!(!record.status.is_terminal());
}

#[tokio::test]
async fn e2e_lone_positive_mark_auto_completes_after_timeout() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;
    advance_to_in_progress(&stack, "bk-1").await;

    stack.api.act_as(Actor::Provider);
    stack.attendance.submit("bk-1", Actor::Provider, true, None).await.unwrap();

    // Too early: nothing to do.
    let now = Utc::now() + Duration::hours(1);
    assert!(!stack.attendance.check_auto_complete("bk-1", now).await.unwrap());

    let later = Utc::now() + Duration::hours(25);
    assert!(stack.attendance.check_auto_complete("bk-1", later).await.unwrap());
    assert_eq!(stack.cache.get("bk-1").await.unwrap().status, BookingStatus::Completed);
}

#[tokio::test]
async fn e2e_sweep_completes_only_eligible_bookings() {
    let stack = common::create_stack();
    seed(&stack, "bk-1").await;
    seed(&stack, "bk-2").await;
    advance_to_in_progress(&stack, "bk-1").await;
    advance_to_in_progress(&stack, "bk-2").await;

    // bk-1 has a lone positive mark, bk-2 a lone denial.
    stack.api.act_as(Actor::Provider);
    stack.attendance.submit("bk-1", Actor::Provider, true, None).await.unwrap();
    stack.attendance.submit("bk-2", Actor::Provider, false, None).await.unwrap();

    let later = Utc::now() + Duration::hours(25);
    let completed = stack.attendance.sweep_auto_complete(later).await.unwrap();
    assert_eq!(completed, 1);
    assert_eq!(stack.cache.get("bk-1").await.unwrap().status, BookingStatus::Completed);
    assert_eq!(stack.cache.get("bk-2").await.unwrap().status, BookingStatus::InProgress);
}

//! Shared test utilities for integration tests.

use std::sync::Arc;

use bl_api::BookingApi;
use bl_models::state_machine::TransitionPolicy;
use bl_services::event_bus::EventBus;
use bl_services::testing::MockApi;
use bl_services::{
    AttendanceService, BookingCache, OtpGate, PaymentOrderResolver, ReferralCoordinator,
    TriggerService,
};

/// The full service stack wired against one [`MockApi`] server.
pub struct Stack {
    pub api: Arc<MockApi>,
    pub bus: EventBus,
    pub cache: Arc<BookingCache>,
    pub triggers: TriggerService,
    pub payments: PaymentOrderResolver,
    pub otp: OtpGate,
    pub attendance: AttendanceService,
    pub referrals: ReferralCoordinator,
}

/// Build a stack with the default transition policy.
pub fn create_stack() -> Stack {
    create_stack_with_policy(TransitionPolicy::default())
}

pub fn create_stack_with_policy(policy: TransitionPolicy) -> Stack {
    let bus = EventBus::new(64);
    let api = Arc::new(MockApi::new());
    let dyn_api: Arc<dyn BookingApi> = api.clone();
    let cache = Arc::new(BookingCache::new(policy, bus.clone()));

    Stack {
        triggers: TriggerService::new(Arc::clone(&cache), Arc::clone(&dyn_api), bus.clone()),
        payments: PaymentOrderResolver::new(Arc::clone(&cache), Arc::clone(&dyn_api), bus.clone()),
        otp: OtpGate::new(Arc::clone(&cache), Arc::clone(&dyn_api), 3),
        attendance: AttendanceService::new(Arc::clone(&cache), Arc::clone(&dyn_api)),
        referrals: ReferralCoordinator::new(Arc::clone(&cache), dyn_api),
        api,
        bus,
        cache,
    }
}

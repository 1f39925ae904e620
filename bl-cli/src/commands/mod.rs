//! CLI command implementations.

pub mod attend;
pub mod bookings;
pub mod payment;
pub mod start;
pub mod status;
pub mod watch;

use std::sync::Arc;

use bl_api::{ApiClient, BookingApi};
use bl_core::config::ConfigHandle;
use bl_core::error::{BlError, BlResult};
use bl_models::{BookingRecord, TransitionPolicy};
use bl_services::event_bus::EventBus;
use bl_services::{
    AttendanceService, BookingCache, OtpGate, PaymentOrderResolver, ReferralCoordinator,
    TriggerService,
};

use crate::credentials::StoredCredentials;

/// The service stack a command drives, wired against the live API.
pub struct CliStack {
    pub api: Arc<ApiClient>,
    pub bus: EventBus,
    pub cache: Arc<BookingCache>,
    pub triggers: TriggerService,
    pub payments: PaymentOrderResolver,
    pub otp: OtpGate,
    pub attendance: AttendanceService,
    pub referrals: ReferralCoordinator,
}

impl CliStack {
    /// Fetch the booking and adopt it so local guard checks see the
    /// current server state.
    pub async fn load_booking(&self, id: &str) -> BlResult<BookingRecord> {
        let record = self.api.fetch_booking(id).await?;
        self.cache.adopt(record.clone()).await;
        Ok(record)
    }
}

/// Helper to create an authenticated API client from config.
///
/// Also returns the credential provider so callers opening the realtime
/// channel can hand it to the channel manager.
pub async fn create_api_client(
    config: &ConfigHandle,
) -> BlResult<(Arc<ApiClient>, Arc<StoredCredentials>)> {
    let server_config = {
        let cfg = config.read().await;
        if !cfg.is_server_configured() {
            return Err(BlError::MissingConfig(
                "server.base_url and server.actor_id must be set".into(),
            ));
        }
        cfg.server.clone()
    };
    let credentials = Arc::new(StoredCredentials::load()?);
    let api = Arc::new(ApiClient::new(&server_config, credentials.clone())?);
    credentials.attach_api(Arc::clone(&api)).await;
    Ok((api, credentials))
}

/// Helper to build the full service stack from config.
pub async fn create_stack(config: &ConfigHandle) -> BlResult<CliStack> {
    let (api, _credentials) = create_api_client(config).await?;
    let (policy, otp_max_attempts) = {
        let cfg = config.read().await;
        (TransitionPolicy::from_config(&cfg.policy), cfg.policy.otp_max_attempts)
    };

    let bus = EventBus::new(64);
    let cache = Arc::new(BookingCache::new(policy, bus.clone()));
    let dyn_api: Arc<dyn BookingApi> = api.clone();

    Ok(CliStack {
        triggers: TriggerService::new(Arc::clone(&cache), Arc::clone(&dyn_api), bus.clone()),
        payments: PaymentOrderResolver::new(Arc::clone(&cache), Arc::clone(&dyn_api), bus.clone()),
        otp: OtpGate::new(Arc::clone(&cache), Arc::clone(&dyn_api), otp_max_attempts),
        attendance: AttendanceService::new(Arc::clone(&cache), Arc::clone(&dyn_api)),
        referrals: ReferralCoordinator::new(Arc::clone(&cache), dyn_api),
        api,
        bus,
        cache,
    })
}

/// Format a minor-unit amount as a decimal string (3000 -> "30.00").
pub fn format_amount(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, (amount % 100).abs())
}

/// Truncate a string to a maximum length, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        format!("{}...", &s[..max_len - 3])
    } else {
        s[..max_len].to_string()
    }
}

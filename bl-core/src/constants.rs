//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "Bookline";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST API version prefix.
pub const API_VERSION: &str = "v1";

/// Default API request timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Heartbeat interval for the realtime channel, in seconds.
///
/// Fixed at 30s so intermediary proxies do not reap an idle connection.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Default maximum realtime reconnect attempts before going offline.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base reconnect delay in seconds; attempt N waits base * N, capped.
pub const DEFAULT_RECONNECT_BASE_DELAY_SECS: u64 = 2;

/// Cap for the reconnect delay in seconds.
pub const DEFAULT_RECONNECT_MAX_DELAY_SECS: u64 = 30;

/// Default referral chain cap (bounds hot-potato forwarding).
pub const DEFAULT_REFERRAL_CHAIN_CAP: usize = 3;

/// Default one-sided attendance auto-completion timeout, in hours.
pub const DEFAULT_ATTENDANCE_TIMEOUT_HOURS: u32 = 24;

/// Default bounded OTP retry budget per booking.
pub const DEFAULT_OTP_MAX_ATTEMPTS: u32 = 5;

/// Rolling dedup history size for (booking id, version) pairs.
pub const MAX_DEDUP_HISTORY: usize = 100;

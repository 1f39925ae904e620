//! Global error types for the Bookline client.
//!
//! All error categories across the client are unified into a single
//! `BlError` enum with conversions from underlying library errors.
//!
//! Note that a stale realtime event is *not* an error: discarding an
//! event whose version is at or below the cached version is normal
//! operation and is reported as an outcome, not through this enum.

use thiserror::Error;

/// Convenience type alias for Results using BlError.
pub type BlResult<T> = Result<T, BlError>;

/// Unified error type covering all error categories in Bookline.
#[derive(Error, Debug)]
pub enum BlError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Network errors --
    /// HTTP request failed (connect or send). Recovered locally via backoff.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Server returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Authentication failed (bad or expired token/ticket).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Realtime channel error (connect, frame decode, send).
    #[error("channel error: {0}")]
    Channel(String),

    /// The realtime channel is offline after exhausting reconnect attempts.
    #[error("channel offline")]
    ChannelOffline,

    // -- Booking lifecycle errors --
    /// A trigger's guard was rejected; the record is untouched.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A booking id was not found in the local cache.
    #[error("booking not found: {0}")]
    BookingNotFound(String),

    /// A trigger for this booking is already in flight.
    #[error("operation already in flight for booking {0}")]
    InFlight(String),

    // -- Payment errors --
    /// Payment order creation failed. Safe to retry.
    #[error("payment order error: {0}")]
    PaymentOrder(String),

    /// Payment verification ended in an ambiguous state: the payment may
    /// have been taken but not confirmed. Never retried automatically;
    /// resolution requires a manual/support path.
    #[error("payment verification ambiguous for booking {booking_id}: {reason}")]
    PaymentVerificationAmbiguous {
        /// Booking whose payment is unresolved.
        booking_id: String,
        /// What went wrong (signature mismatch, transport failure).
        reason: String,
    },

    // -- OTP errors --
    /// The authority rejected the submitted one-time code.
    #[error("otp mismatch for booking {0}")]
    OtpMismatch(String),

    /// The bounded OTP retry budget has been spent.
    #[error("otp attempts exhausted for booking {0}")]
    OtpAttemptsExhausted(String),

    // -- Referral errors --
    /// Referral refused client-side, before any network call.
    #[error("referral rejected: {0}")]
    ReferralRejected(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BlError {
    /// Whether this error represents a transport-level failure that the
    /// retry/backoff machinery may recover from.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::ServerError { status: 502..=504, .. }
        )
    }
}

impl From<serde_json::Error> for BlError {
    fn from(e: serde_json::Error) -> Self {
        BlError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for BlError {
    fn from(e: toml::de::Error) -> Self {
        BlError::Config(e.to_string())
    }
}

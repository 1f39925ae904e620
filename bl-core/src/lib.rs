//! Bookline Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other Bookline crates:
//! - Application configuration (API URL, realtime settings, booking policy)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - The credential-provider seam (access tokens, realtime tickets)
//! - Platform path helpers and common constants

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use credentials::CredentialProvider;
pub use error::{BlError, BlResult};
pub use logging::init_logging;

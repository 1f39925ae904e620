//! Bookline Channel - realtime event streaming for the booking marketplace.
//!
//! This crate provides the realtime channel manager that handles:
//! - Booking snapshot, chat, and typing frames from the server
//! - Ticketed connects (fresh single-use ticket per attempt)
//! - Linear-backoff reconnection with a bounded attempt budget and a
//!   persistent offline state once it is spent
//! - Outbound heartbeat pings on a fixed interval
//! - Frame dispatching via tokio broadcast channels with
//!   (booking id, version) deduplication

pub mod dispatcher;
pub mod frames;
pub mod manager;

// Re-export key types
pub use dispatcher::{ConnectionState, EventDispatcher};
pub use frames::{ChatMessagePayload, InboundFrame, OutboundFrame, TypingPayload};
pub use manager::{ChannelManager, HeartbeatConfig, ReconnectConfig};

//! Signal transport layer.
//!
//! This module handles the only two points where the bridge touches the
//! outside world: the outbound signal call and the inbound text entry point.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   scheme://host?<json>   ┌─────────────────┐
//! │  Script bridge  │ ───────── signal ──────► │  Native host    │
//! │                 │                          │  (intercept)    │
//! │   Transport     │ ◄──── receive(json) ──── │                 │
//! └─────────────────┘                          └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `adapter` | Message encode/emit/decode |
//! | `signal` | Sink trait, channel sink, protocol prefix, interception |

// ============================================================================
// Submodules
// ============================================================================

/// Message encode/emit/decode.
pub mod adapter;

/// Outbound signal channel.
pub mod signal;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::Transport;
pub use signal::{ChannelSink, ProtocolConfig, SignalSink, intercept};

//! Error types for the WebView bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webview_bridge::{Bridge, Result};
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     let reply = bridge.call("getCity", serde_json::json!({})).await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Payload | [`Error::MalformedPayload`], [`Error::InvalidPayload`], [`Error::Json`] |
//! | Handler | [`Error::HandlerNotFound`], [`Error::InvalidHandlerName`], [`Error::DuplicateHandler`], [`Error::HandlerFault`] |
//! | Correlation | [`Error::Remote`], [`Error::RequestTimeout`], [`Error::BridgeUnavailable`] |
//! | Channel | [`Error::SignalClosed`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::CallbackId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the signal protocol (scheme/host) is unset, blank or
    /// malformed at send time, or when the bridge builder is incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Inbound text could not be decoded into a message.
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Description of the decode failure.
        message: String,
    },

    /// A typed capability received params or output of the wrong shape.
    #[error("Invalid payload for {handler}: {message}")]
    InvalidPayload {
        /// Capability the payload was addressed to.
        handler: String,
        /// Description of the type mismatch.
        message: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Handler Errors
    // ========================================================================
    /// No handler is registered under the requested name.
    #[error("Handler not found: {handler}")]
    HandlerNotFound {
        /// The missing handler name.
        handler: String,
    },

    /// Handler name rejected at registration.
    #[error("Invalid handler name: {name:?}")]
    InvalidHandlerName {
        /// The rejected name.
        name: String,
    },

    /// Handler already registered (strict registration only).
    #[error("Handler already registered: {handler}")]
    DuplicateHandler {
        /// The duplicate handler name.
        handler: String,
    },

    /// Handler failed while serving a request.
    #[error("Handler {handler} failed: {message}")]
    HandlerFault {
        /// The faulting handler.
        handler: String,
        /// Failure description.
        message: String,
    },

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// The remote side answered with a failure status.
    #[error("Remote error (status {status}): {message}")]
    Remote {
        /// Status code carried in the reply.
        status: String,
        /// Message carried in the reply.
        message: String,
    },

    /// No response arrived within the caller's deadline.
    #[error("Request {callback_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The abandoned correlation id.
        callback_id: CallbackId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The bridge is not usable yet, or has shut down.
    #[error("Bridge is unavailable")]
    BridgeUnavailable,

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// The outbound signal channel is gone.
    #[error("Signal channel closed")]
    SignalClosed,

    /// Pending callback dropped before completion.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    #[inline]
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Creates a handler not found error.
    #[inline]
    pub fn handler_not_found(handler: impl Into<String>) -> Self {
        Self::HandlerNotFound {
            handler: handler.into(),
        }
    }

    /// Creates an invalid handler name error.
    #[inline]
    pub fn invalid_handler_name(name: impl Into<String>) -> Self {
        Self::InvalidHandlerName { name: name.into() }
    }

    /// Creates a duplicate handler error.
    #[inline]
    pub fn duplicate_handler(handler: impl Into<String>) -> Self {
        Self::DuplicateHandler {
            handler: handler.into(),
        }
    }

    /// Creates a handler fault error.
    #[inline]
    pub fn handler_fault(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFault {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(callback_id: CallbackId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            callback_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns `true` if this is a handler error.
    #[inline]
    #[must_use]
    pub fn is_handler_error(&self) -> bool {
        matches!(
            self,
            Self::HandlerNotFound { .. }
                | Self::InvalidHandlerName { .. }
                | Self::DuplicateHandler { .. }
                | Self::HandlerFault { .. }
        )
    }

    /// Returns `true` if this error came from decoding a payload.
    #[inline]
    #[must_use]
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::InvalidPayload { .. } | Self::Json(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

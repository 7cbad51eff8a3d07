//! Outbound signal channel.
//!
//! The script side can only reach the host through one side-effecting call
//! that carries a single string (a `prompt()` in the stock page). The host
//! intercepts that call and recognizes bridge traffic by its
//! `scheme://host?` prefix.
//!
//! ```text
//! jsbridge://native?{"handlerName":"test","params":{},"callbackId":"cb_1_1700000000000"}
//! └──────── prefix ┘└──────────────────────── JSON envelope ──────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// SignalSink
// ============================================================================

/// Destination of outbound signals.
///
/// Implemented for [`ChannelSink`] and for any `Fn(String) -> Result<()>`.
pub trait SignalSink: Send + Sync {
    /// Emits one formatted signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be delivered.
    fn emit(&self, signal: String) -> Result<()>;
}

impl<F> SignalSink for F
where
    F: Fn(String) -> Result<()> + Send + Sync,
{
    #[inline]
    fn emit(&self, signal: String) -> Result<()> {
        self(signal)
    }
}

// ============================================================================
// ChannelSink
// ============================================================================

/// Sink that forwards signals into a tokio channel.
///
/// The receiving half plays the host: it reads each signal, runs it through
/// [`intercept`], and feeds the payload to the peer's inbound entry point.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Creates a sink and the receiver observing its signals.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalSink for ChannelSink {
    fn emit(&self, signal: String) -> Result<()> {
        self.tx.send(signal).map_err(|_| Error::SignalClosed)
    }
}

// ============================================================================
// ProtocolConfig
// ============================================================================

/// Scheme and host that prefix every outbound signal.
///
/// Both start empty and may be filled in by the host at any time; they are
/// validated on every send rather than at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Signal scheme, e.g. `jsbridge`.
    pub scheme: String,
    /// Signal host, e.g. `native`.
    pub host: String,
}

impl ProtocolConfig {
    /// Creates a protocol config.
    #[inline]
    #[must_use]
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Returns the `scheme://host?` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if scheme or host is blank, or if together
    /// they do not form a valid URL.
    pub fn prefix(&self) -> Result<String> {
        let scheme = self.scheme.trim();
        let host = self.host.trim();

        if scheme.is_empty() {
            return Err(Error::config("signal scheme must not be blank"));
        }
        if host.is_empty() {
            return Err(Error::config("signal host must not be blank"));
        }

        let base = format!("{scheme}://{host}");
        Url::parse(&base)
            .map_err(|e| Error::config(format!("invalid signal protocol {base:?}: {e}")))?;

        Ok(format!("{base}?"))
    }

    /// Returns `true` if both scheme and host are set.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.scheme.trim().is_empty() && !self.host.trim().is_empty()
    }
}

// ============================================================================
// Interception
// ============================================================================

/// Extracts the JSON payload from a bridge signal.
///
/// Returns `None` if the signal does not carry this protocol's prefix (or
/// the protocol is unset), meaning the host should treat it as an ordinary
/// prompt.
#[must_use]
pub fn intercept<'a>(signal: &'a str, protocol: &ProtocolConfig) -> Option<&'a str> {
    let prefix = protocol.prefix().ok()?;
    signal.strip_prefix(prefix.as_str())
}

// ============================================================================
// Tests
// ============================================================================

//! Transport adapter.
//!
//! Turns outbound messages into signals and inbound text into messages. The
//! protocol and debug flag live behind locks because the host may change
//! them after load; both are read again on every send.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{FieldNames, Message};

use super::signal::{ProtocolConfig, SignalSink};

// ============================================================================
// Transport
// ============================================================================

/// Encodes, emits and decodes bridge messages.
pub struct Transport {
    /// Outbound signal destination.
    sink: Arc<dyn SignalSink>,
    /// Signal prefix configuration.
    protocol: RwLock<ProtocolConfig>,
    /// Envelope key names.
    field_names: FieldNames,
    /// Logs traffic when set.
    debug: AtomicBool,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("protocol", &*self.protocol.read())
            .field("field_names", &self.field_names)
            .field("debug", &self.is_debug())
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Creates a transport.
    #[must_use]
    pub fn new(
        sink: Arc<dyn SignalSink>,
        protocol: ProtocolConfig,
        field_names: FieldNames,
        debug: bool,
    ) -> Self {
        Self {
            sink,
            protocol: RwLock::new(protocol),
            field_names,
            debug: AtomicBool::new(debug),
        }
    }

    /// Serializes `message` and emits it as `scheme://host?<json>`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if scheme or host is unset
    /// - [`Error::Json`](crate::Error::Json) if serialization fails
    /// - whatever the sink returns if delivery fails
    pub fn send(&self, message: &Message) -> Result<()> {
        let prefix = self.protocol.read().prefix()?;
        let json = message.encode(&self.field_names)?;
        let signal = format!("{prefix}{json}");

        if self.is_debug() {
            debug!(signal = %signal, "Emitting signal");
        }

        self.sink.emit(signal)
    }

    /// Parses inbound text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`](crate::Error::MalformedPayload)
    /// if the text is not a valid envelope.
    pub fn decode(&self, raw: &str) -> Result<Message> {
        if self.is_debug() {
            debug!(payload = %raw, "Received payload");
        }

        Message::decode(raw, &self.field_names)
    }

    /// Returns a snapshot of the protocol config.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> ProtocolConfig {
        self.protocol.read().clone()
    }

    /// Replaces the protocol config.
    #[inline]
    pub fn set_protocol(&self, protocol: ProtocolConfig) {
        *self.protocol.write() = protocol;
    }

    /// Returns the envelope key names.
    #[inline]
    #[must_use]
    pub fn field_names(&self) -> &FieldNames {
        &self.field_names
    }

    /// Returns `true` if traffic logging is on.
    #[inline]
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Toggles traffic logging.
    #[inline]
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }
}

// ============================================================================
// Tests
// ============================================================================

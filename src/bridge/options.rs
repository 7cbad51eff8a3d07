//! Bridge configuration options.
//!
//! # Example
//!
//! ```ignore
//! use webview_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::new()
//!     .with_protocol("jsbridge", "native")
//!     .with_debug(false);
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::FieldNames;
use crate::transport::ProtocolConfig;

// ============================================================================
// BridgeOptions
// ============================================================================

/// Bridge configuration.
///
/// Protocol and debug flag can still be changed after the bridge is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Signal scheme and host.
    pub protocol: ProtocolConfig,

    /// Logs protocol traffic when set.
    pub debug: bool,

    /// Envelope key names.
    pub field_names: FieldNames,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            debug: true,
            field_names: FieldNames::default(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with no protocol set and debug on.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the signal scheme and host.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        self.protocol = ProtocolConfig::new(scheme, host);
        self
    }

    /// Sets the signal scheme.
    #[inline]
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.protocol.scheme = scheme.into();
        self
    }

    /// Sets the signal host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.protocol.host = host.into();
        self
    }

    /// Sets traffic logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the envelope key names.
    #[inline]
    #[must_use]
    pub fn with_field_names(mut self, field_names: FieldNames) -> Self {
        self.field_names = field_names;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Builder pattern for bridge configuration.
//!
//! Provides a fluent API for configuring and creating [`Bridge`] instances.
//!
//! # Example
//!
//! ```ignore
//! use webview_bridge::{Bridge, ChannelSink};
//!
//! # async fn example() -> webview_bridge::Result<()> {
//! let (sink, signals) = ChannelSink::new();
//! let bridge = Bridge::builder()
//!     .protocol("jsbridge", "native")
//!     .sink(sink)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::protocol::FieldNames;
use crate::transport::{ProtocolConfig, SignalSink};

use super::core::Bridge;
use super::options::BridgeOptions;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BridgeBuilder {
    /// Protocol, debug flag and field names.
    options: BridgeOptions,
    /// Outbound signal destination.
    sink: Option<Arc<dyn SignalSink>>,
    /// Whether requests may be sent right away.
    usable: bool,
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("options", &self.options)
            .field("sink", &self.sink.is_some())
            .field("usable", &self.usable)
            .finish()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a new builder with default options and no sink.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal scheme.
    #[inline]
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.options.protocol.scheme = scheme.into();
        self
    }

    /// Sets the signal host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.protocol.host = host.into();
        self
    }

    /// Sets scheme and host together.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        self.options.protocol = ProtocolConfig::new(scheme, host);
        self
    }

    /// Sets traffic logging.
    #[inline]
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// Sets the envelope key names.
    #[inline]
    #[must_use]
    pub fn field_names(mut self, field_names: FieldNames) -> Self {
        self.options.field_names = field_names;
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the outbound signal sink.
    #[inline]
    #[must_use]
    pub fn sink(mut self, sink: impl SignalSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Marks the bridge usable on build.
    ///
    /// Leave unset when an initializer will call
    /// [`Bridge::mark_usable`] after registering handlers.
    #[inline]
    #[must_use]
    pub fn usable(mut self, usable: bool) -> Self {
        self.usable = usable;
        self
    }

    /// Builds the bridge and starts its dispatch task.
    ///
    /// The protocol is not validated here; it is checked on every send.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no sink is set
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn build(self) -> Result<Bridge> {
        let sink = self.validate_sink()?;
        let runtime = Self::validate_runtime()?;
        Ok(Bridge::new(self.options, sink, self.usable, &runtime))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeBuilder {
    /// Returns the runtime the dispatch task will be spawned on.
    fn validate_runtime() -> Result<Handle> {
        Handle::try_current()
            .map_err(|_| Error::config("build() must run inside a tokio runtime"))
    }

    /// Validates the sink configuration.
    fn validate_sink(&self) -> Result<Arc<dyn SignalSink>> {
        self.sink.clone().ok_or_else(|| {
            Error::config(
                "Signal sink is required. Use .sink() to set it.\n\
                 Example: Bridge::builder().sink(ChannelSink::new().0)",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::ChannelSink;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = BridgeBuilder::new();
        assert!(builder.sink.is_none());
        assert!(!builder.usable);
        assert!(builder.options.debug);
    }

    #[test]
    fn test_scheme_and_host() {
        let builder = BridgeBuilder::new().scheme("jsbridge").host("native");
        assert_eq!(
            builder.options.protocol,
            ProtocolConfig::new("jsbridge", "native")
        );
    }

    #[test]
    fn test_options_replaces_all() {
        let options = BridgeOptions::new()
            .with_protocol("jsbridge", "native")
            .with_debug(false);
        let builder = BridgeBuilder::new().debug(true).options(options.clone());
        assert_eq!(builder.options, options);
    }

    #[test]
    fn test_build_fails_without_sink() {
        let result = BridgeBuilder::new().protocol("jsbridge", "native").build();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("sink"));
    }

    #[test]
    fn test_build_outside_runtime_errors() {
        let (sink, _signals) = ChannelSink::new();
        let result = BridgeBuilder::new()
            .protocol("jsbridge", "native")
            .sink(sink)
            .build();

        let err = result.unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("tokio runtime"));
    }

    #[tokio::test]
    async fn test_build_with_sink() {
        let (sink, _signals) = ChannelSink::new();
        let bridge = BridgeBuilder::new()
            .protocol("jsbridge", "native")
            .sink(sink)
            .usable(true)
            .build()
            .expect("build");

        assert!(bridge.is_usable());
        assert!(bridge.is_debug());
        bridge.shutdown();
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = BridgeBuilder::new().scheme("jsbridge");
        let cloned = builder.clone();
        assert_eq!(builder.options, cloned.options);
    }
}

//! Bridge instance, configuration and bootstrap.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | One side of the bridge: registries, router and dispatch task |
//! | [`BridgeBuilder`] | Fluent configuration builder |
//! | [`BridgeOptions`] | Protocol, debug flag and field names |
//! | [`Bootstrap`] | Construct-once factory with readiness notification |
//!
//! # Example
//!
//! ```ignore
//! use webview_bridge::{Bridge, ChannelSink, Result};
//!
//! # async fn example() -> Result<()> {
//! let (sink, mut signals) = ChannelSink::new();
//! let bridge = Bridge::builder()
//!     .protocol("jsbridge", "native")
//!     .sink(sink)
//!     .usable(true)
//!     .build()?;
//!
//! bridge.register("exam", |params, responder| match responder {
//!     Some(responder) => responder.ok(params),
//!     None => Ok(()),
//! })?;
//!
//! // Forward `signals` to the peer; feed its messages to `bridge.receive`.
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Construct-once bootstrap.
pub mod bootstrap;

/// Fluent builder pattern for bridge configuration.
pub mod builder;

/// Bridge instance and dispatch loop.
pub mod core;

/// Bridge configuration options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use bootstrap::Bootstrap;
pub use builder::BridgeBuilder;
pub use core::Bridge;
pub use options::BridgeOptions;

//! WebView Bridge - correlated messaging between web content and a native host.
//!
//! This library lets page script and native code call each other's named
//! handlers and receive replies, over a channel that only carries text one
//! way at a time.
//!
//! # Architecture
//!
//! Each side owns a [`Bridge`]:
//!
//! - **Outbound**: a message is serialized to JSON and emitted through a
//!   [`SignalSink`] as `scheme://host?<json>`
//! - **Inbound**: the peer hands JSON text to [`Bridge::receive`], which
//!   queues it for the bridge's dispatch task
//!
//! Key design principles:
//!
//! - Requests carry an optional `callbackId`; replies echo it as `responseId`
//! - Every pending callback is resolved at most once
//! - Handler faults are contained and, where a caller waits, answered with a
//!   failure status
//! - No ambient global: bridges are built explicitly, once, via [`Bootstrap`]
//!
//! # Quick Start
//!
//! ```ignore
//! use serde_json::json;
//! use webview_bridge::{Bridge, ChannelSink, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (sink, mut signals) = ChannelSink::new();
//!     let bridge = Bridge::builder()
//!         .protocol("jsbridge", "native")
//!         .sink(sink)
//!         .usable(true)
//!         .build()?;
//!
//!     bridge.register("echo", |params, responder| match responder {
//!         Some(responder) => responder.respond(params),
//!         None => Ok(()),
//!     })?;
//!
//!     // Deliver `signals` to the peer and its replies to `bridge.receive`.
//!     let reply = bridge.call("getCity", json!({ "id": 1 })).await?;
//!     println!("{reply}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`], [`BridgeBuilder`], [`Bootstrap`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire envelope and status types |
//! | [`registry`] | Handler and callback registries |
//! | [`router`] | Inbound routing and reply handles |
//! | [`transport`] | Signal emission and interception |

// ============================================================================
// Modules
// ============================================================================

/// Bridge instance, configuration and bootstrap.
///
/// Use [`Bridge::builder()`] to create a configured bridge.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing correlation ids and handler names.
pub mod identifiers;

/// Wire protocol types.
///
/// Request/response envelope, status payloads and typed capabilities.
pub mod protocol;

/// Handler and callback registries.
pub mod registry;

/// Inbound message routing.
pub mod router;

/// Signal transport.
///
/// Emits outbound signals and recognises them on the host side.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bootstrap, Bridge, BridgeBuilder, BridgeOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{BridgeId, CallbackId, HandlerName};

// Protocol types
pub use protocol::{
    Capability, FieldNames, Message, Request, Response, ResponseStatus, STATUS_FAILED, STATUS_OK,
};

// Router types
pub use router::{Responder, TypedResponder};

// Transport types
pub use transport::{ChannelSink, ProtocolConfig, SignalSink, intercept};

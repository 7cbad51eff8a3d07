//! Bridge registries.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `callbacks` | Pending response continuations keyed by [`CallbackId`](crate::CallbackId) |
//! | `handlers` | Request handlers keyed by [`HandlerName`](crate::HandlerName) |

// ============================================================================
// Submodules
// ============================================================================

/// Pending response callbacks.
pub mod callbacks;

/// Named request handlers.
pub mod handlers;

// ============================================================================
// Re-exports
// ============================================================================

pub use callbacks::{CallbackRegistry, ResultCallback};
pub use handlers::{Handler, HandlerRegistry};

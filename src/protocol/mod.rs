//! Bridge wire protocol.
//!
//! This module defines the message format exchanged between the script
//! context and the native host.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Either way | Call a named handler, optionally expecting a reply |
//! | `Response` | Either way | Reply to a request's `callbackId` |
//!
//! There is no type tag: a message with a non-empty `responseId` is a
//! response, anything else is a request.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `capability` | Typed handler contracts |
//! | `message` | Request/Response envelope and codec |
//! | `status` | `{status, msg, values}` reply payload |

// ============================================================================
// Submodules
// ============================================================================

/// Typed handler contracts.
pub mod capability;

/// Request and Response message types.
pub mod message;

/// Reply status payload.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use capability::Capability;
pub use message::{FieldNames, Message, Request, Response};
pub use status::{ResponseStatus, STATUS_FAILED, STATUS_OK};

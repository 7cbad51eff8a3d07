//! Named request handlers.
//!
//! Handlers are looked up by the `handlerName` of each inbound request.
//! Registration is last-write-wins unless the strict
//! [`HandlerRegistry::try_register`] is used.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::HandlerName;
use crate::router::Responder;

// ============================================================================
// Types
// ============================================================================

/// Request handler.
///
/// Receives the request params and, iff the caller expects a reply, a
/// [`Responder`]. Returning `Err` (or panicking) is treated as a handler
/// fault by the router, which answers with a failure status only if the
/// responder was dropped unused. A responder moved elsewhere (e.g. into a
/// task) still owns the reply.
pub type Handler = Arc<dyn Fn(Value, Option<Responder>) -> Result<()> + Send + Sync>;

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Map of handler names to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<FxHashMap<HandlerName, Handler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handler` under `name`, replacing any previous handler.
    ///
    /// Returns `true` if a previous handler was replaced.
    pub fn register(&self, name: HandlerName, handler: Handler) -> bool {
        self.handlers.write().insert(name, handler).is_some()
    }

    /// Stores `handler` under `name` unless the name is taken.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateHandler`] if `name` is already registered.
    pub fn try_register(&self, name: HandlerName, handler: Handler) -> Result<()> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&name) {
            return Err(Error::duplicate_handler(name.as_str()));
        }
        handlers.insert(name, handler);
        Ok(())
    }

    /// Returns the handler registered under `name`.
    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.handlers.read().get(name).cloned()
    }

    /// Returns `true` if `name` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if no handler is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<HandlerName> {
        let mut names: Vec<HandlerName> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// ============================================================================
// Tests
// ============================================================================

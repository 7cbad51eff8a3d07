//! Pending response callbacks.
//!
//! Every request that expects a reply parks its continuation here under a
//! fresh [`CallbackId`]. The entry is removed before it is completed, so a
//! second response with the same id finds nothing and resolves nothing.
//!
//! A continuation is either a plain callback (callback-style `invoke`) or
//! the sending half of a `oneshot` channel (async `call`).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::identifiers::CallbackId;

// ============================================================================
// Types
// ============================================================================

/// Boxed result callback.
pub type ResultCallback = Box<dyn FnOnce(Value) + Send>;

/// Continuation waiting for a response payload.
enum PendingCallback {
    /// Callback-style caller.
    Callback(ResultCallback),
    /// Future-style caller.
    Channel(oneshot::Sender<Value>),
}

impl PendingCallback {
    /// Hands the payload to the waiting caller.
    fn complete(self, payload: Value) {
        match self {
            Self::Callback(callback) => callback(payload),
            Self::Channel(tx) => {
                // Caller may have stopped waiting.
                let _ = tx.send(payload);
            }
        }
    }
}

// ============================================================================
// CallbackRegistry
// ============================================================================

/// Map of correlation ids to pending continuations.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: Mutex<FxHashMap<CallbackId, PendingCallback>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `callback` under a fresh id and returns the id.
    pub fn allocate<F>(&self, callback: F) -> CallbackId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.insert(PendingCallback::Callback(Box::new(callback)))
    }

    /// Allocates an id completed through a `oneshot` channel.
    pub fn allocate_channel(&self) -> (CallbackId, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        (self.insert(PendingCallback::Channel(tx)), rx)
    }

    /// Completes and removes the entry for `id`.
    ///
    /// Returns `false` if nothing is pending under `id`. The continuation
    /// runs after the registry lock is released, so it may allocate again.
    pub fn resolve(&self, id: &CallbackId, payload: Value) -> bool {
        let pending = self.pending.lock().remove(id);

        match pending {
            Some(pending) => {
                pending.complete(payload);
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `id` without completing it.
    pub fn cancel(&self, id: &CallbackId) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    /// Drops every pending entry, returning how many there were.
    ///
    /// Future-style callers observe a closed channel.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        drained.len()
    }

    /// Returns `true` if `id` is still waiting for a response.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: &CallbackId) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Returns the number of pending entries.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn insert(&self, pending: PendingCallback) -> CallbackId {
        let id = CallbackId::generate();
        self.pending.lock().insert(id.clone(), pending);
        id
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Reply handles given to handlers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::CallbackId;
use crate::protocol::{Response, ResponseStatus};
use crate::transport::Transport;

// ============================================================================
// Responder
// ============================================================================

/// One-shot handle for answering a correlated request.
///
/// Consumed by every reply method, so a request is answered at most once.
/// The handle is `Send` and may be moved into a task that answers later.
pub struct Responder {
    callback_id: CallbackId,
    transport: Arc<Transport>,
    answered: Arc<AtomicBool>,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("callback_id", &self.callback_id)
            .finish_non_exhaustive()
    }
}

impl Responder {
    /// Creates a responder. `answered` is flipped before the reply is sent.
    pub(crate) fn new(
        callback_id: CallbackId,
        transport: Arc<Transport>,
        answered: Arc<AtomicBool>,
    ) -> Self {
        Self {
            callback_id,
            transport,
            answered,
        }
    }

    /// Returns the id being answered.
    #[inline]
    #[must_use]
    pub fn callback_id(&self) -> &CallbackId {
        &self.callback_id
    }

    /// Sends `data` back to the caller.
    ///
    /// A `null` reply is sent as `{}`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the reply cannot be sent.
    pub fn respond(self, data: Value) -> Result<()> {
        self.answered.store(true, Ordering::Release);

        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        self.transport
            .send(&Response::new(self.callback_id, data).into())
    }

    /// Serializes `data` and sends it back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails,
    /// or the transport's error.
    pub fn respond_with<T: Serialize>(self, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.respond(value)
    }

    /// Replies `{"status": "1", "msg": "ok", "values": values}`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the reply cannot be sent.
    pub fn ok(self, values: Value) -> Result<()> {
        self.respond(ResponseStatus::ok(values).into())
    }

    /// Replies `{"status": "-1", "msg": msg}`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the reply cannot be sent.
    pub fn fail(self, msg: impl Into<String>) -> Result<()> {
        self.respond(ResponseStatus::failed(msg).into())
    }
}

// ============================================================================
// TypedResponder
// ============================================================================

/// [`Responder`] restricted to one output type.
pub struct TypedResponder<T> {
    inner: Responder,
    _output: PhantomData<fn(T)>,
}

impl<T> fmt::Debug for TypedResponder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedResponder").field(&self.inner).finish()
    }
}

impl<T: Serialize> TypedResponder<T> {
    /// Wraps an untyped responder.
    #[inline]
    #[must_use]
    pub fn new(inner: Responder) -> Self {
        Self {
            inner,
            _output: PhantomData,
        }
    }

    /// Sends `output` back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails,
    /// or the transport's error.
    pub fn respond(self, output: &T) -> Result<()> {
        self.inner.respond_with(output)
    }

    /// Sends a failure status instead of an output.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the reply cannot be sent.
    pub fn fail(self, msg: impl Into<String>) -> Result<()> {
        self.inner.fail(msg)
    }

    /// Returns the untyped responder.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Responder {
        self.inner
    }
}

// ============================================================================
// Tests
// ============================================================================

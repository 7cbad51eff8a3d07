//! Request and Response message types.
//!
//! Both shapes travel in one untagged JSON envelope; the presence of a
//! non-empty response id field is what makes a message a response.
//!
//! # Format
//!
//! Request:
//! ```json
//! {
//!   "handlerName": "exam",
//!   "params": { ... },
//!   "callbackId": "cb_3_1700000000000"
//! }
//! ```
//!
//! Response:
//! ```json
//! {
//!   "responseId": "cb_3_1700000000000",
//!   "data": { "status": "1", "msg": "ok", "values": { ... } }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value, from_str, to_string};

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;

// ============================================================================
// FieldNames
// ============================================================================

/// Key names used in the wire envelope.
///
/// Both peers must agree on these. The defaults match the stock page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    /// Request key holding the handler name.
    pub handler_name: String,
    /// Request key holding the params.
    pub params: String,
    /// Request key holding the correlation id.
    pub callback_id: String,
    /// Response key holding the correlation id being answered.
    pub response_id: String,
    /// Response key holding the reply payload.
    pub data: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            handler_name: "handlerName".to_string(),
            params: "params".to_string(),
            callback_id: "callbackId".to_string(),
            response_id: "responseId".to_string(),
            data: "data".to_string(),
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// A call into a named handler on the other side.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Target handler name. May be empty if the peer omitted it.
    pub handler_name: String,

    /// Handler arguments.
    pub params: Value,

    /// Present iff the sender expects a reply.
    pub callback_id: Option<CallbackId>,
}

impl Request {
    /// Creates a fire-and-forget request.
    #[inline]
    #[must_use]
    pub fn new(handler_name: impl Into<String>, params: Value) -> Self {
        Self {
            handler_name: handler_name.into(),
            params,
            callback_id: None,
        }
    }

    /// Attaches a correlation id.
    #[inline]
    #[must_use]
    pub fn with_callback(mut self, callback_id: CallbackId) -> Self {
        self.callback_id = Some(callback_id);
        self
    }

    /// Returns `true` if the sender expects a reply.
    #[inline]
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.callback_id.is_some()
    }
}

// ============================================================================
// Response
// ============================================================================

/// A reply to an earlier request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The request's `callbackId`.
    pub response_id: CallbackId,

    /// Reply payload.
    pub data: Value,
}

impl Response {
    /// Creates a response.
    #[inline]
    #[must_use]
    pub fn new(response_id: CallbackId, data: Value) -> Self {
        Self { response_id, data }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Unit exchanged across the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Call into a handler.
    Request(Request),
    /// Reply to a pending callback.
    Response(Response),
}

impl Message {
    /// Returns `true` if this is a response.
    #[inline]
    #[must_use]
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Builds the JSON envelope using the given key names.
    #[must_use]
    pub fn to_value(&self, names: &FieldNames) -> Value {
        let mut map = Map::new();

        match self {
            Self::Request(request) => {
                map.insert(
                    names.handler_name.clone(),
                    Value::String(request.handler_name.clone()),
                );
                map.insert(names.params.clone(), request.params.clone());
                if let Some(ref id) = request.callback_id {
                    map.insert(names.callback_id.clone(), Value::String(id.to_string()));
                }
            }
            Self::Response(response) => {
                map.insert(
                    names.response_id.clone(),
                    Value::String(response.response_id.to_string()),
                );
                map.insert(names.data.clone(), response.data.clone());
            }
        }

        Value::Object(map)
    }

    /// Serializes the envelope to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self, names: &FieldNames) -> Result<String> {
        Ok(to_string(&self.to_value(names))?)
    }

    /// Parses inbound text into a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the text is not a JSON object
    /// or an envelope field has the wrong type.
    pub fn decode(text: &str, names: &FieldNames) -> Result<Self> {
        let value: Value = from_str(text).map_err(|e| Error::malformed_payload(e.to_string()))?;
        Self::from_value(value, names)
    }

    /// Classifies a JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the value is not an object or an
    /// envelope field has the wrong type.
    pub fn from_value(value: Value, names: &FieldNames) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::malformed_payload("message is not a JSON object"));
        };

        if let Some(response_id) = take_id(&mut map, &names.response_id)? {
            let data = map.remove(&names.data).unwrap_or(Value::Null);
            return Ok(Self::Response(Response::new(response_id, data)));
        }

        let handler_name = match map.remove(&names.handler_name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(Error::malformed_payload(format!(
                    "{} must be a string, got {other}",
                    names.handler_name
                )));
            }
        };

        Ok(Self::Request(Request {
            handler_name,
            params: map.remove(&names.params).unwrap_or(Value::Null),
            callback_id: take_id(&mut map, &names.callback_id)?,
        }))
    }
}

impl From<Request> for Message {
    #[inline]
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Message {
    #[inline]
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Removes an id field; missing, null and empty all mean "absent".
fn take_id(map: &mut Map<String, Value>, key: &str) -> Result<Option<CallbackId>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(CallbackId::from(id))),
        Some(other) => Err(Error::malformed_payload(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

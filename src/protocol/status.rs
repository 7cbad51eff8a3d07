//! Reply status envelope.
//!
//! Replies carry a `{status, msg, values}` object in the response `data`
//! field. Both sides of the stock integration speak this convention, and the
//! bridge uses it for every error reply it synthesizes itself.
//!
//! ```json
//! { "status": "1", "msg": "ok", "values": { "cityName": "Beijing" } }
//! { "status": "-1", "msg": "no handler registered for `exam9`" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Constants
// ============================================================================

/// Status code of a successful reply.
pub const STATUS_OK: &str = "1";

/// Status code of a failed reply.
pub const STATUS_FAILED: &str = "-1";

/// Message sent back when `invoke` runs before initialization finished.
pub const UNAVAILABLE_MESSAGE: &str = "bridge is unavailable";

// ============================================================================
// ResponseStatus
// ============================================================================

/// Structured reply payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// `"1"` on success, `"-1"` on failure.
    pub status: String,

    /// Human-readable message.
    pub msg: String,

    /// Reply values, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

impl ResponseStatus {
    /// Creates a successful reply carrying `values`.
    #[inline]
    #[must_use]
    pub fn ok(values: Value) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            msg: "ok".to_string(),
            values: Some(values),
        }
    }

    /// Creates a failed reply.
    #[inline]
    #[must_use]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            msg: msg.into(),
            values: None,
        }
    }

    /// Payload handed to callers that invoke before the bridge is usable.
    #[inline]
    #[must_use]
    pub fn unavailable() -> Self {
        Self::failed(UNAVAILABLE_MESSAGE)
    }

    /// Payload sent back for requests addressed to an unknown handler.
    #[must_use]
    pub fn handler_not_found(handler: &str) -> Self {
        Self::failed(format!("no handler registered for `{handler}`"))
    }

    /// Returns `true` if the status is [`STATUS_OK`].
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut value = json!({ "status": self.status, "msg": self.msg });
        if let (Some(values), Some(map)) = (&self.values, value.as_object_mut()) {
            map.insert("values".to_string(), values.clone());
        }
        value
    }

    /// Extracts a failure status from a reply payload.
    ///
    /// Returns `None` for anything that is not an object whose `status`
    /// equals [`STATUS_FAILED`].
    #[must_use]
    pub fn failure_in(data: &Value) -> Option<Self> {
        let status = data.get("status")?.as_str()?;
        if status != STATUS_FAILED {
            return None;
        }

        Some(Self {
            status: status.to_string(),
            msg: data
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            values: data.get("values").cloned(),
        })
    }
}

impl From<ResponseStatus> for Value {
    #[inline]
    fn from(status: ResponseStatus) -> Self {
        status.to_value()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Typed capabilities.
//!
//! A [`Capability`] binds a handler name to concrete params and output
//! types, so both registration and invocation go through serde instead of
//! hand-picked JSON fields.
//!
//! # Example
//!
//! ```ignore
//! use serde::{Deserialize, Serialize};
//! use webview_bridge::Capability;
//!
//! #[derive(Serialize, Deserialize)]
//! struct City { city_name: String, city_province: String }
//!
//! struct Exam1;
//!
//! impl Capability for Exam1 {
//!     const NAME: &'static str = "exam1";
//!     type Params = City;
//!     type Output = City;
//! }
//!
//! let city = bridge.call_capability::<Exam1>(&City { .. }).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Capability
// ============================================================================

/// A named handler with typed params and output.
pub trait Capability {
    /// Handler name on the wire.
    const NAME: &'static str;

    /// Request params.
    type Params: Serialize + DeserializeOwned + Send + 'static;

    /// Reply payload.
    type Output: Serialize + DeserializeOwned + Send + 'static;
}

/// Decodes a payload addressed to `handler`.
pub(crate) fn decode_payload<T: DeserializeOwned>(handler: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::invalid_payload(handler, e.to_string()))
}

/// Encodes a payload addressed to `handler`.
pub(crate) fn encode_payload<T: Serialize>(handler: &str, payload: &T) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| Error::invalid_payload(handler, e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

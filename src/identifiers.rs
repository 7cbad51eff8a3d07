//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers keep correlation ids, handler names and bridge ids from
//! being mixed up at compile time.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`CallbackId`] | `String` | Request/response correlation |
//! | [`HandlerName`] | `String` | Validated handler registry key |
//! | [`BridgeId`] | `Uuid` | Bridge instance identity (logging) |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of generated correlation ids.
const CALLBACK_ID_PREFIX: &str = "cb";

/// Monotonic counter shared by every bridge in the process.
static NEXT_CALLBACK_SEQ: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// CallbackId
// ============================================================================

/// Correlation identifier linking a request to its response.
///
/// Generated ids have the form `cb_<seq>_<unix-millis>`. The sequence number
/// alone makes them unique within the process; the timestamp only makes them
/// easier to read in logs. Ids received from the peer are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(String);

impl CallbackId {
    /// Generates a fresh, never-before-issued id.
    #[must_use]
    pub fn generate() -> Self {
        let seq = NEXT_CALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Self(format!("{CALLBACK_ID_PREFIX}_{seq}_{millis}"))
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallbackId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CallbackId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// HandlerName
// ============================================================================

/// Name under which a handler is registered.
///
/// Blank names are rejected. Anything else is kept verbatim, since
/// lookups match the name on the wire exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HandlerName(String);

impl HandlerName {
    /// Validates and wraps a handler name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandlerName`] if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(Error::invalid_handler_name(name));
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for HandlerName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for HandlerName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

// ============================================================================
// BridgeId
// ============================================================================

/// Identity of one bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeId(Uuid);

impl BridgeId {
    /// Generates a random bridge id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

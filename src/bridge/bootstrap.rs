//! Construct-once bridge bootstrap.
//!
//! The page script and the host race: either the bridge is installed before
//! the host's setup runs, or setup arrives first and waits for the bridge.
//! Both orders end with exactly one bridge, handlers registered once, and
//! the bridge marked usable.
//!
//! # Example
//!
//! ```ignore
//! use webview_bridge::{Bootstrap, Bridge};
//!
//! let bootstrap = Bootstrap::new();
//!
//! bootstrap.initialize(|bridge| {
//!     bridge.register("exam", |params, responder| {
//!         match responder {
//!             Some(responder) => responder.ok(params),
//!             None => Ok(()),
//!         }
//!     })
//! });
//!
//! let bridge = bootstrap.install(Bridge::builder().sink(sink))?;
//! assert!(bridge.is_usable());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::error::Result;

use super::builder::BridgeBuilder;
use super::core::Bridge;

// ============================================================================
// Types
// ============================================================================

/// Callback run once the bridge exists.
type ReadyCallback = Box<dyn FnOnce(&Bridge) + Send>;

#[derive(Default)]
struct BootstrapState {
    bridge: Option<Bridge>,
    subscribers: Vec<ReadyCallback>,
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Produces at most one [`Bridge`] and notifies everyone waiting for it.
#[derive(Default)]
pub struct Bootstrap {
    state: Mutex<BootstrapState>,
    initialized: Arc<AtomicBool>,
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Bootstrap")
            .field("bridge", &state.bridge.as_ref().map(Bridge::id))
            .field("subscribers", &state.subscribers.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Bootstrap {
    /// Creates an empty bootstrap.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the bridge unless one exists, then notifies subscribers.
    ///
    /// A second call returns the existing bridge and ignores `builder`.
    ///
    /// # Errors
    ///
    /// Returns the builder's error if the first build fails; the bootstrap
    /// stays empty and a later call may retry.
    pub fn install(&self, builder: BridgeBuilder) -> Result<Bridge> {
        let (bridge, subscribers) = {
            let mut state = self.state.lock();

            if let Some(bridge) = &state.bridge {
                debug!(bridge_id = %bridge.id(), "Bridge already installed");
                return Ok(bridge.clone());
            }

            let bridge = builder.build()?;
            state.bridge = Some(bridge.clone());
            (bridge, std::mem::take(&mut state.subscribers))
        };

        info!(
            bridge_id = %bridge.id(),
            subscribers = subscribers.len(),
            "Bridge installed"
        );

        // Run outside the lock; subscribers may call back into the bootstrap.
        for subscriber in subscribers {
            subscriber(&bridge);
        }

        Ok(bridge)
    }

    /// Returns the bridge if it is installed.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<Bridge> {
        self.state.lock().bridge.clone()
    }

    /// Returns `true` once a bridge is installed.
    #[inline]
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.state.lock().bridge.is_some()
    }

    /// Returns `true` once setup has run.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Runs `callback` with the bridge, now if installed or on install.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&Bridge) + Send + 'static,
    {
        let mut state = self.state.lock();
        let Some(bridge) = state.bridge.clone() else {
            state.subscribers.push(Box::new(callback));
            return;
        };
        drop(state);

        callback(&bridge);
    }

    /// Waits for the bridge to be installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// bootstrap is dropped before a bridge is installed.
    pub async fn ready(&self) -> Result<Bridge> {
        let (tx, rx) = oneshot::channel();
        self.on_ready(move |bridge| {
            let _ = tx.send(bridge.clone());
        });
        Ok(rx.await?)
    }

    /// Registers host handlers exactly once and marks the bridge usable.
    ///
    /// Runs `setup` immediately if the bridge exists, otherwise on install.
    /// Later calls are ignored. If `setup` fails the error is logged and
    /// the bridge stays unusable.
    pub fn initialize<F>(&self, setup: F)
    where
        F: FnOnce(&Bridge) -> Result<()> + Send + 'static,
    {
        let initialized = Arc::clone(&self.initialized);

        self.on_ready(move |bridge| {
            if initialized.swap(true, Ordering::AcqRel) {
                debug!(bridge_id = %bridge.id(), "Bridge already initialized");
                return;
            }

            match setup(bridge) {
                Ok(()) => {
                    bridge.mark_usable();
                    info!(
                        bridge_id = %bridge.id(),
                        handlers = bridge.handler_count(),
                        "Bridge initialized"
                    );
                }
                Err(e) => {
                    error!(bridge_id = %bridge.id(), error = %e, "Bridge setup failed");
                }
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

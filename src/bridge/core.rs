//! Bridge instance and dispatch loop.
//!
//! A [`Bridge`] owns one handler registry, one callback registry and one
//! transport. Inbound text is decoded synchronously by [`Bridge::receive`]
//! and queued to a dispatch task, so handlers never run on the caller's
//! stack.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::identifiers::{BridgeId, CallbackId, HandlerName};
use crate::protocol::capability::{decode_payload, encode_payload};
use crate::protocol::{Capability, Message, ResponseStatus};
use crate::registry::{CallbackRegistry, HandlerRegistry};
use crate::router::{Responder, Router, TypedResponder};
use crate::transport::{ProtocolConfig, SignalSink, Transport};

use super::builder::BridgeBuilder;
use super::options::BridgeOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal commands for the dispatch loop.
enum LoopCommand {
    /// Route a decoded inbound message.
    Dispatch(Message),
    /// Signal once everything queued before this command is routed.
    Settle(oneshot::Sender<()>),
    /// Stop the loop.
    Shutdown,
}

/// Shared bridge state.
struct BridgeInner {
    id: BridgeId,
    router: Router,
    transport: Arc<Transport>,
    callbacks: Arc<CallbackRegistry>,
    handlers: Arc<HandlerRegistry>,
    usable: Arc<AtomicBool>,
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    closed: AtomicBool,
}

// ============================================================================
// Bridge
// ============================================================================

/// One side of a JS/native bridge.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.inner.id)
            .field("transport", &self.inner.transport)
            .field("handlers", &self.inner.handlers)
            .field("callbacks", &self.inner.callbacks)
            .field("usable", &self.is_usable())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Construction
// ============================================================================

impl Bridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Creates the bridge and spawns its dispatch task.
    pub(crate) fn new(
        options: BridgeOptions,
        sink: Arc<dyn SignalSink>,
        usable: bool,
        runtime: &Handle,
    ) -> Self {
        let BridgeOptions {
            protocol,
            debug,
            field_names,
        } = options;

        let transport = Arc::new(Transport::new(sink, protocol, field_names, debug));
        let callbacks = Arc::new(CallbackRegistry::new());
        let handlers = Arc::new(HandlerRegistry::new());
        let usable = Arc::new(AtomicBool::new(usable));

        let router = Router::new(
            Arc::clone(&transport),
            Arc::clone(&callbacks),
            Arc::clone(&handlers),
            Arc::clone(&usable),
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        runtime.spawn(Self::run_dispatch_loop(router.clone(), command_rx));

        let id = BridgeId::generate();
        info!(bridge_id = %id, "Bridge created");

        Self {
            inner: Arc::new(BridgeInner {
                id,
                router,
                transport,
                callbacks,
                handlers,
                usable,
                command_tx,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns this bridge's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BridgeId {
        self.inner.id
    }
}

// ============================================================================
// Bridge - Registration
// ============================================================================

impl Bridge {
    /// Registers `handler` under `name`, replacing any previous handler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandlerName`] if `name` is blank.
    pub fn register<F>(&self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Value, Option<Responder>) -> Result<()> + Send + Sync + 'static,
    {
        let name = HandlerName::new(name)?;
        debug!(handler = %name, "Registering handler");

        if self.inner.handlers.register(name, Arc::new(handler)) {
            debug!("Replaced previous handler");
        }
        Ok(())
    }

    /// Registers `handler` under `name` unless the name is taken.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandlerName`] if `name` is blank
    /// - [`Error::DuplicateHandler`] if `name` is already registered
    pub fn try_register<F>(&self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Value, Option<Responder>) -> Result<()> + Send + Sync + 'static,
    {
        let name = HandlerName::new(name)?;
        self.inner.handlers.try_register(name, Arc::new(handler))
    }

    /// Registers a typed handler under [`Capability::NAME`].
    ///
    /// Params that do not decode into `C::Params` fail the request with
    /// [`Error::InvalidPayload`], which the caller sees as a failure status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandlerName`] if `C::NAME` is blank.
    pub fn register_capability<C, F>(&self, handler: F) -> Result<()>
    where
        C: Capability + 'static,
        F: Fn(C::Params, Option<TypedResponder<C::Output>>) -> Result<()> + Send + Sync + 'static,
    {
        self.register(C::NAME, move |params, responder| {
            let params = decode_payload::<C::Params>(C::NAME, params)?;
            handler(params, responder.map(TypedResponder::new))
        })
    }

    /// Returns `true` if a handler is registered under `name`.
    #[inline]
    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.inner.handlers.contains(name)
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Returns the registered handler names, sorted.
    #[inline]
    #[must_use]
    pub fn handler_names(&self) -> Vec<HandlerName> {
        self.inner.handlers.names()
    }
}

// ============================================================================
// Bridge - Outbound
// ============================================================================

impl Bridge {
    /// Calls a remote handler and hands the reply to `on_result`.
    ///
    /// If the bridge is not usable yet, `on_result` runs immediately with a
    /// failure status and nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the request cannot be sent.
    pub fn invoke<F>(&self, handler_name: &str, params: Value, on_result: F) -> Result<()>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.inner.router.invoke(handler_name, params, on_result)
    }

    /// Calls a remote handler and waits for the reply.
    ///
    /// Waits until the reply arrives or the bridge shuts down.
    ///
    /// # Errors
    ///
    /// - [`Error::BridgeUnavailable`] if the bridge is not usable yet
    /// - [`Error::ChannelClosed`] if the bridge shuts down first
    /// - the transport's error if the request cannot be sent
    pub async fn call(&self, handler_name: &str, params: Value) -> Result<Value> {
        let (_, rx) = self.inner.router.call(handler_name, params)?;
        Ok(rx.await?)
    }

    /// Calls a remote handler and waits at most `request_timeout`.
    ///
    /// On expiry the pending entry is removed, so a late reply is treated
    /// as an orphan.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if no reply arrives in time
    /// - everything [`Bridge::call`] returns
    pub async fn call_with_timeout(
        &self,
        handler_name: &str,
        params: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        let (id, rx) = self.inner.router.call(handler_name, params)?;

        match timeout(request_timeout, rx).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.inner.callbacks.cancel(&id);
                Err(Error::request_timeout(
                    id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Calls a typed capability.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPayload`] if params or reply do not match the
    ///   capability's types
    /// - [`Error::HandlerNotFound`] if the peer has no handler for the
    ///   capability
    /// - [`Error::Remote`] if the peer replies with any other failure status
    /// - everything [`Bridge::call`] returns
    pub async fn call_capability<C: Capability>(&self, params: &C::Params) -> Result<C::Output> {
        let params = encode_payload(C::NAME, params)?;
        let data = self.call(C::NAME, params).await?;

        if let Some(failure) = ResponseStatus::failure_in(&data) {
            if failure.msg == ResponseStatus::handler_not_found(C::NAME).msg {
                return Err(Error::handler_not_found(C::NAME));
            }
            return Err(Error::remote(failure.status, failure.msg));
        }

        decode_payload(C::NAME, data)
    }

    /// Sends a request that expects no reply.
    ///
    /// # Errors
    ///
    /// - [`Error::BridgeUnavailable`] if the bridge is not usable yet
    /// - the transport's error if the request cannot be sent
    pub fn notify(&self, handler_name: &str, params: Value) -> Result<()> {
        self.inner.router.notify(handler_name, params)
    }
}

// ============================================================================
// Bridge - Inbound
// ============================================================================

impl Bridge {
    /// Accepts one JSON message from the peer.
    ///
    /// Decodes synchronously and queues the message for the dispatch task;
    /// no handler or callback runs before this returns.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedPayload`] if `raw` is not a valid envelope
    /// - [`Error::BridgeUnavailable`] if the bridge has shut down
    pub fn receive(&self, raw: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::BridgeUnavailable);
        }

        let message = self.inner.transport.decode(raw)?;
        self.inner
            .command_tx
            .send(LoopCommand::Dispatch(message))
            .map_err(|_| Error::BridgeUnavailable)
    }

    /// Waits until every message received before this call is routed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeUnavailable`] if the bridge has shut down.
    pub async fn settle(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(LoopCommand::Settle(tx))
            .map_err(|_| Error::BridgeUnavailable)?;

        rx.await.map_err(|_| Error::BridgeUnavailable)
    }
}

// ============================================================================
// Bridge - Lifecycle & Configuration
// ============================================================================

impl Bridge {
    /// Returns `true` once requests may be sent.
    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.inner.router.is_usable()
    }

    /// Allows requests to be sent.
    pub fn mark_usable(&self) {
        if !self.inner.usable.swap(true, Ordering::AcqRel) {
            debug!(bridge_id = %self.inner.id, "Bridge marked usable");
        }
    }

    /// Replaces the signal scheme and host.
    ///
    /// Takes effect on the next send.
    pub fn set_protocol(&self, scheme: impl Into<String>, host: impl Into<String>) {
        self.inner
            .transport
            .set_protocol(ProtocolConfig::new(scheme, host));
    }

    /// Returns the current signal scheme and host.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> ProtocolConfig {
        self.inner.transport.protocol()
    }

    /// Toggles traffic logging.
    #[inline]
    pub fn set_debug(&self, debug: bool) {
        self.inner.transport.set_debug(debug);
    }

    /// Returns `true` if traffic logging is on.
    #[inline]
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.inner.transport.is_debug()
    }

    /// Returns the number of requests still waiting for a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.callbacks.pending_count()
    }

    /// Returns `true` if the callback for `id` is still pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: &CallbackId) -> bool {
        self.inner.callbacks.is_pending(id)
    }

    /// Returns `true` after [`Bridge::shutdown`].
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stops the dispatch task and drops every pending callback.
    ///
    /// Messages already queued are still routed. Callers awaiting
    /// [`Bridge::call`] observe [`Error::ChannelClosed`]; callback-style
    /// continuations are dropped without running.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.inner.command_tx.send(LoopCommand::Shutdown);

        let dropped = self.inner.callbacks.clear();
        if dropped > 0 {
            debug!(count = dropped, "Dropped pending callbacks on shutdown");
        }
    }
}

// ============================================================================
// Dispatch Loop
// ============================================================================

impl Bridge {
    /// Routes queued messages one at a time until shutdown.
    async fn run_dispatch_loop(router: Router, mut command_rx: mpsc::UnboundedReceiver<LoopCommand>) {
        while let Some(command) = command_rx.recv().await {
            match command {
                LoopCommand::Dispatch(message) => router.route(message),
                LoopCommand::Settle(tx) => {
                    let _ = tx.send(());
                }
                LoopCommand::Shutdown => {
                    debug!("Shutdown command received");
                    break;
                }
            }
        }

        trace!("Dispatch loop terminated");
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    use crate::transport::{ChannelSink, intercept};

    fn bridge(usable: bool) -> (Bridge, UnboundedReceiver<String>) {
        let (sink, signals) = ChannelSink::new();
        let bridge = Bridge::builder()
            .protocol("jsbridge", "native")
            .sink(sink)
            .usable(usable)
            .build()
            .expect("build");
        (bridge, signals)
    }

    /// Feeds every emitted signal back into the same bridge.
    fn loopback(bridge: &Bridge, mut signals: UnboundedReceiver<String>) -> JoinHandle<()> {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                if let Some(payload) = intercept(&signal, &bridge.protocol()) {
                    let _ = bridge.receive(payload);
                }
            }
        })
    }

    fn echo(params: Value, responder: Option<Responder>) -> Result<()> {
        match responder {
            Some(responder) => responder.respond(params),
            None => Ok(()),
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct City {
        name: String,
        province: String,
    }

    struct GetCity;

    impl Capability for GetCity {
        const NAME: &'static str = "getCity";
        type Params = City;
        type Output = City;
    }

    #[tokio::test]
    async fn test_echo_invokes_callback_once() {
        let (bridge, signals) = bridge(true);
        let pump = loopback(&bridge, signals);
        bridge.register("echo", echo).expect("register");

        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = Arc::clone(&calls);
        bridge
            .invoke("echo", json!({"a": 1}), move |payload| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(payload);
            })
            .expect("invoke");

        assert_eq!(rx.await.expect("reply"), json!({"a": 1}));
        bridge.settle().await.expect("settle");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.pending_count(), 0);

        pump.abort();
    }

    #[tokio::test]
    async fn test_call_returns_reply() {
        let (bridge, signals) = bridge(true);
        let pump = loopback(&bridge, signals);
        bridge.register("echo", echo).expect("register");

        let reply = bridge.call("echo", json!([1, 2, 3])).await.expect("call");
        assert_eq!(reply, json!([1, 2, 3]));

        pump.abort();
    }

    #[tokio::test]
    async fn test_receive_defers_dispatch() {
        let (bridge, _signals) = bridge(true);
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bridge
            .register("count", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("register");

        bridge
            .receive(r#"{"handlerName":"count","params":{}}"#)
            .expect("receive");
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bridge.settle().await.expect("settle");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_receive_malformed_returns_error() {
        let (bridge, _signals) = bridge(true);

        let err = bridge.receive("not json").unwrap_err();
        assert!(err.is_payload_error());

        assert_ok!(bridge.settle().await);
    }

    #[tokio::test]
    async fn test_missing_handler_reply() {
        let (bridge, mut signals) = bridge(true);

        bridge
            .receive(r#"{"handlerName":"nope","params":{},"callbackId":"cb_9_0"}"#)
            .expect("receive");
        bridge
            .receive(r#"{"handlerName":"nope","params":{}}"#)
            .expect("receive");
        bridge.settle().await.expect("settle");

        let signal = signals.try_recv().expect("one reply");
        let payload = intercept(&signal, &bridge.protocol()).expect("bridge signal");
        let reply: Value = serde_json::from_str(payload).expect("json");
        assert_eq!(reply["responseId"], "cb_9_0");
        assert_eq!(reply["data"]["status"], "-1");
        assert!(signals.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invoke_when_unusable() {
        let (bridge, mut signals) = bridge(false);
        let seen = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&seen);
        bridge
            .invoke("test", json!({}), move |payload| {
                *slot.lock() = Some(payload);
            })
            .expect("invoke");

        let payload = seen.lock().take().expect("answered synchronously");
        assert_eq!(payload["status"], "-1");
        assert!(signals.try_recv().is_err());

        assert!(matches!(
            bridge.call("test", json!({})).await,
            Err(Error::BridgeUnavailable)
        ));

        bridge.mark_usable();
        assert!(bridge.is_usable());
    }

    #[tokio::test]
    async fn test_call_with_timeout_removes_entry() {
        let (bridge, _signals) = bridge(true);

        let err = bridge
            .call_with_timeout("slow", json!({}), Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_late_reply_after_timeout_is_orphan() {
        let (bridge, mut signals) = bridge(true);

        let err = bridge
            .call_with_timeout("slow", json!({}), Duration::from_millis(10))
            .await
            .unwrap_err();
        let callback_id = match err {
            Error::RequestTimeout { callback_id, .. } => callback_id,
            other => panic!("expected timeout, got {other:?}"),
        };

        let signal = signals.try_recv().expect("request sent");
        assert!(signal.contains(callback_id.as_str()));

        let late = json!({"responseId": callback_id.as_str(), "data": {}});
        bridge.receive(&late.to_string()).expect("receive");
        assert_ok!(bridge.settle().await);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drops_pending_calls() {
        let (bridge, _signals) = bridge(true);

        let caller = bridge.clone();
        let call = tokio::spawn(async move { caller.call("never", json!({})).await });

        while bridge.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        bridge.shutdown();

        let result = call.await.expect("join");
        assert!(matches!(result, Err(Error::ChannelClosed(_))));

        assert!(bridge.is_closed());
        assert!(matches!(
            bridge.receive(r#"{"responseId":"x","data":{}}"#),
            Err(Error::BridgeUnavailable)
        ));
        assert_err!(bridge.settle().await);
    }

    #[tokio::test]
    async fn test_set_protocol_at_runtime() {
        let (sink, _signals) = ChannelSink::new();
        let bridge = Bridge::builder()
            .sink(sink)
            .usable(true)
            .build()
            .expect("build");

        let err = bridge.invoke("test", json!({}), |_| {}).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(bridge.pending_count(), 0);

        bridge.set_protocol("jsbridge", "native");
        assert_ok!(bridge.invoke("test", json!({}), |_| {}));
        assert_eq!(bridge.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let (bridge, _signals) = bridge(true);

        assert!(bridge.register("  ", echo).is_err());
        bridge.try_register("echo", echo).expect("first");
        assert!(matches!(
            bridge.try_register("echo", echo),
            Err(Error::DuplicateHandler { .. })
        ));
        assert_eq!(bridge.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_capability_round_trip() {
        let (bridge, signals) = bridge(true);
        let pump = loopback(&bridge, signals);

        bridge
            .register_capability::<GetCity, _>(|city, responder| match responder {
                Some(responder) => responder.respond(&City {
                    name: city.name.to_uppercase(),
                    province: city.province,
                }),
                None => Ok(()),
            })
            .expect("register");

        let query = City {
            name: "beijing".to_string(),
            province: "beijing".to_string(),
        };
        let city = bridge
            .call_capability::<GetCity>(&query)
            .await
            .expect("call");
        assert_eq!(city.name, "BEIJING");

        let reply = bridge
            .call(GetCity::NAME, json!({"wrong": true}))
            .await
            .expect("call");
        assert_eq!(reply["status"], "-1");

        pump.abort();
    }

    #[tokio::test]
    async fn test_capability_without_handler() {
        let (bridge, signals) = bridge(true);
        let pump = loopback(&bridge, signals);

        let query = City {
            name: "beijing".to_string(),
            province: "beijing".to_string(),
        };
        let err = bridge
            .call_capability::<GetCity>(&query)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::HandlerNotFound { ref handler } if handler == "getCity"));
        assert!(err.is_handler_error());

        pump.abort();
    }

    #[tokio::test]
    async fn test_capability_remote_failure() {
        let (bridge, signals) = bridge(true);
        let pump = loopback(&bridge, signals);

        bridge
            .register(GetCity::NAME, |_, responder| match responder {
                Some(responder) => responder.fail("unknown city"),
                None => Ok(()),
            })
            .expect("register");

        let query = City {
            name: "atlantis".to_string(),
            province: "sea".to_string(),
        };
        let err = bridge
            .call_capability::<GetCity>(&query)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote { .. }));
        assert!(err.to_string().contains("unknown city"));

        pump.abort();
    }
}

//! Message router.
//!
//! Drives each inbound message to a terminal state and builds outbound
//! requests.
//!
//! # Inbound State Machine
//!
//! ```text
//! Decoded ─► Response ─► resolve(responseId) ─► done (orphan: logged)
//!        └─► Request ─┬─► handler found ─► handler(params, responder?)
//!                     └─► handler missing ─► error reply iff callbackId
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `responder` | One-shot reply handles |

// ============================================================================
// Submodules
// ============================================================================

/// Reply handles given to handlers.
pub mod responder;

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;
use crate::protocol::{Message, Request, Response, ResponseStatus};
use crate::registry::{CallbackRegistry, HandlerRegistry};
use crate::transport::Transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use responder::{Responder, TypedResponder};

// ============================================================================
// Router
// ============================================================================

/// Classifies inbound messages and drives the request/response lifecycle.
///
/// Cheap to clone; all state is shared.
#[derive(Debug, Clone)]
pub struct Router {
    transport: Arc<Transport>,
    callbacks: Arc<CallbackRegistry>,
    handlers: Arc<HandlerRegistry>,
    usable: Arc<AtomicBool>,
}

impl Router {
    /// Creates a router over shared bridge state.
    #[must_use]
    pub fn new(
        transport: Arc<Transport>,
        callbacks: Arc<CallbackRegistry>,
        handlers: Arc<HandlerRegistry>,
        usable: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            callbacks,
            handlers,
            usable,
        }
    }

    /// Returns `true` once the bridge may send requests.
    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.usable.load(Ordering::Acquire)
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Routes one decoded message to completion.
    ///
    /// Never fails: faults are logged and, where a caller is waiting,
    /// answered with a failure status.
    pub fn route(&self, message: Message) {
        match message {
            Message::Response(response) => self.handle_response(response),
            Message::Request(request) => self.handle_request(request),
        }
    }

    fn handle_response(&self, response: Response) {
        let Response { response_id, data } = response;

        let resolved = catch_unwind(AssertUnwindSafe(|| {
            self.callbacks.resolve(&response_id, data)
        }));

        match resolved {
            Ok(true) => trace!(callback_id = %response_id, "Callback resolved"),
            Ok(false) => {
                if self.transport.is_debug() {
                    warn!(callback_id = %response_id, "Response for unknown callback");
                }
            }
            Err(panic) => {
                warn!(
                    callback_id = %response_id,
                    error = %panic_message(panic.as_ref()),
                    "Result callback panicked"
                );
            }
        }
    }

    fn handle_request(&self, request: Request) {
        let Request {
            handler_name,
            params,
            callback_id,
        } = request;

        let Some(handler) = self.handlers.lookup(&handler_name) else {
            match callback_id {
                Some(id) => {
                    debug!(handler = %handler_name, callback_id = %id, "Handler not found");
                    self.reply(id, ResponseStatus::handler_not_found(&handler_name));
                }
                None => {
                    if self.transport.is_debug() {
                        debug!(handler = %handler_name, "Handler not found, dropping request");
                    }
                }
            }
            return;
        };

        let answered = Arc::new(AtomicBool::new(false));
        let responder = callback_id.clone().map(|id| {
            Responder::new(id, Arc::clone(&self.transport), Arc::clone(&answered))
        });

        let fault = match catch_unwind(AssertUnwindSafe(|| handler(params, responder))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(handler = %handler_name, error = %fault, "Handler failed");

        // A responder still alive was moved out of the handler and owns the reply.
        if let Some(id) = callback_id
            && Arc::strong_count(&answered) == 1
            && !answered.load(Ordering::Acquire)
        {
            let fault = Error::handler_fault(&handler_name, fault);
            self.reply(id, ResponseStatus::failed(fault.to_string()));
        }
    }

    /// Sends a bridge-generated reply.
    fn reply(&self, id: CallbackId, status: ResponseStatus) {
        let message: Message = Response::new(id, status.into()).into();
        if let Err(e) = self.transport.send(&message) {
            warn!(error = %e, "Failed to send error reply");
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Sends a request and parks `on_result` until the reply arrives.
    ///
    /// If the bridge is not usable yet, `on_result` runs immediately with the
    /// unavailable status and nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the request cannot be sent; the
    /// pending entry is dropped and `on_result` never runs.
    pub fn invoke<F>(&self, handler_name: &str, params: Value, on_result: F) -> Result<()>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        if !self.is_usable() {
            debug!(handler = %handler_name, "Bridge not usable, answering locally");
            on_result(ResponseStatus::unavailable().into());
            return Ok(());
        }

        let id = self.callbacks.allocate(on_result);
        self.send_request(handler_name, params, id)
    }

    /// Sends a request whose reply completes the returned channel.
    ///
    /// # Errors
    ///
    /// - [`Error::BridgeUnavailable`] if the bridge is not usable yet
    /// - the transport's error if the request cannot be sent
    pub fn call(
        &self,
        handler_name: &str,
        params: Value,
    ) -> Result<(CallbackId, oneshot::Receiver<Value>)> {
        if !self.is_usable() {
            return Err(Error::BridgeUnavailable);
        }

        let (id, rx) = self.callbacks.allocate_channel();
        self.send_request(handler_name, params, id.clone())?;
        Ok((id, rx))
    }

    /// Sends a request that expects no reply.
    ///
    /// # Errors
    ///
    /// - [`Error::BridgeUnavailable`] if the bridge is not usable yet
    /// - the transport's error if the request cannot be sent
    pub fn notify(&self, handler_name: &str, params: Value) -> Result<()> {
        if !self.is_usable() {
            return Err(Error::BridgeUnavailable);
        }

        self.transport
            .send(&Request::new(handler_name, params).into())
    }

    fn send_request(&self, handler_name: &str, params: Value, id: CallbackId) -> Result<()> {
        let request = Request::new(handler_name, params).with_callback(id.clone());

        if let Err(e) = self.transport.send(&request.into()) {
            self.callbacks.cancel(&id);
            return Err(e);
        }

        trace!(handler = %handler_name, callback_id = %id, "Request sent");
        Ok(())
    }
}

/// Best-effort text of a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
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
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::identifiers::HandlerName;
    use crate::protocol::FieldNames;
    use crate::transport::{ChannelSink, ProtocolConfig};

    struct Fixture {
        router: Router,
        handlers: Arc<HandlerRegistry>,
        callbacks: Arc<CallbackRegistry>,
        signals: UnboundedReceiver<String>,
    }

    impl Fixture {
        fn new(usable: bool) -> Self {
            let (sink, signals) = ChannelSink::new();
            let transport = Arc::new(Transport::new(
                Arc::new(sink),
                ProtocolConfig::new("jsbridge", "native"),
                FieldNames::default(),
                true,
            ));
            let handlers = Arc::new(HandlerRegistry::new());
            let callbacks = Arc::new(CallbackRegistry::new());
            let router = Router::new(
                transport,
                Arc::clone(&callbacks),
                Arc::clone(&handlers),
                Arc::new(AtomicBool::new(usable)),
            );

            Self {
                router,
                handlers,
                callbacks,
                signals,
            }
        }

        fn register<F>(&self, name: &str, handler: F)
        where
            F: Fn(Value, Option<Responder>) -> Result<()> + Send + Sync + 'static,
        {
            let name = HandlerName::new(name).expect("valid name");
            self.handlers.register(name, Arc::new(handler));
        }

        /// Pops the next emitted message as JSON.
        fn next_sent(&mut self) -> Option<Value> {
            let signal = self.signals.try_recv().ok()?;
            let json = signal.strip_prefix("jsbridge://native?")?;
            serde_json::from_str(json).ok()
        }
    }

    fn request(name: &str, params: Value, callback: Option<&str>) -> Message {
        let request = Request::new(name, params);
        match callback {
            Some(id) => request.with_callback(CallbackId::from(id)).into(),
            None => request.into(),
        }
    }

    #[test]
    fn test_missing_handler_without_callback_is_dropped() {
        let mut fixture = Fixture::new(true);

        fixture.router.route(request("nope", json!({}), None));

        assert!(fixture.next_sent().is_none());
    }

    #[test]
    fn test_missing_handler_with_callback_replies_failure() {
        let mut fixture = Fixture::new(true);

        fixture
            .router
            .route(request("nope", json!({}), Some("cb_5_0")));

        let reply = fixture.next_sent().expect("one reply");
        assert_eq!(reply["responseId"], "cb_5_0");
        assert_eq!(reply["data"]["status"], "-1");
        assert!(reply["data"]["msg"].as_str().expect("msg").contains("nope"));
        assert!(fixture.next_sent().is_none());
    }

    #[test]
    fn test_responder_present_iff_callback_id() {
        let fixture = Fixture::new(true);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        fixture.register("exam", move |_, responder| {
            seen_clone.lock().push(responder.is_some());
            Ok(())
        });

        fixture.router.route(request("exam", json!(1), None));
        fixture.router.route(request("exam", json!(2), Some("cb_1_0")));

        assert_eq!(*seen.lock(), vec![false, true]);
    }

    #[test]
    fn test_handler_reply_routed_back() {
        let mut fixture = Fixture::new(true);
        fixture.register("echo", |params, responder| match responder {
            Some(responder) => responder.respond(params),
            None => Ok(()),
        });

        fixture
            .router
            .route(request("echo", json!({"a": 1}), Some("cb_2_0")));

        assert_eq!(
            fixture.next_sent(),
            Some(json!({"responseId": "cb_2_0", "data": {"a": 1}}))
        );
    }

    #[test]
    fn test_fire_and_forget_handler_sends_nothing() {
        let mut fixture = Fixture::new(true);
        fixture.register("silent", |_, _| Ok(()));

        fixture
            .router
            .route(request("silent", json!(null), Some("cb_3_0")));

        assert!(fixture.next_sent().is_none());
    }

    #[test]
    fn test_reregistration_invokes_latest() {
        let fixture = Fixture::new(true);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        fixture.register("x", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let counter = Arc::clone(&second);
        fixture.register("x", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        fixture.router.route(request("x", json!(null), None));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_handler_replies_failure() {
        let mut fixture = Fixture::new(true);
        fixture.register("broken", |_, _| Err(Error::config("nope")));

        fixture
            .router
            .route(request("broken", json!(null), Some("cb_4_0")));

        let reply = fixture.next_sent().expect("failure reply");
        assert_eq!(reply["data"]["status"], "-1");
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let mut fixture = Fixture::new(true);
        fixture.register("panics", |_, _| panic!("kaboom"));
        fixture.register("fine", |_, responder| match responder {
            Some(responder) => responder.ok(json!({})),
            None => Ok(()),
        });

        fixture
            .router
            .route(request("panics", json!(null), Some("cb_6_0")));
        fixture
            .router
            .route(request("fine", json!(null), Some("cb_7_0")));

        let first = fixture.next_sent().expect("failure reply");
        assert!(first["data"]["msg"].as_str().expect("msg").contains("kaboom"));

        let second = fixture.next_sent().expect("normal reply");
        assert_eq!(second["data"]["status"], "1");
    }

    #[test]
    fn test_fault_after_reply_sends_nothing_more() {
        let mut fixture = Fixture::new(true);
        fixture.register("late", |_, responder| {
            if let Some(responder) = responder {
                responder.ok(json!({}))?;
            }
            Err(Error::config("after the fact"))
        });

        fixture
            .router
            .route(request("late", json!(null), Some("cb_8_0")));

        assert!(fixture.next_sent().is_some());
        assert!(fixture.next_sent().is_none());
    }

    #[test]
    fn test_handler_name_matched_exactly() {
        let mut fixture = Fixture::new(true);
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        fixture.register("exam ", move |_, responder| {
            counter.fetch_add(1, Ordering::SeqCst);
            match responder {
                Some(responder) => responder.ok(json!({})),
                None => Ok(()),
            }
        });

        fixture
            .router
            .route(request("exam ", json!(null), Some("cb_10_0")));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let reply = fixture.next_sent().expect("reply");
        assert_eq!(reply["responseId"], "cb_10_0");
        assert_eq!(reply["data"]["status"], "1");

        fixture
            .router
            .route(request("exam", json!(null), Some("cb_11_0")));
        let reply = fixture.next_sent().expect("not-found reply");
        assert_eq!(reply["data"]["status"], "-1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fault_with_deferred_responder_sends_single_reply() {
        let mut fixture = Fixture::new(true);
        let parked: Arc<Mutex<Option<Responder>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&parked);
        fixture.register("deferred", move |_, responder| {
            *slot.lock() = responder;
            Err(Error::config("answered later"))
        });

        fixture
            .router
            .route(request("deferred", json!(null), Some("cb_12_0")));
        assert!(fixture.next_sent().is_none());

        let responder = parked.lock().take().expect("parked responder");
        responder.respond(json!({"late": true})).expect("respond");

        assert_eq!(
            fixture.next_sent(),
            Some(json!({"responseId": "cb_12_0", "data": {"late": true}}))
        );
        assert!(fixture.next_sent().is_none());
    }

    #[test]
    fn test_fault_after_dropping_responder_replies_failure() {
        let mut fixture = Fixture::new(true);
        fixture.register("drops", |_, responder| {
            drop(responder);
            Err(Error::config("gave up"))
        });

        fixture
            .router
            .route(request("drops", json!(null), Some("cb_13_0")));

        let reply = fixture.next_sent().expect("failure reply");
        assert_eq!(reply["data"]["status"], "-1");
        assert!(reply["data"]["msg"].as_str().expect("msg").contains("gave up"));
    }

    #[test]
    fn test_response_resolves_callback_once() {
        let fixture = Fixture::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = fixture.callbacks.allocate(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let response = Message::Response(Response::new(id, json!({})));
        fixture.router.route(response.clone());
        fixture.router.route(response);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_when_unusable_answers_synchronously() {
        let mut fixture = Fixture::new(false);
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = Arc::clone(&seen);
        fixture
            .router
            .invoke("test", json!({}), move |payload| {
                *seen_clone.lock() = Some(payload);
            })
            .expect("invoke");

        let payload = seen.lock().take().expect("called synchronously");
        assert_eq!(payload["status"], "-1");
        assert!(fixture.next_sent().is_none());
        assert_eq!(fixture.callbacks.pending_count(), 0);
    }

    #[test]
    fn test_invoke_sends_request() {
        let mut fixture = Fixture::new(true);

        fixture
            .router
            .invoke("test", json!({"msg": "hi"}), |_| {})
            .expect("invoke");

        let sent = fixture.next_sent().expect("request");
        assert_eq!(sent["handlerName"], "test");
        assert_eq!(sent["params"], json!({"msg": "hi"}));

        let id = CallbackId::from(sent["callbackId"].as_str().expect("callback id"));
        assert!(fixture.callbacks.is_pending(&id));
    }

    #[test]
    fn test_invoke_config_error_drops_entry() {
        let fixture = Fixture::new(true);
        fixture.router.transport.set_protocol(ProtocolConfig::default());

        let err = fixture
            .router
            .invoke("test", json!({}), |_| panic!("never resolved"))
            .unwrap_err();

        assert!(err.is_config_error());
        assert_eq!(fixture.callbacks.pending_count(), 0);
    }

    #[test]
    fn test_call_requires_usable() {
        let fixture = Fixture::new(false);
        assert!(matches!(
            fixture.router.call("test", json!({})),
            Err(Error::BridgeUnavailable)
        ));
        assert!(matches!(
            fixture.router.notify("test", json!({})),
            Err(Error::BridgeUnavailable)
        ));
    }

    #[test]
    fn test_notify_omits_callback_id() {
        let mut fixture = Fixture::new(true);
        fixture.router.notify("log", json!("hello")).expect("notify");

        let sent = fixture.next_sent().expect("request");
        assert!(sent.get("callbackId").is_none());
    }
}

//! Event dispatcher.
//!
//! Routes one event to every subscribed handler across all registrations,
//! strictly sequentially, applying the per-event-type short-circuit rules.
//! Handler failures are isolated: they are recorded and dispatch moves on
//! to the next handler.

use metrics::counter;
use serde_json::Value;
use tracing::debug;

use tether_core::descriptors::DispatchFailure;

use crate::context::ExtensionContext;
use crate::registry::ExtensionRegistry;
use crate::types::{EventKind, field_is_truthy, is_truthy};

/// What one dispatch produced.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Running result set by handlers of the special event types; `None`
    /// when no handler set one (serialized as `null` on the wire).
    pub result: Option<Value>,
    /// Per-handler failures collected along the way.
    pub errors: Vec<DispatchFailure>,
}

/// Dispatch one event to all matching handlers.
///
/// Registrations run in registry order; within a registration, handlers for
/// the event type run in registration order. Each handler is awaited before
/// the next starts, so the `cancel`/`block` short-circuits are
/// deterministic. One context, built by the caller, is shared across every
/// handler invocation of this dispatch.
pub async fn dispatch(
    registry: &ExtensionRegistry,
    event: &Value,
    context: &ExtensionContext,
) -> DispatchOutcome {
    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let kind = EventKind::from_type(event_type);
    let mut outcome = DispatchOutcome::default();

    for registration in registry.registrations() {
        for handler in registration.handlers_for(event_type) {
            match handler.handle(event, context).await {
                Ok(returned) => {
                    if !kind.collects_result() {
                        continue;
                    }
                    // Only truthy returns feed the running result.
                    let Some(value) = returned.filter(is_truthy) else {
                        continue;
                    };
                    if let Some(field) = kind.halt_field() {
                        if field_is_truthy(&value, field) {
                            debug!(
                                event_type,
                                extension = %registration.path(),
                                field,
                                "Dispatch halted by handler result"
                            );
                            outcome.result = Some(value);
                            return outcome;
                        }
                    }
                    outcome.result = Some(value);
                }
                Err(error) => {
                    counter!("tether_handler_errors_total").increment(1);
                    debug!(
                        event_type,
                        extension = %registration.path(),
                        error = %error,
                        "Handler failed; continuing dispatch"
                    );
                    outcome.errors.push(DispatchFailure {
                        extension_path: registration.path().to_string(),
                        event: event_type.to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::api::ExtensionApi;
    use crate::errors::HandlerError;
    use crate::handler::handler_fn;

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn logging_handler(log: &CallLog, name: &str, returned: Option<Value>) -> Arc<dyn crate::handler::EventHandler> {
        let log = Arc::clone(log);
        let name = name.to_string();
        handler_fn(move |_event| {
            log.lock().push(name.clone());
            Ok(returned.clone())
        })
    }

    fn failing_handler(message: &str) -> Arc<dyn crate::handler::EventHandler> {
        let message = message.to_string();
        handler_fn(move |_event| Err(HandlerError::failed(message.clone())))
    }

    fn make_context() -> ExtensionContext {
        ExtensionContext::from_payload(None, Path::new("/work"))
    }

    #[tokio::test]
    async fn test_handlers_run_in_registry_then_registration_order() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on("context", logging_handler(&log, "a1", None));
        a.on("context", logging_handler(&log, "a2", None));
        registry.insert(a.finish());
        let mut b = ExtensionApi::new("/ext/b.js");
        b.on("context", logging_handler(&log, "b1", None));
        registry.insert(b.finish());

        let outcome = dispatch(&registry, &json!({"type": "context"}), &make_context()).await;
        assert!(outcome.result.is_none());
        assert!(outcome.errors.is_empty());
        assert_eq!(*log.lock(), vec!["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_dispatch() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on("session_start", failing_handler("a exploded"));
        registry.insert(a.finish());
        let mut b = ExtensionApi::new("/ext/b.js");
        b.on("session_start", logging_handler(&log, "b", None));
        registry.insert(b.finish());

        let outcome = dispatch(&registry, &json!({"type": "session_start"}), &make_context()).await;
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].extension_path, "/ext/a.js");
        assert_eq!(outcome.errors[0].event, "session_start");
        assert_eq!(outcome.errors[0].error, "a exploded");
        assert_eq!(*log.lock(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_before_compact_cancel_halts_dispatch() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on("session_before_compact", failing_handler("early failure"));
        a.on(
            "session_before_compact",
            logging_handler(&log, "canceller", Some(json!({"cancel": true}))),
        );
        registry.insert(a.finish());
        let mut b = ExtensionApi::new("/ext/b.js");
        b.on("session_before_compact", logging_handler(&log, "late", None));
        registry.insert(b.finish());

        let outcome = dispatch(
            &registry,
            &json!({"type": "session_before_compact"}),
            &make_context(),
        )
        .await;
        assert_eq!(outcome.result, Some(json!({"cancel": true})));
        // Second extension's handler never ran.
        assert_eq!(*log.lock(), vec!["canceller"]);
        // Errors collected before the halt are still reported.
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].error, "early failure");
    }

    #[tokio::test]
    async fn test_tool_call_block_halts_dispatch() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on(
            "tool_call",
            logging_handler(&log, "blocker", Some(json!({"block": true, "reason": "unsafe"}))),
        );
        registry.insert(a.finish());
        let mut b = ExtensionApi::new("/ext/b.js");
        b.on("tool_call", logging_handler(&log, "late", None));
        registry.insert(b.finish());

        let outcome = dispatch(&registry, &json!({"type": "tool_call"}), &make_context()).await;
        assert_eq!(outcome.result, Some(json!({"block": true, "reason": "unsafe"})));
        assert_eq!(*log.lock(), vec!["blocker"]);
    }

    #[tokio::test]
    async fn test_tool_call_falsy_block_does_not_halt() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on(
            "tool_call",
            logging_handler(&log, "first", Some(json!({"block": false}))),
        );
        a.on("tool_call", logging_handler(&log, "second", None));
        registry.insert(a.finish());

        let outcome = dispatch(&registry, &json!({"type": "tool_call"}), &make_context()).await;
        assert_eq!(outcome.result, Some(json!({"block": false})));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_tool_result_last_value_wins_never_halts() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on(
            "tool_result",
            logging_handler(&log, "first", Some(json!({"output": "one"}))),
        );
        registry.insert(a.finish());
        let mut b = ExtensionApi::new("/ext/b.js");
        b.on(
            "tool_result",
            logging_handler(&log, "second", Some(json!({"output": "two"}))),
        );
        registry.insert(b.finish());

        let outcome = dispatch(&registry, &json!({"type": "tool_result"}), &make_context()).await;
        assert_eq!(outcome.result, Some(json!({"output": "two"})));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_other_event_types_ignore_returns() {
        let mut registry = ExtensionRegistry::new();
        let mut a = ExtensionApi::new("/ext/a.js");
        a.on(
            "session_start",
            handler_fn(|_event| Ok(Some(json!({"cancel": true})))),
        );
        registry.insert(a.finish());

        let outcome = dispatch(&registry, &json!({"type": "session_start"}), &make_context()).await;
        assert!(outcome.result.is_none());
    }

    #[tokio::test]
    async fn test_event_without_matching_handlers() {
        let registry = ExtensionRegistry::new();
        let outcome = dispatch(&registry, &json!({"type": "anything"}), &make_context()).await;
        assert!(outcome.result.is_none());
        assert!(outcome.errors.is_empty());
    }
}

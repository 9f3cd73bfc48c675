//! Event handler trait.
//!
//! Extensions subscribe handlers to event types via
//! [`ExtensionApi::on`](crate::api::ExtensionApi::on); the dispatcher runs
//! them strictly sequentially in registration order.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExtensionContext;
use crate::errors::HandlerError;

/// A subscribed event handler.
///
/// Handlers receive the full event object and the per-dispatch context.
/// The return value only matters for the event types with special result
/// semantics (`session_before_compact`, `tool_call`, `tool_result`); for
/// everything else it is ignored.
///
/// Errors are caught by the dispatcher, recorded per handler, and do not
/// stop dispatch of subsequent handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. `None` leaves the running dispatch result as is.
    async fn handle(
        &self,
        event: &Value,
        context: &ExtensionContext,
    ) -> Result<Option<Value>, HandlerError>;
}

/// Blanket impl so tests and built-in extensions can subscribe closures.
#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&Value) -> Result<Option<Value>, HandlerError> + Send + Sync,
{
    async fn handle(
        &self,
        event: &Value,
        _context: &ExtensionContext,
    ) -> Result<Option<Value>, HandlerError> {
        self(event)
    }
}

/// Wrap a synchronous closure as a handler.
///
/// Convenient for built-in extensions and tests; process-backed extensions
/// implement [`EventHandler`] directly.
pub fn handler_fn<F>(f: F) -> std::sync::Arc<dyn EventHandler>
where
    F: Fn(&Value) -> Result<Option<Value>, HandlerError> + Send + Sync + 'static,
{
    std::sync::Arc::new(f)
}

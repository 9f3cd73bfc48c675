//! Tool invoker.
//!
//! Looks a tool up in the registry's merged table and executes it with a
//! fresh context and a fresh (inert) cancellation token. Failures of every
//! kind come back as data; nothing here can take the host down.

use std::path::Path;

use metrics::counter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tether_core::context::ContextPayload;

use crate::context::ExtensionContext;
use crate::registry::ExtensionRegistry;

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    /// The tool ran to completion. `None` serializes as `null`.
    Success(Option<Value>),
    /// The tool was missing or its execution failed.
    Failure(String),
}

/// Invoke a registered tool by name.
///
/// An unknown name (and a definition with no executable, which the merge
/// never produces but callers cannot tell apart) reports
/// `Tool <name> not found`. The context and cancellation token are fresh
/// per call; the token never fires in this headless host.
pub async fn invoke(
    registry: &ExtensionRegistry,
    name: &str,
    tool_call_id: &str,
    input: Option<Value>,
    payload: Option<&ContextPayload>,
    default_cwd: &Path,
) -> InvokeOutcome {
    counter!("tether_tool_invocations_total").increment(1);

    let Some(merged) = registry.lookup_tool(name) else {
        counter!("tether_tool_failures_total").increment(1);
        return InvokeOutcome::Failure(format!("Tool {name} not found"));
    };

    debug!(
        tool = name,
        tool_call_id,
        extension = %merged.extension_path,
        "Invoking tool"
    );

    let context = ExtensionContext::from_payload(payload, default_cwd);
    let input = input.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let cancel = CancellationToken::new();

    match merged
        .handler
        .execute(tool_call_id, input, &context, cancel)
        .await
    {
        Ok(result) => InvokeOutcome::Success(Some(result)),
        Err(error) => {
            counter!("tether_tool_failures_total").increment(1);
            InvokeOutcome::Failure(error.to_string())
        }
    }
}

//! Executable tool trait.
//!
//! The executable half of a registered tool. The public
//! [`ToolDescriptor`](tether_core::descriptors::ToolDescriptor) is what the
//! caller sees; implementations of this trait are what the invoker runs.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::context::ExtensionContext;
use crate::errors::ToolError;

/// An executable tool definition.
///
/// `cancel` is a fresh token constructed per invocation. In this headless
/// host it never fires; it exists so implementations written against it
/// work unchanged under a host that does cancel.
#[async_trait]
pub trait ExtensionTool: Send + Sync {
    /// Execute the tool.
    ///
    /// `input` is the caller's input or an empty object when none was sent.
    /// An `Err` becomes a failed invocation result; it never crashes the
    /// host.
    async fn execute(
        &self,
        tool_call_id: &str,
        input: Value,
        context: &ExtensionContext,
        cancel: CancellationToken,
    ) -> Result<Value, ToolError>;
}

//! Core types for event classification and result interpretation.
//!
//! Event types on the wire are free-form strings; only three of them carry
//! special result semantics during dispatch. Everything else is routed by
//! name with handler returns ignored.

use serde_json::Value;

/// Event type name whose handlers can cancel the operation.
pub const SESSION_BEFORE_COMPACT: &str = "session_before_compact";

/// Event type name whose handlers can block the tool call.
pub const TOOL_CALL: &str = "tool_call";

/// Event type name whose handlers can rewrite the tool result.
pub const TOOL_RESULT: &str = "tool_result";

/// Shortcuts the host keeps for itself. Registering one logs a warning.
pub const RESERVED_SHORTCUTS: &[&str] = &["ctrl+c", "ctrl+d"];

/// Dispatch semantics for an event type.
///
/// Classifies how handler return values feed the running dispatch result
/// and whether a result field can halt dispatch early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `session_before_compact`: result accumulates; `cancel` halts.
    SessionBeforeCompact,
    /// `tool_call`: result accumulates; `block` halts.
    ToolCall,
    /// `tool_result`: result accumulates; never halts.
    ToolResult,
    /// Any other event type: handler returns are ignored.
    Other,
}

impl EventKind {
    /// Classify an event type name.
    #[must_use]
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            SESSION_BEFORE_COMPACT => Self::SessionBeforeCompact,
            TOOL_CALL => Self::ToolCall,
            TOOL_RESULT => Self::ToolResult,
            _ => Self::Other,
        }
    }

    /// Whether handler return values become the running dispatch result.
    #[must_use]
    pub fn collects_result(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// The result field that halts dispatch when truthy, if any.
    #[must_use]
    pub fn halt_field(self) -> Option<&'static str> {
        match self {
            Self::SessionBeforeCompact => Some("cancel"),
            Self::ToolCall => Some("block"),
            Self::ToolResult | Self::Other => None,
        }
    }
}

/// JSON truthiness: `null`, `false`, `0`, and `""` are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
    }
}

/// Whether `field` on an object result is truthy.
#[must_use]
pub fn field_is_truthy(result: &Value, field: &str) -> bool {
    result.get(field).is_some_and(is_truthy)
}

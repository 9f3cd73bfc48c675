//! Per-call context payloads.
//!
//! `invoke_tool` and `emit` requests may carry a snapshot of session state.
//! The payload is read-mostly input to the context factory; nothing in it is
//! retained past the call it arrived with.

use serde::{Deserialize, Serialize};

/// Session state attached to an `invoke_tool` or `emit` request.
///
/// Every field is optional; absent fields fall back to headless defaults
/// when the context is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPayload {
    /// Working directory for the call. Defaults to the host process cwd.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Whether the caller has an interactive UI available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_ui: Option<bool>,
    /// Whether the caller's session is idle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_idle: Option<bool>,
    /// Whether the caller has queued messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_pending_messages: Option<bool>,
    /// Active model identifier, passed through verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<serde_json::Value>,
    /// Session transcript entries, opaque to this process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_entries: Option<Vec<serde_json::Value>>,
}

//! Request and response records for the line protocol.
//!
//! One JSON record per line in both directions. Requests are discriminated
//! by a `type` field; the router parses the envelope loosely (so that the
//! correlation `id` can be echoed even for unknown types) and then
//! deserializes the typed payloads defined here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ContextPayload;
use crate::descriptors::{DispatchFailure, LoadFailure, RegistrationSummary};

/// Literal error message for an unparseable input line.
pub const INVALID_JSON: &str = "Invalid JSON";

/// Literal error message for an unrecognized `type` value.
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

/// Payload of an `init` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitRequest {
    /// Extension source paths to load, in order.
    pub extensions: Vec<String>,
}

/// Payload of a `set_flags` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetFlagsRequest {
    /// Global flag-name to value map. Absent or empty is a no-op.
    #[serde(default)]
    pub flags: HashMap<String, Value>,
}

/// Payload of an `invoke_tool` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeToolRequest {
    /// Tool name to look up in the merged tool table.
    pub name: String,
    /// Caller-assigned ID for this tool call.
    pub tool_call_id: String,
    /// Tool input. Absent input is passed through as an empty object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Session state for the call's context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextPayload>,
}

/// Payload of an `emit` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitRequest {
    /// Event object. Must carry a string `type` field.
    pub event: Value,
    /// Session state for the dispatch context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextPayload>,
}

/// Failure lists carried by responses.
///
/// `init` responses carry load failures; `emit` responses carry dispatch
/// failures. Both serialize under the same `errors` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseErrors {
    /// Per-extension load failures from `init`.
    Load(Vec<LoadFailure>),
    /// Per-handler failures from an `emit` dispatch.
    Dispatch(Vec<DispatchFailure>),
}

/// One response record, written as a single line.
///
/// The `id` mirrors the request exactly: present values (including JSON
/// `null`) are echoed verbatim, and an absent `id` stays absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation ID echoed from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Whether the request was handled successfully.
    pub ok: bool,
    /// Failure message when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result value for `invoke_tool` and `emit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Sanitized registrations for `init`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<RegistrationSummary>>,
    /// Collected failures for `init` and `emit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ResponseErrors>,
}

impl Response {
    /// Bare success (used by `set_flags`).
    #[must_use]
    pub fn success(id: Option<Value>) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            result: None,
            extensions: None,
            errors: None,
        }
    }

    /// Per-message failure with the request's `id` echoed.
    #[must_use]
    pub fn failure(id: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            error: Some(error.into()),
            result: None,
            extensions: None,
            errors: None,
        }
    }

    /// Response to an unparseable line: `id` is the literal JSON `null`.
    #[must_use]
    pub fn invalid_json() -> Self {
        Self::failure(Some(Value::Null), INVALID_JSON)
    }

    /// Response to an unrecognized `type`.
    #[must_use]
    pub fn unknown_type(id: Option<Value>) -> Self {
        Self::failure(id, UNKNOWN_MESSAGE_TYPE)
    }

    /// `init` response. Always `ok: true`; failures travel in `errors`.
    #[must_use]
    pub fn init(
        id: Option<Value>,
        extensions: Vec<RegistrationSummary>,
        errors: Vec<LoadFailure>,
    ) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            result: None,
            extensions: Some(extensions),
            errors: Some(ResponseErrors::Load(errors)),
        }
    }

    /// Successful `invoke_tool` response. A missing result becomes `null`.
    #[must_use]
    pub fn tool_result(id: Option<Value>, result: Option<Value>) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            result: Some(result.unwrap_or(Value::Null)),
            extensions: None,
            errors: None,
        }
    }

    /// `emit` response. A dispatch that set no result serializes `null`.
    #[must_use]
    pub fn emit(id: Option<Value>, result: Option<Value>, errors: Vec<DispatchFailure>) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            result: Some(result.unwrap_or(Value::Null)),
            extensions: None,
            errors: Some(ResponseErrors::Dispatch(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_response_shape() {
        let json = serde_json::to_value(Response::invalid_json()).unwrap();
        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], INVALID_JSON);
    }

    #[test]
    fn test_absent_id_stays_absent() {
        let json = serde_json::to_value(Response::success(None)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["ok"], true);
    }

    #[test]
    fn test_non_string_id_echoed_verbatim() {
        let response = Response::success(Some(serde_json::json!(42)));
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["id"], 42);
    }

    #[test]
    fn test_tool_result_normalizes_missing_to_null() {
        let json = serde_json::to_value(Response::tool_result(None, None)).unwrap();
        assert_eq!(json["result"], Value::Null);
    }

    #[test]
    fn test_emit_response_carries_dispatch_failures() {
        let failures = vec![DispatchFailure {
            extension_path: "/ext/a.js".to_string(),
            event: "tool_call".to_string(),
            error: "boom".to_string(),
        }];
        let json = serde_json::to_value(Response::emit(None, None, failures)).unwrap();
        assert_eq!(json["errors"][0]["extensionPath"], "/ext/a.js");
        assert_eq!(json["result"], Value::Null);
    }

    #[test]
    fn test_init_response_always_ok() {
        let errors = vec![LoadFailure {
            extension_path: "/ext/broken.js".to_string(),
            error: "no entry".to_string(),
        }];
        let json = serde_json::to_value(Response::init(None, vec![], errors)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["extensions"], serde_json::json!([]));
        assert_eq!(json["errors"][0]["error"], "no entry");
    }

    #[test]
    fn test_invoke_tool_request_camel_case() {
        let request: InvokeToolRequest = serde_json::from_str(
            r#"{"name":"lint","toolCallId":"tc1","input":{"file":"x.rs"}}"#,
        )
        .unwrap();
        assert_eq!(request.name, "lint");
        assert_eq!(request.tool_call_id, "tc1");
        assert!(request.context.is_none());
    }

    #[test]
    fn test_set_flags_request_defaults_empty() {
        let request: SetFlagsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.flags.is_empty());
    }
}

//! Descriptor shapes extensions declare at registration time.
//!
//! These are the public, serializable halves of what an extension
//! contributes. Executable tool definitions and event handlers are held
//! separately by the registry and are never serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Public descriptor for a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name used for lookup. Required, non-empty.
    pub name: String,
    /// Short display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for the tool's input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl ToolDescriptor {
    /// Create a descriptor with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            parameters: None,
        }
    }
}

/// Public descriptor for a registered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    /// Command name. Required, non-empty.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Public descriptor for a registered flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDescriptor {
    /// Flag name, scoped to the declaring extension. Required, non-empty.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared value type (e.g. `"boolean"`, `"string"`). Informational.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub flag_type: Option<String>,
    /// Default value, seeded into the flag store at registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FlagDescriptor {
    /// Create a descriptor with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            flag_type: None,
            default: None,
        }
    }

    /// Attach a default value.
    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Public descriptor for a registered keyboard shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDescriptor {
    /// Key chord (e.g. `"ctrl+e"`). Required, non-empty.
    pub shortcut: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Public descriptor for a registered message renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRendererDescriptor {
    /// Custom message type this renderer handles. Required, non-empty.
    pub custom_type: String,
}

/// Sanitized view of a loaded extension, serialized in `init` responses.
///
/// Exposes only declarative data; handler and tool implementations stay
/// inside the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    /// Canonical source location of the extension.
    pub path: String,
    /// Declared tools.
    pub tools: Vec<ToolDescriptor>,
    /// Declared commands.
    pub commands: Vec<CommandDescriptor>,
    /// Declared flags.
    pub flags: Vec<FlagDescriptor>,
    /// Declared shortcuts.
    pub shortcuts: Vec<ShortcutDescriptor>,
    /// Declared message renderers.
    pub message_renderers: Vec<MessageRendererDescriptor>,
    /// Event-type name to number of subscribed handlers.
    pub handler_counts: BTreeMap<String, usize>,
}

/// A per-extension load failure collected during `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    /// Path of the extension that failed to load.
    pub extension_path: String,
    /// Failure message.
    pub error: String,
}

/// A per-handler failure collected during an `emit` dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    /// Path of the extension whose handler failed.
    pub extension_path: String,
    /// Event type being dispatched.
    pub event: String,
    /// Failure message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_descriptor_skips_absent_fields() {
        let json = serde_json::to_string(&ToolDescriptor::new("lint")).unwrap();
        assert_eq!(json, r#"{"name":"lint"}"#);
    }

    #[test]
    fn test_flag_descriptor_type_field_renamed() {
        let flag = FlagDescriptor {
            name: "verbose".to_string(),
            description: None,
            flag_type: Some("boolean".to_string()),
            default: Some(serde_json::json!(false)),
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["type"], "boolean");
        assert_eq!(json["default"], false);
    }

    #[test]
    fn test_renderer_descriptor_camel_case() {
        let renderer = MessageRendererDescriptor {
            custom_type: "diff".to_string(),
        };
        let json = serde_json::to_string(&renderer).unwrap();
        assert_eq!(json, r#"{"customType":"diff"}"#);
    }

    #[test]
    fn test_summary_serializes_handler_counts() {
        let mut handler_counts = BTreeMap::new();
        let _ = handler_counts.insert("tool_call".to_string(), 2);
        let summary = RegistrationSummary {
            path: "/ext/a.js".to_string(),
            tools: vec![],
            commands: vec![],
            flags: vec![],
            shortcuts: vec![],
            message_renderers: vec![],
            handler_counts,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["handlerCounts"]["tool_call"], 2);
        assert_eq!(json["messageRenderers"], serde_json::json!([]));
    }

    #[test]
    fn test_load_failure_camel_case() {
        let failure = LoadFailure {
            extension_path: "/ext/broken.js".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["extensionPath"], "/ext/broken.js");
    }

    #[test]
    fn test_dispatch_failure_roundtrip() {
        let failure = DispatchFailure {
            extension_path: "/ext/a.js".to_string(),
            event: "tool_call".to_string(),
            error: "handler exploded".to_string(),
        };
        let json = serde_json::to_string(&failure).unwrap();
        let back: DispatchFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }
}

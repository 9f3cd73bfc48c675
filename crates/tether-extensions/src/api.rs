//! Capability surface handed to extension factories.
//!
//! An [`ExtensionApi`] is created fresh per load, bound to a fresh empty
//! registration. The factory makes its registration calls during its single
//! invocation; the loader then calls [`ExtensionApi::finish`] to freeze the
//! result. Interactive capabilities are stubbed: this host is headless, and
//! anything that would need a terminal either no-ops or fails explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use tether_core::descriptors::{
    CommandDescriptor, FlagDescriptor, MessageRendererDescriptor, ShortcutDescriptor,
    ToolDescriptor,
};

use crate::errors::ApiError;
use crate::handler::EventHandler;
use crate::registration::{FlagSink, FlagValues, Registration};
use crate::tool::ExtensionTool;
use crate::types::RESERVED_SHORTCUTS;

/// The only way an extension can register behavior or read state.
pub struct ExtensionApi {
    registration: Registration,
}

impl ExtensionApi {
    /// Create a surface bound to a fresh empty registration for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            registration: Registration {
                path: path.into(),
                handlers: HashMap::new(),
                tools: Vec::new(),
                tool_handlers: HashMap::new(),
                commands: Vec::new(),
                shortcuts: Vec::new(),
                message_renderers: Vec::new(),
                flags: Vec::new(),
                flag_values: Arc::new(RwLock::new(HashMap::new())),
                flag_sink: None,
            },
        }
    }

    /// Subscribe a handler to an event type.
    ///
    /// Handlers append to the ordered list for that type; registration
    /// order is dispatch order.
    pub fn on(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.registration
            .handlers
            .entry(event_type.into())
            .or_default()
            .push(handler);
    }

    /// Register a tool: the public descriptor plus its executable handler.
    ///
    /// A repeated name within the same extension overwrites the stored
    /// executable; both descriptors stay visible.
    pub fn register_tool(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ExtensionTool>,
    ) -> Result<(), ApiError> {
        if descriptor.name.trim().is_empty() {
            return Err(ApiError::MissingField {
                descriptor: "tool",
                field: "name",
            });
        }
        let _ = self
            .registration
            .tool_handlers
            .insert(descriptor.name.clone(), handler);
        self.registration.tools.push(descriptor);
        Ok(())
    }

    /// Register a command descriptor.
    pub fn register_command(&mut self, descriptor: CommandDescriptor) -> Result<(), ApiError> {
        if descriptor.name.trim().is_empty() {
            return Err(ApiError::MissingField {
                descriptor: "command",
                field: "name",
            });
        }
        self.registration.commands.push(descriptor);
        Ok(())
    }

    /// Register a keyboard shortcut descriptor.
    ///
    /// Reserved chords are accepted but logged; the interactive host keeps
    /// them for itself and will not deliver them.
    pub fn register_shortcut(&mut self, descriptor: ShortcutDescriptor) -> Result<(), ApiError> {
        if descriptor.shortcut.trim().is_empty() {
            return Err(ApiError::MissingField {
                descriptor: "shortcut",
                field: "shortcut",
            });
        }
        if RESERVED_SHORTCUTS.contains(&descriptor.shortcut.to_lowercase().as_str()) {
            warn!(
                extension = %self.registration.path,
                shortcut = %descriptor.shortcut,
                "Extension registered a reserved shortcut"
            );
        }
        self.registration.shortcuts.push(descriptor);
        Ok(())
    }

    /// Register a flag descriptor, seeding its default value.
    ///
    /// The default is seeded only when present and no value for that name
    /// is already set.
    pub fn register_flag(&mut self, descriptor: FlagDescriptor) -> Result<(), ApiError> {
        if descriptor.name.trim().is_empty() {
            return Err(ApiError::MissingField {
                descriptor: "flag",
                field: "name",
            });
        }
        if let Some(default) = &descriptor.default {
            let mut values = self.registration.flag_values.write();
            if !values.contains_key(&descriptor.name) {
                let _ = values.insert(descriptor.name.clone(), default.clone());
            }
        }
        self.registration.flags.push(descriptor);
        Ok(())
    }

    /// Register a message renderer descriptor.
    pub fn register_message_renderer(
        &mut self,
        descriptor: MessageRendererDescriptor,
    ) -> Result<(), ApiError> {
        if descriptor.custom_type.trim().is_empty() {
            return Err(ApiError::MissingField {
                descriptor: "message renderer",
                field: "customType",
            });
        }
        self.registration.message_renderers.push(descriptor);
        Ok(())
    }

    /// Current value of one of this extension's flags.
    #[must_use]
    pub fn get_flag(&self, name: &str) -> Option<Value> {
        self.registration.flag_values.read().get(name).cloned()
    }

    /// Shared handle to this extension's flag store, for handlers that
    /// need current values after load.
    #[must_use]
    pub fn flag_values(&self) -> FlagValues {
        self.registration.flag_values()
    }

    /// Send a message to the user. Headless: no-op.
    pub fn send_message(&self, _message: Value) {}

    /// Tools currently running in the caller. Headless: always empty.
    #[must_use]
    pub fn active_tools(&self) -> Vec<ToolDescriptor> {
        Vec::new()
    }

    /// Run a shell command in the caller's terminal.
    ///
    /// Meaningful only in an interactive host; here it fails explicitly
    /// rather than succeeding with wrong results.
    pub fn exec(&self, _command: &str, _args: &[String]) -> Result<Value, ApiError> {
        Err(ApiError::Unsupported { capability: "exec" })
    }

    pub(crate) fn set_flag_sink(&mut self, sink: Arc<dyn FlagSink>) {
        self.registration.flag_sink = Some(sink);
    }

    /// Freeze the surface into its registration.
    #[must_use]
    pub fn finish(self) -> Registration {
        self.registration
    }
}

impl std::fmt::Debug for ExtensionApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionApi")
            .field("path", &self.registration.path)
            .finish()
    }
}

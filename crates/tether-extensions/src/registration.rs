//! Loaded-extension records.
//!
//! A [`Registration`] is the frozen result of one factory invocation:
//! everything an extension declared, plus its live flag values. It is
//! structurally immutable after load; only flag values mutate, through
//! [`ExtensionRegistry::apply_flags`](crate::registry::ExtensionRegistry::apply_flags).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use tether_core::descriptors::{
    CommandDescriptor, FlagDescriptor, MessageRendererDescriptor, RegistrationSummary,
    ShortcutDescriptor, ToolDescriptor,
};

use crate::handler::EventHandler;
use crate::tool::ExtensionTool;

/// Shared flag store for one extension.
///
/// Shared so handlers created at factory time can keep reading current
/// values after load.
pub type FlagValues = Arc<RwLock<HashMap<String, Value>>>;

/// Receives flag updates after [`apply_flags`] touches a registration.
///
/// Process-backed extensions use this to forward new values to the child;
/// in-process extensions read the shared [`FlagValues`] directly and need
/// no sink.
///
/// [`apply_flags`]: crate::registry::ExtensionRegistry::apply_flags
#[async_trait]
pub trait FlagSink: Send + Sync {
    /// Deliver the updated `(name, value)` pairs this extension declares.
    async fn apply(&self, flags: &HashMap<String, Value>);
}

/// Everything one extension declared when it was loaded.
pub struct Registration {
    pub(crate) path: String,
    pub(crate) handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    pub(crate) tools: Vec<ToolDescriptor>,
    pub(crate) tool_handlers: HashMap<String, Arc<dyn ExtensionTool>>,
    pub(crate) commands: Vec<CommandDescriptor>,
    pub(crate) shortcuts: Vec<ShortcutDescriptor>,
    pub(crate) message_renderers: Vec<MessageRendererDescriptor>,
    pub(crate) flags: Vec<FlagDescriptor>,
    pub(crate) flag_values: FlagValues,
    pub(crate) flag_sink: Option<Arc<dyn FlagSink>>,
}

impl Registration {
    /// Canonical source location; unique key within a process instance.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Handlers subscribed to `event_type`, in registration order.
    #[must_use]
    pub fn handlers_for(&self, event_type: &str) -> &[Arc<dyn EventHandler>] {
        self.handlers.get(event_type).map_or(&[], Vec::as_slice)
    }

    /// Declared tool descriptors, in registration order.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Declared commands, in registration order.
    #[must_use]
    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    /// Declared shortcuts, in registration order.
    #[must_use]
    pub fn shortcuts(&self) -> &[ShortcutDescriptor] {
        &self.shortcuts
    }

    /// Declared flags, in registration order.
    #[must_use]
    pub fn flags(&self) -> &[FlagDescriptor] {
        &self.flags
    }

    /// Whether this extension declares a flag named `name`.
    #[must_use]
    pub fn declares_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f.name == name)
    }

    /// Current value of a flag, if set.
    #[must_use]
    pub fn flag_value(&self, name: &str) -> Option<Value> {
        self.flag_values.read().get(name).cloned()
    }

    /// Shared handle to this extension's flag store.
    #[must_use]
    pub fn flag_values(&self) -> FlagValues {
        Arc::clone(&self.flag_values)
    }

    /// Event-type name to subscribed-handler count.
    #[must_use]
    pub fn handler_counts(&self) -> BTreeMap<String, usize> {
        self.handlers
            .iter()
            .map(|(event_type, handlers)| (event_type.clone(), handlers.len()))
            .collect()
    }

    /// The sanitized view serialized in `init` responses.
    #[must_use]
    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            path: self.path.clone(),
            tools: self.tools.clone(),
            commands: self.commands.clone(),
            flags: self.flags.clone(),
            shortcuts: self.shortcuts.clone(),
            message_renderers: self.message_renderers.clone(),
            handler_counts: self.handler_counts(),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("path", &self.path)
            .field("handler_counts", &self.handler_counts())
            .field("tools", &self.tools.len())
            .field("flags", &self.flags.len())
            .finish()
    }
}

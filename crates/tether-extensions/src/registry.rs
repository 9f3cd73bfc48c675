//! Extension registry.
//!
//! Owns every successfully loaded [`Registration`] for the process lifetime
//! and maintains the merged tool-lookup table plus merged read-only views of
//! commands, flags, and shortcuts. The merged table is recomputed as a pure
//! function of the registration list whenever the list changes.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use tether_core::descriptors::{
    CommandDescriptor, FlagDescriptor, RegistrationSummary, ShortcutDescriptor,
};

use crate::registration::Registration;
use crate::tool::ExtensionTool;

/// One entry in the merged tool table.
#[derive(Clone)]
pub struct MergedTool {
    /// Path of the extension that won the name.
    pub extension_path: String,
    /// The executable definition.
    pub handler: Arc<dyn ExtensionTool>,
}

impl std::fmt::Debug for MergedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedTool")
            .field("extension_path", &self.extension_path)
            .finish()
    }
}

/// A descriptor paired with the extension that declared it.
#[derive(Debug, Clone)]
pub struct Attributed<T> {
    /// Declaring extension's path.
    pub extension_path: String,
    /// The descriptor.
    pub descriptor: T,
}

/// Process-wide aggregate of loaded extensions.
///
/// Created empty at process start; registrations are added by `init` and
/// live until exit. Later registrations override earlier ones on tool-name
/// collision in the merged table.
#[derive(Default)]
pub struct ExtensionRegistry {
    registrations: Vec<Registration>,
    merged_tools: HashMap<String, MergedTool>,
}

impl ExtensionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            merged_tools: HashMap::new(),
        }
    }

    /// Add a registration and recompute the merged tool table.
    ///
    /// A registration with the same path replaces the previous one; paths
    /// are unique keys within a process instance.
    pub fn insert(&mut self, registration: Registration) {
        debug!(path = %registration.path(), "Registering extension");
        self.registrations
            .retain(|existing| existing.path() != registration.path());
        self.registrations.push(registration);
        self.merged_tools = merge_tools(&self.registrations);
    }

    /// Loaded registrations, in load order.
    #[must_use]
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Number of loaded registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no extensions are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Look up a tool in the merged table.
    #[must_use]
    pub fn lookup_tool(&self, name: &str) -> Option<&MergedTool> {
        self.merged_tools.get(name)
    }

    /// Merged tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.merged_tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sanitized views of every registration, in load order.
    #[must_use]
    pub fn summaries(&self) -> Vec<RegistrationSummary> {
        self.registrations.iter().map(Registration::summary).collect()
    }

    /// All registered commands with extension attribution, in load order.
    #[must_use]
    pub fn registered_commands(&self) -> Vec<Attributed<CommandDescriptor>> {
        self.attributed(Registration::commands)
    }

    /// All registered flags with extension attribution, in load order.
    #[must_use]
    pub fn registered_flags(&self) -> Vec<Attributed<FlagDescriptor>> {
        self.attributed(Registration::flags)
    }

    /// All registered shortcuts with extension attribution, in load order.
    #[must_use]
    pub fn registered_shortcuts(&self) -> Vec<Attributed<ShortcutDescriptor>> {
        self.attributed(Registration::shortcuts)
    }

    /// Apply a global flag map.
    ///
    /// Each `(name, value)` pair is applied only to registrations whose own
    /// flag list declares `name`; everything else is untouched, so flags
    /// stay per-extension namespaces even though the incoming map is
    /// global. Registrations with a flag sink are notified with the pairs
    /// they declare. An empty map is a no-op.
    pub async fn apply_flags(&self, flags: &HashMap<String, Value>) {
        if flags.is_empty() {
            return;
        }
        for registration in &self.registrations {
            let declared: HashMap<String, Value> = flags
                .iter()
                .filter(|(name, _)| registration.declares_flag(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if declared.is_empty() {
                continue;
            }
            {
                let mut values = registration.flag_values.write();
                for (name, value) in &declared {
                    let _ = values.insert(name.clone(), value.clone());
                }
            }
            if let Some(sink) = &registration.flag_sink {
                sink.apply(&declared).await;
            }
        }
    }

    fn attributed<T: Clone>(
        &self,
        select: impl Fn(&Registration) -> &[T],
    ) -> Vec<Attributed<T>> {
        self.registrations
            .iter()
            .flat_map(|registration| {
                select(registration).iter().map(|descriptor| Attributed {
                    extension_path: registration.path().to_string(),
                    descriptor: descriptor.clone(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.registrations.len())
            .field("merged_tools", &self.merged_tools.len())
            .finish()
    }
}

/// Recompute the merged tool table.
///
/// Pure function of the registration list: iterating in load order means a
/// later registration's entry overwrites an earlier one's on name
/// collision.
fn merge_tools(registrations: &[Registration]) -> HashMap<String, MergedTool> {
    let mut merged = HashMap::new();
    for registration in registrations {
        for (name, handler) in &registration.tool_handlers {
            let _ = merged.insert(
                name.clone(),
                MergedTool {
                    extension_path: registration.path().to_string(),
                    handler: Arc::clone(handler),
                },
            );
        }
    }
    merged
}

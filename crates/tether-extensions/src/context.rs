//! Context factory.
//!
//! Builds the ephemeral [`ExtensionContext`] handed to handlers and tools
//! for the duration of one dispatch or tool call. The host is headless, so
//! the UI capability set is a no-op implementation; any real interactivity
//! has to be proxied by the caller through the protocol.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use tether_core::context::ContextPayload;

/// UI capability set visible to extensions.
///
/// The headless host implements every member as a no-op or empty default.
/// An interactive host would provide a second implementation that proxies
/// these calls back over the protocol.
#[async_trait]
pub trait Ui: Send + Sync {
    /// Prompt the user to pick one of `options`. Headless: `None`.
    async fn select(&self, prompt: &str, options: &[String]) -> Option<String>;

    /// Ask a yes/no question. Headless: `false`.
    async fn confirm(&self, prompt: &str) -> bool;

    /// Prompt for a line of input. Headless: `None`.
    async fn input(&self, prompt: &str) -> Option<String>;

    /// Open an editor buffer. Headless: `None`.
    async fn editor(&self, initial: &str) -> Option<String>;

    /// Show a notification. Headless: no-op.
    fn notify(&self, level: &str, message: &str);

    /// Set the status line. Headless: no-op.
    fn set_status(&self, status: &str);

    /// Render a widget. Headless: no-op.
    fn set_widget(&self, widget: Value);

    /// Set the window title. Headless: no-op.
    fn set_title(&self, title: &str);

    /// Replace the editor buffer text. Headless: no-op.
    fn set_editor_text(&self, text: &str);

    /// Current theme values. Headless: empty.
    fn theme(&self) -> Map<String, Value>;
}

/// The no-op UI used by this host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessUi;

#[async_trait]
impl Ui for HeadlessUi {
    async fn select(&self, _prompt: &str, _options: &[String]) -> Option<String> {
        None
    }

    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }

    async fn input(&self, _prompt: &str) -> Option<String> {
        None
    }

    async fn editor(&self, _initial: &str) -> Option<String> {
        None
    }

    fn notify(&self, _level: &str, _message: &str) {}

    fn set_status(&self, _status: &str) {}

    fn set_widget(&self, _widget: Value) {}

    fn set_title(&self, _title: &str) {}

    fn set_editor_text(&self, _text: &str) {}

    fn theme(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Ephemeral per-call context.
///
/// Built from the request's [`ContextPayload`], consumed by one dispatch or
/// tool call, and never retained by the registry.
#[derive(Clone)]
pub struct ExtensionContext {
    ui: Arc<dyn Ui>,
    has_ui: bool,
    cwd: PathBuf,
    model: Option<Value>,
    session_entries: Arc<Vec<Value>>,
    is_idle: bool,
    has_pending_messages: bool,
    payload: ContextPayload,
}

impl ExtensionContext {
    /// Build a context from an optional payload.
    ///
    /// Absent fields fall back to headless defaults; `cwd` falls back to
    /// `default_cwd`.
    #[must_use]
    pub fn from_payload(payload: Option<&ContextPayload>, default_cwd: &Path) -> Self {
        let payload = payload.cloned().unwrap_or_default();
        Self {
            ui: Arc::new(HeadlessUi),
            has_ui: payload.has_ui.unwrap_or(false),
            cwd: payload
                .cwd
                .as_ref()
                .map_or_else(|| default_cwd.to_path_buf(), PathBuf::from),
            model: payload.model.clone(),
            session_entries: Arc::new(payload.session_entries.clone().unwrap_or_default()),
            is_idle: payload.is_idle.unwrap_or(false),
            has_pending_messages: payload.has_pending_messages.unwrap_or(false),
            payload,
        }
    }

    /// The UI capability set (headless in this host).
    #[must_use]
    pub fn ui(&self) -> Arc<dyn Ui> {
        Arc::clone(&self.ui)
    }

    /// Whether the caller declared an interactive UI.
    #[must_use]
    pub fn has_ui(&self) -> bool {
        self.has_ui
    }

    /// Working directory for this call.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Active model identifier, passed through verbatim.
    #[must_use]
    pub fn model(&self) -> Option<&Value> {
        self.model.as_ref()
    }

    /// Read-only view of the session entries from the payload.
    #[must_use]
    pub fn session_entries(&self) -> &[Value] {
        &self.session_entries
    }

    /// Whether the caller's session is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.is_idle
    }

    /// Whether the caller has queued messages.
    #[must_use]
    pub fn has_pending_messages(&self) -> bool {
        self.has_pending_messages
    }

    /// Provider API key lookup. Always `None` in this headless host.
    #[must_use]
    pub fn api_key(&self, _provider: &str) -> Option<String> {
        None
    }

    /// Abort the current operation. No-op in this host; real cancellation
    /// is the caller terminating the whole process.
    pub fn abort(&self) {}

    /// The raw payload this context was built from, for forwarding to
    /// process-backed extensions.
    #[must_use]
    pub fn payload(&self) -> &ContextPayload {
        &self.payload
    }
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("has_ui", &self.has_ui)
            .field("cwd", &self.cwd)
            .field("is_idle", &self.is_idle)
            .field("has_pending_messages", &self.has_pending_messages)
            .field("session_entries", &self.session_entries.len())
            .finish()
    }
}

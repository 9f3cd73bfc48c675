//! Child-process extension runtime.
//!
//! Filesystem extensions run as child processes speaking one JSON record
//! per line over their stdin/stdout, mirroring the host's own transport.
//! At load time the host sends a `describe` request and materializes the
//! reply into a registration whose handlers and tools are proxies that
//! forward over the same channel.
//!
//! Only the `describe` handshake is subject to a timeout. Event and tool
//! forwarding waits indefinitely; a hung extension stalls the host loop.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use tether_core::descriptors::{
    CommandDescriptor, FlagDescriptor, MessageRendererDescriptor, ShortcutDescriptor,
    ToolDescriptor,
};

use crate::context::ExtensionContext;
use crate::errors::{HandlerError, ProcessError, ToolError};
use crate::handler::EventHandler;
use crate::registration::FlagSink;
use crate::tool::ExtensionTool;

/// How long the child gets to answer the `describe` handshake.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// What a child declares in its `describe` reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessManifest {
    /// Declared tools.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    /// Declared commands.
    #[serde(default)]
    pub commands: Vec<CommandDescriptor>,
    /// Declared flags.
    #[serde(default)]
    pub flags: Vec<FlagDescriptor>,
    /// Declared shortcuts.
    #[serde(default)]
    pub shortcuts: Vec<ShortcutDescriptor>,
    /// Declared message renderers.
    #[serde(default)]
    pub message_renderers: Vec<MessageRendererDescriptor>,
    /// Event types the child wants delivered.
    #[serde(default)]
    pub events: Vec<String>,
}

struct ProcessIo {
    stdin: ChildStdin,
    stdout: tokio::io::Lines<BufReader<ChildStdout>>,
    // Held so the child is killed when the registration is dropped.
    _child: Child,
}

/// One running extension child process.
///
/// All pipe I/O goes through a single mutex: requests and replies are
/// strictly paired, which the sequential host loop guarantees anyway.
pub struct ExtensionProcess {
    path: String,
    io: Mutex<ProcessIo>,
}

impl ExtensionProcess {
    /// Spawn the child and wire up its pipes.
    ///
    /// The child inherits stderr so its diagnostics land next to the
    /// host's own.
    pub fn spawn(path: &str, program: &str, args: &[String]) -> Result<Self, ProcessError> {
        debug!(path, program, "Spawning extension process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: program.to_string(),
                source,
            })?;
        let stdin = child.stdin.take().ok_or(ProcessError::ClosedStream)?;
        let stdout = child.stdout.take().ok_or(ProcessError::ClosedStream)?;
        Ok(Self {
            path: path.to_string(),
            io: Mutex::new(ProcessIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
                _child: child,
            }),
        })
    }

    /// The extension path this process was loaded from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Send one request line and read one reply line.
    pub async fn call(&self, request: &Value) -> Result<Value, ProcessError> {
        let mut io = self.io.lock().await;
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        loop {
            let Some(reply) = io.stdout.next_line().await? else {
                return Err(ProcessError::ClosedStream);
            };
            if reply.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&reply)
                .map_err(|_| ProcessError::InvalidReply(reply.clone()));
        }
    }

    /// Run the load-phase `describe` handshake.
    pub async fn describe(&self) -> Result<ProcessManifest, ProcessError> {
        let reply = tokio::time::timeout(
            Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
            self.call(&json!({"type": "describe"})),
        )
        .await
        .map_err(|_| ProcessError::HandshakeTimeout {
            timeout_ms: HANDSHAKE_TIMEOUT_MS,
        })??;
        if !reply.is_object() {
            return Err(ProcessError::InvalidReply(reply.to_string()));
        }
        serde_json::from_value(reply.clone())
            .map_err(|_| ProcessError::InvalidReply(reply.to_string()))
    }
}

impl std::fmt::Debug for ExtensionProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionProcess")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl FlagSink for ExtensionProcess {
    async fn apply(&self, flags: &HashMap<String, Value>) {
        let request = json!({"type": "set_flags", "flags": flags});
        if let Err(error) = self.call(&request).await {
            warn!(path = %self.path, error = %error, "Failed to forward flags to extension process");
        }
    }
}

/// Forwards one subscribed event type to the child.
#[derive(Debug)]
pub struct ProcessHandler {
    process: Arc<ExtensionProcess>,
}

impl ProcessHandler {
    /// Wrap a process handle.
    #[must_use]
    pub fn new(process: Arc<ExtensionProcess>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl EventHandler for ProcessHandler {
    async fn handle(
        &self,
        event: &Value,
        context: &ExtensionContext,
    ) -> Result<Option<Value>, HandlerError> {
        let request = json!({
            "type": "event",
            "event": event,
            "context": context.payload(),
        });
        let reply = self.process.call(&request).await?;
        if let Some(error) = reply.get("error").and_then(Value::as_str) {
            return Err(HandlerError::failed(error));
        }
        Ok(reply.get("result").cloned())
    }
}

/// Forwards tool execution to the child.
#[derive(Debug)]
pub struct ProcessTool {
    process: Arc<ExtensionProcess>,
    name: String,
}

impl ProcessTool {
    /// Wrap a process handle for one declared tool.
    #[must_use]
    pub fn new(process: Arc<ExtensionProcess>, name: impl Into<String>) -> Self {
        Self {
            process,
            name: name.into(),
        }
    }
}

#[async_trait]
impl ExtensionTool for ProcessTool {
    async fn execute(
        &self,
        tool_call_id: &str,
        input: Value,
        context: &ExtensionContext,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<Value, ToolError> {
        let request = json!({
            "type": "tool",
            "name": self.name,
            "toolCallId": tool_call_id,
            "input": input,
            "context": context.payload(),
        });
        let reply = self.process.call(&request).await?;
        if reply.get("ok").is_some_and(|ok| ok == &Value::Bool(false)) {
            let message = reply
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("tool failed");
            return Err(ToolError::failed(message));
        }
        Ok(reply.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn scripted_process(replies: &[&str]) -> (ExtensionProcess, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("ext.sh");
        let mut script = String::from("#!/bin/sh\n");
        for reply in replies {
            script.push_str("read line\n");
            script.push_str(&format!("printf '%s\\n' '{reply}'\n"));
        }
        let mut file = std::fs::File::create(&script_path).unwrap();
        write!(file, "{script}").unwrap();
        drop(file);
        let process = ExtensionProcess::spawn(
            "/ext/scripted.sh",
            "/bin/sh",
            &[script_path.to_string_lossy().into_owned()],
        )
        .unwrap();
        (process, dir)
    }

    #[tokio::test]
    async fn test_describe_parses_manifest() {
        let (process, _dir) = scripted_process(&[
            r#"{"tools":[{"name":"noop"}],"flags":[{"name":"verbose"}],"events":["tool_call"]}"#,
        ]);
        let manifest = process.describe().await.unwrap();
        assert_eq!(manifest.tools.len(), 1);
        assert_eq!(manifest.tools[0].name, "noop");
        assert_eq!(manifest.events, vec!["tool_call"]);
    }

    #[tokio::test]
    async fn test_describe_rejects_non_object_reply() {
        let (process, _dir) = scripted_process(&[r#""not a manifest""#]);
        let err = process.describe().await.unwrap_err();
        assert!(matches!(err, ProcessError::InvalidReply(_)));
    }

    #[tokio::test]
    async fn test_handler_forwards_event_and_reads_result() {
        let (process, _dir) = scripted_process(&[r#"{"result":{"seen":true}}"#]);
        let handler = ProcessHandler::new(Arc::new(process));
        let ctx = ExtensionContext::from_payload(None, Path::new("/work"));
        let result = handler
            .handle(&json!({"type": "tool_call"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"seen": true})));
    }

    #[tokio::test]
    async fn test_handler_error_reply_surfaces() {
        let (process, _dir) = scripted_process(&[r#"{"error":"child unhappy"}"#]);
        let handler = ProcessHandler::new(Arc::new(process));
        let ctx = ExtensionContext::from_payload(None, Path::new("/work"));
        let err = handler
            .handle(&json!({"type": "context"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "child unhappy");
    }

    #[tokio::test]
    async fn test_tool_failure_reply_surfaces() {
        let (process, _dir) = scripted_process(&[r#"{"ok":false,"error":"bad input"}"#]);
        let tool = ProcessTool::new(Arc::new(process), "noop");
        let ctx = ExtensionContext::from_payload(None, Path::new("/work"));
        let err = tool
            .execute(
                "tc1",
                json!({}),
                &ctx,
                tokio_util::sync::CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad input");
    }

    #[tokio::test]
    async fn test_closed_stream_is_an_error_not_a_hang() {
        let (process, _dir) = scripted_process(&[]);
        let err = process.call(&json!({"type": "event"})).await.unwrap_err();
        assert!(matches!(
            err,
            ProcessError::ClosedStream | ProcessError::Io(_)
        ));
    }
}

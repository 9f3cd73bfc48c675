//! Message router.
//!
//! The top-level state machine: interprets each parsed record by its
//! `type` and drives the loader, registry, dispatcher, and invoker. Every
//! path produces exactly one response per input line, echoing the
//! caller's correlation `id`.

use std::path::PathBuf;

use metrics::counter;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

use tether_core::protocol::{
    EmitRequest, InitRequest, InvokeToolRequest, Response, SetFlagsRequest,
};
use tether_extensions::context::ExtensionContext;
use tether_extensions::dispatch::dispatch;
use tether_extensions::invoke::{InvokeOutcome, invoke};
use tether_extensions::loader::load_paths;
use tether_extensions::registration::Registration;
use tether_extensions::registry::ExtensionRegistry;

use crate::errors::HostError;
use crate::transport::LineTransport;

/// Routes parsed records to the extension machinery.
pub struct MessageRouter {
    registry: ExtensionRegistry,
    default_cwd: PathBuf,
}

impl MessageRouter {
    /// Create a router with an empty registry.
    #[must_use]
    pub fn new(default_cwd: PathBuf) -> Self {
        Self {
            registry: ExtensionRegistry::new(),
            default_cwd,
        }
    }

    /// The live registry.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Preload a registration ahead of any `init` (built-in extensions).
    pub fn preload(&mut self, registration: Registration) {
        self.registry.insert(registration);
    }

    /// Run the read-handle-write loop until the input stream closes.
    ///
    /// Strictly one message at a time; the response for a line is written
    /// before the next line is read. Only transport failures escape.
    pub async fn run<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> Result<(), HostError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = transport.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                transport.send(&response).await?;
            }
        }
        debug!("Input stream closed; shutting down");
        Ok(())
    }

    /// Handle one input line. Blank lines produce no response.
    pub async fn handle_line(&mut self, line: &str) -> Option<Response> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Ok(record) = serde_json::from_str::<Value>(trimmed) else {
            return Some(Response::invalid_json());
        };
        Some(self.handle_record(record).await)
    }

    async fn handle_record(&mut self, record: Value) -> Response {
        // The id is opaque: echoed verbatim, absent stays absent.
        let id = record.get("id").cloned();
        let Some(message_type) = record.get("type").and_then(Value::as_str) else {
            return Response::unknown_type(id);
        };
        counter!("tether_messages_total", "type" => message_type.to_string()).increment(1);

        match message_type {
            "init" => match serde_json::from_value::<InitRequest>(record.clone()) {
                Ok(request) => self.handle_init(id, request).await,
                Err(error) => Response::failure(id, error.to_string()),
            },
            "set_flags" => match serde_json::from_value::<SetFlagsRequest>(record.clone()) {
                Ok(request) => {
                    self.registry.apply_flags(&request.flags).await;
                    Response::success(id)
                }
                Err(error) => Response::failure(id, error.to_string()),
            },
            "invoke_tool" => match serde_json::from_value::<InvokeToolRequest>(record.clone()) {
                Ok(request) => self.handle_invoke(id, request).await,
                Err(error) => Response::failure(id, error.to_string()),
            },
            "emit" => match serde_json::from_value::<EmitRequest>(record.clone()) {
                Ok(request) => self.handle_emit(id, request).await,
                Err(error) => Response::failure(id, error.to_string()),
            },
            _ => Response::unknown_type(id),
        }
    }

    async fn handle_init(&mut self, id: Option<Value>, request: InitRequest) -> Response {
        let (registrations, failures) =
            load_paths(&request.extensions, &self.default_cwd).await;
        let summaries = registrations.iter().map(Registration::summary).collect();
        for registration in registrations {
            self.registry.insert(registration);
        }
        Response::init(id, summaries, failures)
    }

    async fn handle_invoke(&self, id: Option<Value>, request: InvokeToolRequest) -> Response {
        let outcome = invoke(
            &self.registry,
            &request.name,
            &request.tool_call_id,
            request.input,
            request.context.as_ref(),
            &self.default_cwd,
        )
        .await;
        match outcome {
            InvokeOutcome::Success(result) => Response::tool_result(id, result),
            InvokeOutcome::Failure(error) => Response::failure(id, error),
        }
    }

    async fn handle_emit(&self, id: Option<Value>, request: EmitRequest) -> Response {
        let context = ExtensionContext::from_payload(request.context.as_ref(), &self.default_cwd);
        let outcome = dispatch(&self.registry, &request.event, &context).await;
        Response::emit(id, outcome.result, outcome.errors)
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("registry", &self.registry)
            .field("default_cwd", &self.default_cwd)
            .finish()
    }
}

//! Extension error types.

use thiserror::Error;

/// Errors raised by capability-surface registration calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A descriptor was missing its required identifying field.
    #[error("{descriptor} requires a non-empty '{field}'")]
    MissingField {
        /// Descriptor kind (e.g. `tool`, `flag`).
        descriptor: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The capability exists for API compatibility but cannot work here.
    #[error("'{capability}' is not supported in a headless extension host")]
    Unsupported {
        /// Name of the requested capability.
        capability: &'static str,
    },
}

/// Errors that can occur while loading one extension.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The path does not exist or could not be resolved.
    #[error("Extension path not found: {path}")]
    NotFound {
        /// The unresolvable path.
        path: String,
    },

    /// The source kind is not one the loader knows how to run.
    #[error("Unsupported extension source: {path}")]
    Unsupported {
        /// The rejected path.
        path: String,
    },

    /// The source needs a runtime that is not available on `PATH`.
    #[error("{path} requires {runtime}, which is not available in this environment")]
    MissingRuntime {
        /// The extension path.
        path: String,
        /// The missing runtime (e.g. `node`, `deno`).
        runtime: String,
    },

    /// The module did not produce a callable factory / valid manifest.
    #[error("{path} does not export a function")]
    NotAFactory {
        /// The extension path.
        path: String,
    },

    /// The factory itself failed during its single invocation.
    #[error("{0}")]
    Factory(String),

    /// A registration call made by the factory was invalid.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Filesystem error while resolving or reading the source.
    #[error("I/O error loading {path}: {source}")]
    Io {
        /// The extension path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The extension process failed during the load handshake.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl LoadError {
    /// Factory failure with an arbitrary message.
    #[must_use]
    pub fn factory(message: impl Into<String>) -> Self {
        Self::Factory(message.into())
    }
}

/// Errors raised by an event handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The backing extension process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl HandlerError {
    /// Handler failure with an arbitrary message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors raised by a tool's `execute`.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The backing extension process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl ToolError {
    /// Tool failure with an arbitrary message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors from the child-process extension runtime.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The child could not be spawned.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// Command that failed to start.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the child's pipes failed.
    #[error("extension process I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The child closed its stdout before replying.
    #[error("extension process closed its output stream")]
    ClosedStream,

    /// The child replied with something that is not a JSON object.
    #[error("extension process sent an invalid reply: {0}")]
    InvalidReply(String),

    /// A request could not be encoded as a JSON line.
    #[error("failed to encode extension process request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The load-phase handshake did not complete in time.
    #[error("extension process did not answer the describe handshake within {timeout_ms}ms")]
    HandshakeTimeout {
        /// Configured handshake timeout in milliseconds.
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_factory_message() {
        let err = LoadError::NotAFactory {
            path: "/ext/a.js".to_string(),
        };
        assert_eq!(err.to_string(), "/ext/a.js does not export a function");
    }

    #[test]
    fn test_missing_runtime_names_capability() {
        let err = LoadError::MissingRuntime {
            path: "/ext/a.ts".to_string(),
            runtime: "deno".to_string(),
        };
        assert!(err.to_string().contains("deno"));
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn test_api_error_converts_to_load_error() {
        let err: LoadError = ApiError::MissingField {
            descriptor: "tool",
            field: "name",
        }
        .into();
        assert_eq!(err.to_string(), "tool requires a non-empty 'name'");
    }

    #[test]
    fn test_factory_error_is_bare_message() {
        assert_eq!(LoadError::factory("boom").to_string(), "boom");
    }

    #[test]
    fn test_unsupported_capability_message() {
        let err = ApiError::Unsupported { capability: "exec" };
        assert!(err.to_string().contains("'exec'"));
        assert!(err.to_string().contains("headless"));
    }
}

//! Extension loader.
//!
//! Two ways in: in-process factories (for built-in extensions and tests)
//! and filesystem paths, which resolve through [`crate::discovery`] and run
//! as child processes. Either way the result is a frozen
//! [`Registration`]; per-extension failures during a multi-path `init` are
//! isolated and collected, never fatal to the batch.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use tether_core::descriptors::LoadFailure;

use crate::api::ExtensionApi;
use crate::discovery::{self, ResolvedSource};
use crate::errors::{LoadError, ProcessError};
use crate::process::{ExtensionProcess, ProcessHandler, ProcessTool};
use crate::registration::{FlagSink, Registration};

/// An in-process extension entry point.
///
/// Invoked exactly once with a fresh capability surface; every
/// registration call made during that invocation populates the surface's
/// registration.
pub trait ExtensionFactory: Send + Sync {
    /// Populate the capability surface.
    fn build(&self, api: &mut ExtensionApi) -> Result<(), LoadError>;
}

impl<F> ExtensionFactory for F
where
    F: Fn(&mut ExtensionApi) -> Result<(), LoadError> + Send + Sync,
{
    fn build(&self, api: &mut ExtensionApi) -> Result<(), LoadError> {
        self(api)
    }
}

/// Load one in-process extension from its factory.
pub fn load_from_factory(
    label: &str,
    factory: &dyn ExtensionFactory,
) -> Result<Registration, LoadError> {
    let mut api = ExtensionApi::new(label);
    factory.build(&mut api)?;
    Ok(api.finish())
}

/// Load one path spec, which may resolve to several sources via a
/// directory manifest.
pub async fn load_path(spec: &str, cwd: &Path) -> Result<Vec<Registration>, LoadError> {
    let sources = discovery::resolve(spec, cwd)?;
    let mut registrations = Vec::with_capacity(sources.len());
    for source in &sources {
        registrations.push(load_source(source).await?);
    }
    Ok(registrations)
}

/// Load every path spec from an `init` request.
///
/// Failures are collected per spec and loading continues with the rest.
pub async fn load_paths(specs: &[String], cwd: &Path) -> (Vec<Registration>, Vec<LoadFailure>) {
    let mut registrations = Vec::new();
    let mut failures = Vec::new();
    for spec in specs {
        match load_path(spec, cwd).await {
            Ok(loaded) => {
                info!(spec = %spec, count = loaded.len(), "Loaded extension");
                registrations.extend(loaded);
            }
            Err(error) => {
                warn!(spec = %spec, error = %error, "Failed to load extension");
                failures.push(LoadFailure {
                    extension_path: spec.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
    (registrations, failures)
}

async fn load_source(source: &ResolvedSource) -> Result<Registration, LoadError> {
    let (program, args) = source.command()?;
    let path = source.path.to_string_lossy().into_owned();
    let process = Arc::new(ExtensionProcess::spawn(&path, &program, &args)?);

    let manifest = match process.describe().await {
        Ok(manifest) => manifest,
        // A reply that is not a manifest object means the source has no
        // usable entry point.
        Err(ProcessError::InvalidReply(_)) => {
            return Err(LoadError::NotAFactory { path });
        }
        Err(error) => return Err(error.into()),
    };

    let mut api = ExtensionApi::new(path);
    for event_type in &manifest.events {
        api.on(
            event_type.clone(),
            Arc::new(ProcessHandler::new(Arc::clone(&process))),
        );
    }
    for tool in manifest.tools {
        let handler = Arc::new(ProcessTool::new(Arc::clone(&process), tool.name.clone()));
        api.register_tool(tool, handler)?;
    }
    for command in manifest.commands {
        api.register_command(command)?;
    }
    for flag in manifest.flags {
        api.register_flag(flag)?;
    }
    for shortcut in manifest.shortcuts {
        api.register_shortcut(shortcut)?;
    }
    for renderer in manifest.message_renderers {
        api.register_message_renderer(renderer)?;
    }
    api.set_flag_sink(process as Arc<dyn FlagSink>);
    Ok(api.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use serde_json::json;

    use tether_core::descriptors::{FlagDescriptor, ToolDescriptor};

    use crate::handler::handler_fn;

    #[test]
    fn test_load_from_factory_populates_registration() {
        let factory = |api: &mut ExtensionApi| -> Result<(), LoadError> {
            api.on("tool_call", handler_fn(|_event| Ok(None)));
            api.register_flag(FlagDescriptor::new("verbose").with_default(json!(true)))?;
            Ok(())
        };
        let registration = load_from_factory("builtin:logger", &factory).unwrap();
        assert_eq!(registration.path(), "builtin:logger");
        assert_eq!(registration.handlers_for("tool_call").len(), 1);
        assert_eq!(registration.flag_value("verbose"), Some(json!(true)));
    }

    #[test]
    fn test_factory_failure_surfaces_as_load_error() {
        let factory =
            |_api: &mut ExtensionApi| -> Result<(), LoadError> { Err(LoadError::factory("boom")) };
        let err = load_from_factory("builtin:broken", &factory).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    struct NullTool;

    #[async_trait::async_trait]
    impl crate::tool::ExtensionTool for NullTool {
        async fn execute(
            &self,
            _tool_call_id: &str,
            _input: serde_json::Value,
            _context: &crate::context::ExtensionContext,
            _cancel: tokio_util::sync::CancellationToken,
        ) -> Result<serde_json::Value, crate::errors::ToolError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_factory_invalid_registration_fails_load() {
        let factory = |api: &mut ExtensionApi| -> Result<(), LoadError> {
            api.register_tool(ToolDescriptor::new(""), Arc::new(NullTool))?;
            Ok(())
        };
        let err = load_from_factory("builtin:bad", &factory).unwrap_err();
        assert!(err.to_string().contains("non-empty 'name'"));
    }

    #[tokio::test]
    async fn test_load_paths_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec!["missing.js".to_string()];
        let (registrations, failures) = load_paths(&specs, dir.path()).await;
        assert!(registrations.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].extension_path, "missing.js");
        assert!(failures[0].error.contains("not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_executable_extension_end_to_end() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("ext");
        let script = concat!(
            "#!/bin/sh\n",
            "read line\n",
            "printf '%s\\n' '{\"tools\":[{\"name\":\"greet\"}],\"events\":[\"tool_call\"],",
            "\"flags\":[{\"name\":\"verbose\",\"default\":false}]}'\n",
        );
        let mut file = std::fs::File::create(&script_path).unwrap();
        write!(file, "{script}").unwrap();
        drop(file);
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let specs = vec![script_path.to_string_lossy().into_owned()];
        let (registrations, failures) = load_paths(&specs, dir.path()).await;
        assert!(failures.is_empty(), "{failures:?}");
        assert_eq!(registrations.len(), 1);
        let registration = &registrations[0];
        assert_eq!(registration.tools().len(), 1);
        assert_eq!(registration.handlers_for("tool_call").len(), 1);
        assert_eq!(registration.flag_value("verbose"), Some(json!(false)));
    }
}

//! Extension source resolution.
//!
//! Turns the path specs arriving in an `init` request into concrete
//! runnable sources. A spec may point at a file, or at a directory holding
//! either a `tether.json` manifest (with an `"extensions"` array of entry
//! paths) or an `index.*` entry file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::LoadError;

/// How a resolved source gets run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Spawned directly (binary, or script with its own shebang).
    Executable,
    /// JavaScript source; needs `node` on `PATH`.
    Node,
    /// Python source; needs `python3` on `PATH`.
    Python,
    /// TypeScript source; needs the transpiling runtime `deno` on `PATH`.
    TypeScript,
}

impl SourceKind {
    /// The runtime this kind needs from the environment, if any.
    #[must_use]
    pub fn runtime(self) -> Option<&'static str> {
        match self {
            Self::Executable => None,
            Self::Node => Some("node"),
            Self::Python => Some("python3"),
            Self::TypeScript => Some("deno"),
        }
    }
}

/// A runnable extension source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Absolute path to the entry file.
    pub path: PathBuf,
    /// How to run it.
    pub kind: SourceKind,
}

impl ResolvedSource {
    /// The command line that runs this source.
    ///
    /// Fails when the required runtime is missing from `PATH`; a missing
    /// transpiling runtime is an explicit error, never a silent fallback.
    pub fn command(&self) -> Result<(String, Vec<String>), LoadError> {
        let path = self.path.to_string_lossy().into_owned();
        let Some(runtime) = self.kind.runtime() else {
            return Ok((path, Vec::new()));
        };
        if !runtime_available(runtime) {
            return Err(LoadError::MissingRuntime {
                path,
                runtime: runtime.to_string(),
            });
        }
        let args = match self.kind {
            SourceKind::TypeScript => vec!["run".to_string(), "--allow-all".to_string(), path],
            _ => vec![path],
        };
        Ok((runtime.to_string(), args))
    }
}

#[derive(Debug, Deserialize)]
struct DirManifest {
    #[serde(default)]
    extensions: Vec<String>,
}

/// Resolve one path spec from an `init` request.
///
/// Expands `~`, normalizes exotic whitespace, absolutizes against `cwd`,
/// and classifies the target. A directory resolves through its
/// `tether.json` manifest or `index.*` entry file.
pub fn resolve(spec: &str, cwd: &Path) -> Result<Vec<ResolvedSource>, LoadError> {
    let cleaned = normalize_spaces(spec);
    let expanded = expand_home(cleaned.trim(), std::env::var("HOME").ok().as_deref());
    let path = absolutize(Path::new(&expanded), cwd);

    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_string_lossy().into_owned(),
        });
    }
    if path.is_dir() {
        return resolve_directory(&path);
    }
    classify_file(&path).map(|source| vec![source])
}

fn resolve_directory(dir: &Path) -> Result<Vec<ResolvedSource>, LoadError> {
    let manifest_path = dir.join("tether.json");
    if manifest_path.is_file() {
        let raw = std::fs::read_to_string(&manifest_path).map_err(|source| LoadError::Io {
            path: manifest_path.to_string_lossy().into_owned(),
            source,
        })?;
        let manifest: DirManifest =
            serde_json::from_str(&raw).map_err(|err| LoadError::Unsupported {
                path: format!("{} ({err})", manifest_path.to_string_lossy()),
            })?;
        debug!(dir = %dir.display(), entries = manifest.extensions.len(), "Resolved manifest");
        return manifest
            .extensions
            .iter()
            .map(|entry| classify_file(&absolutize(Path::new(entry), dir)))
            .collect();
    }

    for index in ["index.js", "index.mjs", "index.ts", "index.py"] {
        let candidate = dir.join(index);
        if candidate.is_file() {
            return classify_file(&candidate).map(|source| vec![source]);
        }
    }

    Err(LoadError::Unsupported {
        path: dir.to_string_lossy().into_owned(),
    })
}

fn classify_file(path: &Path) -> Result<ResolvedSource, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound {
            path: path.to_string_lossy().into_owned(),
        });
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let kind = match extension {
        "js" | "mjs" => Some(SourceKind::Node),
        "py" => Some(SourceKind::Python),
        "ts" => Some(SourceKind::TypeScript),
        _ if is_executable(path) => Some(SourceKind::Executable),
        _ => None,
    };
    kind.map_or_else(
        || {
            Err(LoadError::Unsupported {
                path: path.to_string_lossy().into_owned(),
            })
        },
        |kind| {
            Ok(ResolvedSource {
                path: path.to_path_buf(),
                kind,
            })
        },
    )
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Replace non-breaking and narrow spaces (common in copy-pasted paths)
/// with plain spaces.
fn normalize_spaces(spec: &str) -> String {
    spec.chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            other => other,
        })
        .collect()
}

fn expand_home(spec: &str, home: Option<&str>) -> String {
    match (spec.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => format!("{home}/{rest}"),
        _ => spec.to_string(),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Whether `name` resolves to an executable on `PATH`.
#[must_use]
pub fn runtime_available(name: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| is_executable(&dir.join(name)))
}

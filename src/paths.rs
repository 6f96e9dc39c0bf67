use crate::config::{Defaults, ScriptConfig};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
#[error("failed to prepare output directory {}: {source}", .path.display())]
pub struct OutputDirError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Concrete locations handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// `None` when nothing was given explicitly and the defaulted renderer
    /// config does not exist.
    pub config_path: Option<PathBuf>,
}

/// Resolves input, output and renderer config paths and makes sure the
/// output directory exists.
///
/// Explicit values win over the script config, which wins over `defaults`.
/// Creating the output directory is idempotent; it is the only failure.
pub fn resolve(
    explicit_input: Option<&Path>,
    explicit_config: Option<&Path>,
    script: &ScriptConfig,
    defaults: &Defaults,
) -> Result<ResolvedPaths, OutputDirError> {
    resolve_with_output(explicit_input, explicit_config, None, script, defaults)
}

pub fn resolve_with_output(
    explicit_input: Option<&Path>,
    explicit_config: Option<&Path>,
    explicit_output: Option<&Path>,
    script: &ScriptConfig,
    defaults: &Defaults,
) -> Result<ResolvedPaths, OutputDirError> {
    let input_path = resolve_input(explicit_input, script, defaults);
    let config_path = resolve_config(explicit_config, script, defaults);
    let output_path = match explicit_output {
        Some(path) => path.to_path_buf(),
        None => derive_output(&input_path, script, defaults),
    };

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| OutputDirError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        config = ?config_path,
        "resolved paths"
    );

    Ok(ResolvedPaths {
        input_path,
        output_path,
        config_path,
    })
}

fn resolve_input(explicit: Option<&Path>, script: &ScriptConfig, defaults: &Defaults) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match script.input_file_path.as_deref() {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => defaults.default_input.clone(),
    }
}

fn resolve_config(
    explicit: Option<&Path>,
    script: &ScriptConfig,
    defaults: &Defaults,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            warn!(path = %path.display(), "renderer config does not exist");
        }
        return Some(path.to_path_buf());
    }
    let filename = script
        .mermaid_cli_config_filename
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(defaults.config_filename.as_str());
    let candidate = defaults.config_dir.join(filename);
    if candidate.is_file() {
        Some(candidate)
    } else {
        debug!(path = %candidate.display(), "no renderer config, rendering without one");
        None
    }
}

/// `<output dir>/<input stem><extension>`.
pub fn derive_output(input: &Path, script: &ScriptConfig, defaults: &Defaults) -> PathBuf {
    let output_dir = script
        .output_dir
        .as_deref()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| defaults.output_dir.clone());
    let extension = script
        .normalized_extension()
        .unwrap_or_else(|| defaults.extension.clone());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "diagram".to_string());
    output_dir.join(format!("{stem}{extension}"))
}

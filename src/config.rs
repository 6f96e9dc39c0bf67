use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_EXTENSION: &str = ".svg";
pub const DEFAULT_RENDERER: &str = "mmdc";
pub const DEFAULT_MERMAID_CONFIG_FILENAME: &str = "mermaid-config.json";
pub const SCRIPT_CONFIG_FILENAME: &str = "script-config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read script config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Persisted overrides for the built-in defaults. Every key is optional and
/// unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub input_file_path: Option<String>,
    pub extension: Option<String>,
    pub mermaid_cli_config_filename: Option<String>,
    pub output_dir: Option<String>,
    pub renderer: Option<String>,
    pub renderer_args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

impl ScriptConfig {
    /// Loads the config at `path`. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no script config, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_json_str(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Strict JSON first, then JSON5 so hand-edited files with comments or
    /// trailing commas still load.
    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        match serde_json::from_str::<Self>(contents) {
            Ok(config) => Ok(config),
            Err(json_err) => {
                json5::from_str::<Self>(contents).map_err(|_| json_err.to_string())
            }
        }
    }

    /// Configured extension with a leading dot, if any.
    pub fn normalized_extension(&self) -> Option<String> {
        self.extension
            .as_deref()
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(normalize_extension)
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}

pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Built-in fallbacks handed to the path resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub base_dir: PathBuf,
    pub default_input: PathBuf,
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config_filename: String,
    pub extension: String,
}

impl Defaults {
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            default_input: base_dir.join("input").join("diagram.mmd"),
            config_dir: base_dir.join("config"),
            output_dir: base_dir.join("output"),
            config_filename: DEFAULT_MERMAID_CONFIG_FILENAME.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            base_dir,
        }
    }

    /// Anchors the defaults one level above the directory holding the
    /// running executable, falling back to the working directory.
    pub fn for_current_exe() -> Self {
        let base_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.canonicalize().ok())
            .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_base_dir(base_dir)
    }

    pub fn script_config_path(&self) -> PathBuf {
        self.config_dir.join(SCRIPT_CONFIG_FILENAME)
    }
}

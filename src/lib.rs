#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod generate;
pub mod paths;
pub mod render;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{ConfigError, Defaults, ScriptConfig};
pub use generate::{RunError, generate};
pub use paths::{OutputDirError, ResolvedPaths, resolve, resolve_with_output};
pub use render::{InvocationResult, RenderError, Renderer, build_command};

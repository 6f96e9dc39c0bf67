use crate::config::ConfigError;
use crate::paths::{OutputDirError, ResolvedPaths};
use crate::render::{InvocationResult, RenderError, Renderer};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    OutputDir(#[from] OutputDirError),
}

/// Checks the input exists, runs the renderer, and turns a non-zero exit
/// into [`RenderError::Failed`]. The renderer is never started when the
/// input is missing.
pub fn generate(paths: &ResolvedPaths, renderer: &Renderer) -> Result<InvocationResult, RunError> {
    if !paths.input_path.exists() {
        return Err(RunError::InputNotFound(paths.input_path.clone()));
    }
    let result = renderer
        .render(
            &paths.input_path,
            &paths.output_path,
            paths.config_path.as_deref(),
        )?
        .into_success()?;
    info!(output = %paths.output_path.display(), "diagram generated");
    Ok(result)
}

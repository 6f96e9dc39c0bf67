use crate::config::{Defaults, ScriptConfig, normalize_extension};
use crate::generate::{RunError, generate};
use crate::paths::{ResolvedPaths, resolve_with_output};
use crate::render::Renderer;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mmdc-run",
    version,
    about = "Render a Mermaid file to an image with mermaid-cli (mmdc)"
)]
pub struct Args {
    /// Input Mermaid file (.mmd). Defaults to `input_file_path` from the script config.
    pub input: Option<PathBuf>,

    /// mermaid-cli config file passed through as `-c`
    pub config: Option<PathBuf>,

    /// Output file. Defaults to <output dir>/<input name><extension>
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output extension, e.g. .svg or .png
    #[arg(short = 'e', long = "extension")]
    pub extension: Option<String>,

    /// Script config JSON file
    #[arg(short = 's', long = "script-config")]
    pub script_config: Option<PathBuf>,

    /// Kill the renderer after this many seconds
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Print the renderer command instead of running it
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run_with(args, &Defaults::for_current_exe())
}

pub fn run_with(args: Args, defaults: &Defaults) -> Result<()> {
    let (paths, renderer) = prepare(&args, defaults)?;

    if args.dry_run {
        println!(
            "{}",
            renderer.command_line(
                &paths.input_path,
                &paths.output_path,
                paths.config_path.as_deref()
            )
        );
        return Ok(());
    }

    generate(&paths, &renderer)?;
    println!("Diagram generated successfully: {}", paths.output_path.display());
    Ok(())
}

/// Loads the script config, applies the command-line overrides, and resolves
/// the paths. Creates the output directory.
pub fn prepare(args: &Args, defaults: &Defaults) -> Result<(ResolvedPaths, Renderer), RunError> {
    let script_path = args
        .script_config
        .clone()
        .unwrap_or_else(|| defaults.script_config_path());
    let mut script = ScriptConfig::load(&script_path)?;
    if let Some(ext) = args
        .extension
        .as_deref()
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
    {
        script.extension = Some(normalize_extension(ext));
    }

    let paths = resolve_with_output(
        args.input.as_deref(),
        args.config.as_deref(),
        args.output.as_deref(),
        &script,
        defaults,
    )?;

    let renderer = Renderer::from_script_config(&script);
    let renderer = match args.timeout {
        Some(secs) => renderer.with_timeout(Some(Duration::from_secs(secs))),
        None => renderer,
    };
    Ok((paths, renderer))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

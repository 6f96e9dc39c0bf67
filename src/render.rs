use crate::config::{DEFAULT_RENDERER, ScriptConfig};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use wait_timeout::ChildExt;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Mermaid CLI ({program}) not found. Ensure it is installed and in your PATH.")]
    ToolNotFound { program: String },
    #[error("An error occurred while generating the diagram: {stderr}")]
    Failed { exit_code: i32, stderr: String },
    #[error("Mermaid CLI ({program}) timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured outcome of one renderer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub succeeded: bool,
    pub standard_output: String,
    pub standard_error: String,
    /// `-1` when the process ended without an exit code (killed by a signal).
    pub exit_code: i32,
}

impl InvocationResult {
    fn from_status(status: ExitStatus, standard_output: String, standard_error: String) -> Self {
        Self {
            succeeded: status.success(),
            standard_output,
            standard_error,
            exit_code: status.code().unwrap_or(-1),
        }
    }

    pub fn into_success(self) -> Result<Self, RenderError> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(RenderError::Failed {
                exit_code: self.exit_code,
                stderr: self.standard_error,
            })
        }
    }
}

/// The external renderer: an executable, the arguments that precede the
/// `-i/-o/-c` flags (e.g. the mmdc script when launched through `npx`), and
/// an optional wait limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    pub program: String,
    pub leading_args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            program: DEFAULT_RENDERER.to_string(),
            leading_args: Vec::new(),
            timeout: None,
        }
    }
}

impl Renderer {
    pub fn from_script_config(script: &ScriptConfig) -> Self {
        let mut renderer = Self::default();
        if let Some(program) = script.renderer.as_deref().filter(|p| !p.is_empty()) {
            renderer.program = program.to_string();
        }
        if let Some(args) = &script.renderer_args {
            renderer.leading_args = args.clone();
        }
        renderer.timeout = script.timeout();
        renderer
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to the executable. No shell is involved, so paths
    /// need no quoting.
    pub fn args(&self, input: &Path, output: &Path, config: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        if let Some(config) = config {
            args.push("-c".into());
            args.push(config.as_os_str().to_owned());
        }
        args
    }

    /// Display form of the invocation, for logs and `--dry-run`.
    pub fn command_line(&self, input: &Path, output: &Path, config: Option<&Path>) -> String {
        let mut line = self.program.clone();
        for arg in &self.leading_args {
            line.push(' ');
            line.push_str(arg);
        }
        line.push(' ');
        line.push_str(&build_command_args(input, output, config));
        line
    }

    /// Runs the renderer once and waits for it.
    ///
    /// A non-zero exit is still `Ok`; check [`InvocationResult::succeeded`] or
    /// call [`InvocationResult::into_success`]. `Err` means the process could
    /// not be started, could not be waited on, or ran past the timeout.
    pub fn render(
        &self,
        input: &Path,
        output: &Path,
        config: Option<&Path>,
    ) -> Result<InvocationResult, RenderError> {
        debug!(command = %self.command_line(input, output, config), "running renderer");

        let program = self.locate()?;
        let mut command = Command::new(&program);
        command
            .args(self.args(input, output, config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so a timeout also takes down what npx or node spawn.
            if self.timeout.is_some() {
                command.process_group(0);
            }
        }
        let mut child = command.spawn().map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => RenderError::ToolNotFound {
                program: self.program.clone(),
            },
            _ => self.io_error(source),
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let result = InvocationResult::from_status(status, join(stdout), join(stderr));
        info!(
            exit_code = result.exit_code,
            succeeded = result.succeeded,
            "renderer finished"
        );
        Ok(result)
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, RenderError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| self.io_error(e));
        };
        match child.wait_timeout(timeout).map_err(|e| self.io_error(e))? {
            Some(status) => Ok(status),
            None => {
                kill_group(child).map_err(|e| self.io_error(e))?;
                // Reap so the killed renderer does not linger as a zombie.
                let _ = child.wait();
                Err(RenderError::TimedOut {
                    program: self.program.clone(),
                    timeout,
                })
            }
        }
    }

    /// Finds the executable on `PATH`, honouring `PATHEXT` on Windows so npm's
    /// `mmdc.cmd` and `npx.cmd` shims are found.
    pub fn locate(&self) -> Result<PathBuf, RenderError> {
        which::which(&self.program).map_err(|err| {
            debug!(program = %self.program, error = %err, "renderer lookup failed");
            RenderError::ToolNotFound {
                program: self.program.clone(),
            }
        })
    }

    fn io_error(&self, source: std::io::Error) -> RenderError {
        RenderError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: plain syscall; a negative pid addresses the group the child leads.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    child.kill()
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// `mmdc -i "<input>" -o "<output>" [-c "<config>"]` with the default
/// executable.
pub fn build_command(input: &Path, output: &Path, config: Option<&Path>) -> String {
    format!("{DEFAULT_RENDERER} {}", build_command_args(input, output, config))
}

fn build_command_args(input: &Path, output: &Path, config: Option<&Path>) -> String {
    let mut line = format!("-i \"{}\" -o \"{}\"", input.display(), output.display());
    if let Some(config) = config {
        line.push_str(&format!(" -c \"{}\"", config.display()));
    }
    line
}

/// Pipes are read on their own threads so a renderer that writes a lot
/// cannot block on a full pipe while we wait for it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

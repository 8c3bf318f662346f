// ─── Process Supervision ───
// Spawns external programs (java, processors), streams their output line by
// line and terminates them gracefully on cancellation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Program + arguments + working directory. No shell is involved.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

/// Run to completion, handing every output line to `on_line`.
///
/// Returns the exit code (`None` when killed by a signal). On cancellation the
/// child gets a graceful signal, then a forced kill after `grace`.
pub async fn run_streaming<F>(
    spec: &ProcessSpec,
    cancel: &CancellationToken,
    grace: Duration,
    mut on_line: F,
) -> LauncherResult<Option<i32>>
where
    F: FnMut(OutputStream, String),
{
    debug!("Spawning {:?} {:?} in {:?}", spec.program, spec.args, spec.cwd);

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            LauncherError::JavaExecution(format!("cannot start {:?}: {}", spec.program, e))
        })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(LauncherError::JavaExecution(format!(
            "no output pipes for {}",
            spec.display_name()
        )));
    };
    let mut stdout = BufReader::new(stdout).lines();
    let mut stderr = BufReader::new(stderr).lines();
    let (mut out_done, mut err_done) = (false, false);

    while !(out_done && err_done) {
        tokio::select! {
            line = stdout.next_line(), if !out_done => match line {
                Ok(Some(line)) => on_line(OutputStream::Stdout, line),
                _ => out_done = true,
            },
            line = stderr.next_line(), if !err_done => match line {
                Ok(Some(line)) => on_line(OutputStream::Stderr, line),
                _ => err_done = true,
            },
            _ = cancel.cancelled() => {
                terminate(&mut child, grace).await;
                return Err(LauncherError::Cancelled(spec.display_name()));
            }
        }
    }

    let status = tokio::select! {
        status = child.wait() => status.map_err(|e| LauncherError::io(&spec.program, e))?,
        _ = cancel.cancelled() => {
            terminate(&mut child, grace).await;
            return Err(LauncherError::Cancelled(spec.display_name()));
        }
    };

    Ok(status.code())
}

/// Graceful signal first; forced kill if still alive after `grace`.
pub async fn terminate(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        if send_graceful_signal(pid) {
            if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                debug!("Process {} exited after graceful signal", pid);
                return;
            }
            warn!("Process {} still alive after {:?}, forcing kill", pid, grace);
        }
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
}

/// SIGTERM straight to the child.
#[cfg(unix)]
fn send_graceful_signal(pid: u32) -> bool {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            warn!("SIGTERM to {} failed: {}", pid, e);
            false
        }
    }
}

// Sin señal equivalente: se pasa directo a start_kill.
#[cfg(not(unix))]
fn send_graceful_signal(_pid: u32) -> bool {
    false
}

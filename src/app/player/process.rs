use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, ExitStatus, Output, Stdio};

use tracing::{debug, info, warn};

use super::PlaybackError;
use super::environment::sanitized_env;

#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(unix)]
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A program plus its argument list, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl LaunchCommand {
    pub(crate) fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Wraps `program` in the configured command prefix, if any.
    pub(crate) fn prefixed(prefix: Vec<String>, program: PathBuf, args: Vec<String>) -> Self {
        let mut prefix = prefix.into_iter();
        let Some(wrapper) = prefix.next() else {
            return Self::new(program, args);
        };

        let mut wrapped = prefix.collect::<Vec<_>>();
        wrapped.push(program.to_string_lossy().into_owned());
        wrapped.extend(args);
        Self::new(PathBuf::from(wrapper), wrapped)
    }

    pub(crate) fn program(&self) -> &Path {
        &self.program
    }

    pub(crate) fn args(&self) -> &[String] {
        &self.args
    }

    fn display_name(&self) -> String {
        self.program().display().to_string()
    }

    fn build(&self) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.program);
        cmd.args(&self.args).env_clear().envs(sanitized_env());
        cmd
    }
}

#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Option<String>,
}

/// Runs `command` to completion in the foreground. When `capture_stdout` is
/// set, stdout is collected instead of reaching the terminal.
pub(crate) fn run_blocking(
    command: &LaunchCommand,
    capture_stdout: bool,
) -> Result<RunOutcome, PlaybackError> {
    let program = command.display_name();
    let mut cmd = command.build();
    cmd.stdin(Stdio::inherit()).stderr(Stdio::inherit());
    if capture_stdout {
        cmd.stdout(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
    }

    info!(program = %program, args = ?command.args(), "launching");
    let output = with_sigint_ignored(&program, || run_interactive_cmd(cmd, &program))?;

    if !output.status.success() {
        // Players exit non-zero when the user quits mid-stream; keep whatever they reported.
        warn!(program = %program, status = %output.status, "process exited unsuccessfully");
    }

    let stdout = capture_stdout.then(|| String::from_utf8_lossy(&output.stdout).into_owned());
    Ok(RunOutcome {
        status: output.status,
        stdout,
    })
}

/// Starts `command` without waiting; the returned handle owns the child.
pub(crate) fn spawn_background(
    command: &LaunchCommand,
    socket_path: &str,
) -> Result<PlayerHandle, PlaybackError> {
    let program = command.display_name();
    info!(program = %program, socket = socket_path, "starting player with ipc server");
    let child = command
        .build()
        .spawn()
        .map_err(|source| PlaybackError::Launch {
            program: program.clone(),
            source,
        })?;
    debug!(pid = child.id(), "player started");

    Ok(PlayerHandle {
        child,
        program,
        socket_path: socket_path.to_string(),
    })
}

/// A running player exposing a control channel. Dropping the handle leaves
/// the player running.
#[derive(Debug)]
pub(crate) struct PlayerHandle {
    child: Child,
    program: String,
    socket_path: String,
}

impl PlayerHandle {
    pub(crate) fn id(&self) -> u32 {
        self.child.id()
    }

    pub(crate) fn socket_path(&self) -> &str {
        &self.socket_path
    }

    pub(crate) fn is_running(&mut self) -> Result<bool, PlaybackError> {
        let exited = self
            .child
            .try_wait()
            .map_err(|source| self.wait_error(source))?;
        Ok(exited.is_none())
    }

    pub(crate) fn wait(&mut self) -> Result<ExitStatus, PlaybackError> {
        self.child.wait().map_err(|source| self.wait_error(source))
    }

    pub(crate) fn terminate(&mut self) -> Result<ExitStatus, PlaybackError> {
        if self.is_running()? {
            match self.child.kill() {
                Ok(()) => {}
                // Exited between the check and the kill.
                Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
                Err(source) => return Err(self.wait_error(source)),
            }
        }
        self.wait()
    }

    fn wait_error(&self, source: io::Error) -> PlaybackError {
        PlaybackError::Wait {
            program: self.program.clone(),
            source,
        }
    }
}

/// Process-wide ignore count for one signal. Overlapping launches share a
/// single saved disposition: the first holder installs `SIG_IGN`, the last
/// one out restores what was there before.
#[cfg(unix)]
struct SharedSigaction {
    signum: libc::c_int,
    state: Mutex<SigactionState>,
}

#[cfg(unix)]
struct SigactionState {
    holders: usize,
    old_action: Option<libc::sigaction>,
}

#[cfg(unix)]
static SIGINT_IGNORE: SharedSigaction = SharedSigaction::new(libc::SIGINT);
#[cfg(unix)]
static SIGTTOU_IGNORE: SharedSigaction = SharedSigaction::new(libc::SIGTTOU);

#[cfg(unix)]
impl SharedSigaction {
    const fn new(signum: libc::c_int) -> Self {
        Self {
            signum,
            state: Mutex::new(SigactionState {
                holders: 0,
                old_action: None,
            }),
        }
    }

    fn ignore(&'static self) -> io::Result<ScopedSigaction> {
        let mut state = lock(&self.state);
        if state.holders == 0 {
            state.old_action = Some(install_ignore(self.signum)?);
        }
        state.holders += 1;
        Ok(ScopedSigaction { shared: self })
    }
}

#[cfg(unix)]
fn install_ignore(signum: libc::c_int) -> io::Result<libc::sigaction> {
    unsafe {
        let mut new_action: libc::sigaction = std::mem::zeroed();
        new_action.sa_sigaction = libc::SIG_IGN;
        libc::sigemptyset(&mut new_action.sa_mask);
        new_action.sa_flags = 0;

        let mut old_action: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(signum, &new_action, &mut old_action) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(old_action)
    }
}

#[cfg(unix)]
struct ScopedSigaction {
    shared: &'static SharedSigaction,
}

#[cfg(unix)]
impl Drop for ScopedSigaction {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.holders = state.holders.saturating_sub(1);
        if state.holders > 0 {
            return;
        }
        if let Some(old_action) = state.old_action.take() {
            unsafe {
                let _ = libc::sigaction(self.shared.signum, &old_action, std::ptr::null_mut());
            }
        }
    }
}

/// Foreground process groups handed the terminal by overlapping launches.
/// The terminal goes back to `parent_pgrp` only once none are left.
#[cfg(unix)]
struct ForegroundState {
    parent_pgrp: libc::pid_t,
    children: Vec<libc::pid_t>,
}

#[cfg(unix)]
static FOREGROUND: Mutex<ForegroundState> = Mutex::new(ForegroundState {
    parent_pgrp: -1,
    children: Vec::new(),
});

#[cfg(unix)]
struct TerminalForegroundGuard {
    stdin_fd: libc::c_int,
    child_pgrp: Option<libc::pid_t>,
}

#[cfg(unix)]
impl TerminalForegroundGuard {
    fn new(stdin_fd: libc::c_int) -> Self {
        Self {
            stdin_fd,
            child_pgrp: None,
        }
    }

    fn handoff_to_child(&mut self, child_pgrp: libc::pid_t) {
        let mut state = lock(&FOREGROUND);
        if state.children.is_empty() {
            state.parent_pgrp = unsafe { libc::tcgetpgrp(self.stdin_fd) };
        }
        if unsafe { libc::tcsetpgrp(self.stdin_fd, child_pgrp) } == 0 {
            state.children.push(child_pgrp);
            self.child_pgrp = Some(child_pgrp);
        }
    }
}

#[cfg(unix)]
impl Drop for TerminalForegroundGuard {
    fn drop(&mut self) {
        let Some(child_pgrp) = self.child_pgrp else {
            return;
        };
        let mut state = lock(&FOREGROUND);
        state.children.retain(|pgrp| *pgrp != child_pgrp);
        let next = state.children.last().copied().unwrap_or(state.parent_pgrp);
        if next != -1 {
            unsafe {
                let _ = libc::tcsetpgrp(self.stdin_fd, next);
            }
        }
    }
}

#[cfg(unix)]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
fn with_sigint_ignored<F, R>(program: &str, f: F) -> Result<R, PlaybackError>
where
    F: FnOnce() -> Result<R, PlaybackError>,
{
    let _sigint_guard = SIGINT_IGNORE.ignore().map_err(|source| PlaybackError::Launch {
        program: program.to_string(),
        source,
    })?;
    f()
}

#[cfg(not(unix))]
fn with_sigint_ignored<F, R>(_program: &str, f: F) -> Result<R, PlaybackError>
where
    F: FnOnce() -> Result<R, PlaybackError>,
{
    f()
}

#[cfg(unix)]
fn run_interactive_cmd(mut cmd: ProcessCommand, program: &str) -> Result<Output, PlaybackError> {
    let stdin_fd = libc::STDIN_FILENO;
    if unsafe { libc::tcgetpgrp(stdin_fd) } == -1 {
        // No controlling terminal; nothing to hand over.
        return spawn_and_wait(cmd, program);
    }

    let _sigttou_guard = SIGTTOU_IGNORE.ignore().map_err(|source| PlaybackError::Launch {
        program: program.to_string(),
        source,
    })?;
    let mut terminal_guard = TerminalForegroundGuard::new(stdin_fd);

    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            if libc::setpgid(0, 0) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(|source| PlaybackError::Launch {
        program: program.to_string(),
        source,
    })?;
    terminal_guard.handoff_to_child(child.id() as libc::pid_t);
    child.wait_with_output().map_err(|source| PlaybackError::Wait {
        program: program.to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn run_interactive_cmd(cmd: ProcessCommand, program: &str) -> Result<Output, PlaybackError> {
    spawn_and_wait(cmd, program)
}

fn spawn_and_wait(mut cmd: ProcessCommand, program: &str) -> Result<Output, PlaybackError> {
    let child = cmd.spawn().map_err(|source| PlaybackError::Launch {
        program: program.to_string(),
        source,
    })?;
    child.wait_with_output().map_err(|source| PlaybackError::Wait {
        program: program.to_string(),
        source,
    })
}

//! Build orchestration.
//!
//! [`BuildOrchestrator`] owns at most one build session at a time. `start`
//! prepares the scoped temporary files, spawns the packaging engine and hands
//! the child to a driver task. The driver is the only writer of log and
//! progress: one reader task per output stream forwards chunks over its own
//! channel, and the driver consumes both channels, the child's exit and the
//! session's cancellation token.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::bundler::{BuildOrchestrator, ConfigurationBuilder};
//!
//! # async fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
//! let configuration = ConfigurationBuilder::new()
//!     .identifier("com.acme.app")
//!     .version("2.0")
//!     .build()?;
//!
//! let orchestrator = BuildOrchestrator::new();
//! orchestrator.start(&configuration, "/tmp/a.dmg", "/tmp/a.pkg").await?;
//! let state = orchestrator.wait().await;
//! println!("build finished: {}", state);
//! # Ok(())
//! # }
//! ```

use super::progress::{LineWindow, SPAWNED_PROGRESS};
use super::scratch::{POSTINSTALL_PREFIX, PREINSTALL_PREFIX, ScratchFiles};
use super::session::{
    BuildFailure, BuildSession, BuildState, FailureKind, SessionSnapshot, SessionStatus,
};
use super::tool_detection::EngineLocator;
use crate::bundler::settings::{BuildConfiguration, ScriptPaths, Severity};
use crate::bundler::{Error, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long a cancelled engine gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// How long buffered output is drained after the engine exits.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Stderr lines quoted in an exit failure message.
const STDERR_TAIL_LINES: usize = 20;

const OUTPUT_CHANNEL_CAPACITY: usize = 256;
const READ_BUFFER_SIZE: usize = 8192;
const BROADCAST_CAPACITY: usize = 1024;

/// "Text file busy": another thread forked while the engine copy was open.
const ETXTBSY: i32 = 26;
const SPAWN_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Stream an output chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Engine output as it was read: any size, not necessarily whole lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
}

struct Inner {
    session: BuildSession,
    cancel: CancellationToken,
}

struct Shared {
    inner: Mutex<Inner>,
    status: watch::Sender<SessionStatus>,
    output: broadcast::Sender<OutputChunk>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.status.send_replace(inner.session.status());
    }

    fn ingest(&self, stream: OutputStream, text: String, lines: &[String]) {
        log::debug!("[engine {}] {}", stream, text.trim_end());
        {
            let mut inner = self.lock();
            if !inner.session.state.is_running() {
                // Cancelled: output still drains but no longer counts.
                inner.session.log.append(&text);
            } else {
                inner.session.ingest(&text, lines.iter().map(String::as_str));
            }
            self.publish(&inner);
        }
        // No subscribers is fine.
        let _ = self.output.send(OutputChunk { stream, text });
    }

    fn finish(&self, state: BuildState) {
        let mut inner = self.lock();
        let summary = state.to_string();
        if inner.session.finish(state) {
            log::info!("Build session {} {}", inner.session.id, summary);
        }
        self.publish(&inner);
    }
}

/// Runs the packaging engine, one session at a time.
pub struct BuildOrchestrator {
    shared: Arc<Shared>,
    control: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    locator: EngineLocator,
    scratch_dir: PathBuf,
    termination_grace: Duration,
    drain_grace: Duration,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("state", &self.state())
            .field("locator", &self.locator)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl Default for BuildOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildOrchestrator {
    /// Orchestrator locating the engine from the environment and writing
    /// scratch files to the system temporary directory.
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus {
            settled: true,
            ..Default::default()
        });
        let (output, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session: BuildSession::default(),
                    cancel: CancellationToken::new(),
                }),
                status,
                output,
            }),
            control: tokio::sync::Mutex::new(None),
            locator: EngineLocator::from_env(),
            scratch_dir: std::env::temp_dir(),
            termination_grace: DEFAULT_TERMINATION_GRACE,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    pub fn with_engine_locator(mut self, locator: EngineLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Uses the engine at `path` and nothing else.
    pub fn with_engine(self, path: impl AsRef<Path>) -> Self {
        self.with_engine_locator(EngineLocator::explicit(path))
    }

    pub fn with_scratch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.scratch_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Starts a build.
    ///
    /// Rejected with [`Error::AlreadyRunning`] while a build runs and with
    /// [`Error::Validation`] when the configuration has hard issues; in both
    /// cases the session is left untouched. Failures while preparing files or
    /// spawning the engine move the session to `Failed` and are returned too.
    pub async fn start(
        &self,
        configuration: &BuildConfiguration,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<()> {
        let mut control = self.control.lock().await;

        if self.shared.lock().session.state.is_running() {
            return Err(Error::AlreadyRunning);
        }

        let report = configuration.validate();
        if report.has_errors() {
            let issues = report
                .issues
                .into_iter()
                .filter(|issue| issue.severity() == Severity::Error)
                .collect();
            return Err(Error::Validation(issues));
        }

        // A cancelled session may still be cleaning up.
        if let Some(previous) = control.take() {
            join_driver(previous).await;
        }

        let cancel = CancellationToken::new();
        {
            let mut inner = self.shared.lock();
            inner.session.begin();
            inner.session.cleanup_pending = true;
            inner.cancel = cancel.clone();
            log::info!(
                "Build session {} started for {}",
                inner.session.id,
                configuration.identifier
            );
            self.shared.publish(&inner);
        }

        let mut scratch = ScratchFiles::new(&self.scratch_dir);
        let launched = self
            .launch(&mut scratch, configuration, input.as_ref(), output.as_ref())
            .await;
        self.shared.lock().session.resources = scratch.paths();

        let child = match launched {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Build could not start: {}", e);
                scratch.release();
                self.shared.finish(BuildState::Failed(BuildFailure::from(&e)));
                self.settle();
                return Err(e);
            }
        };

        {
            let mut inner = self.shared.lock();
            inner.session.progress.raise(SPAWNED_PROGRESS);
            self.shared.publish(&inner);
        }

        let driver = Driver {
            guard: CleanupGuard {
                shared: Arc::clone(&self.shared),
                scratch,
            },
            cancel,
            termination_grace: self.termination_grace,
            drain_grace: self.drain_grace,
        };
        *control = Some(tokio::spawn(driver.run(child)));
        Ok(())
    }

    /// Requests cancellation. The state becomes `Cancelled` at once; the
    /// engine is terminated and cleaned up in the background.
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        if !inner.session.state.is_running() {
            return Err(Error::NotRunning);
        }
        inner.session.finish(BuildState::Cancelled);
        inner.cancel.cancel();
        log::info!("Build session {} cancelled", inner.session.id);
        self.shared.publish(&inner);
        Ok(())
    }

    /// Returns to `Idle` once any pending cleanup has finished.
    pub async fn reset(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        if self.shared.lock().session.state.is_running() {
            return Err(Error::AlreadyRunning);
        }
        if let Some(previous) = control.take() {
            join_driver(previous).await;
        }

        let mut inner = self.shared.lock();
        inner.session = BuildSession::default();
        inner.cancel = CancellationToken::new();
        self.shared.publish(&inner);
        Ok(())
    }

    /// Waits until the session is terminal and its files are released.
    pub async fn wait(&self) -> BuildState {
        let mut status = self.shared.status.subscribe();
        let settled = match status.wait_for(|s| s.settled).await {
            Ok(settled) => Some(settled.state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state())
    }

    pub fn state(&self) -> BuildState {
        self.shared.lock().session.state.clone()
    }

    pub fn progress(&self) -> f64 {
        self.shared.lock().session.progress.value()
    }

    pub fn log(&self) -> String {
        self.shared.lock().session.log.as_str().to_string()
    }

    /// Temporary files created for the current session.
    pub fn temp_resources(&self) -> Vec<PathBuf> {
        self.shared.lock().session.resources.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.snapshot()
    }

    /// Receiver of status updates.
    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Receiver of engine output chunks.
    pub fn subscribe_output(&self) -> broadcast::Receiver<OutputChunk> {
        self.shared.output.subscribe()
    }

    fn settle(&self) {
        let mut inner = self.shared.lock();
        inner.session.cleanup_pending = false;
        self.shared.publish(&inner);
    }

    async fn launch(
        &self,
        scratch: &mut ScratchFiles,
        configuration: &BuildConfiguration,
        input: &Path,
        output: &Path,
    ) -> Result<Child> {
        let (_, engine) = self.locator.locate()?;
        let engine_copy = scratch.copy_engine(&engine)?;

        let mut scripts = ScriptPaths::default();
        if configuration.wants_preinstall_file() {
            scripts.preinstall =
                Some(scratch.write_script(PREINSTALL_PREFIX, &configuration.preinstall_script)?);
        }
        if configuration.wants_postinstall_file() {
            scripts.postinstall =
                Some(scratch.write_script(POSTINSTALL_PREFIX, &configuration.postinstall_script)?);
        }

        let args = configuration.to_arguments_with_scripts(input, output, &scripts);
        log::debug!("Running {} {}", engine.display(), args.join(" "));
        spawn_engine(&engine_copy, &args).await
    }
}

async fn spawn_engine(program: &Path, args: &[String]) -> Result<Child> {
    let mut attempt = 1;
    loop {
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => return Ok(child),
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempt < SPAWN_ATTEMPTS => {
                log::debug!("Engine busy on spawn attempt {}, retrying", attempt);
                attempt += 1;
                tokio::time::sleep(SPAWN_RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(Error::EngineLaunch(format!(
                    "failed to spawn {}: {}",
                    program.display(),
                    e
                )));
            }
        }
    }
}

async fn join_driver(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        log::warn!("Build driver task ended abnormally: {}", e);
    }
}

/// Releases the scratch files and settles the session exactly once, even if
/// the driver panics.
struct CleanupGuard {
    shared: Arc<Shared>,
    scratch: ScratchFiles,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.scratch.release();
        let mut inner = self.shared.lock();
        if inner.session.finish(BuildState::Failed(BuildFailure::new(
            FailureKind::ProcessExit { code: -1 },
            "build driver stopped before the engine finished",
        ))) {
            log::warn!("Build session {} abandoned", inner.session.id);
        }
        inner.session.cleanup_pending = false;
        self.shared.publish(&inner);
    }
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
}

struct Driver {
    guard: CleanupGuard,
    cancel: CancellationToken,
    termination_grace: Duration,
    drain_grace: Duration,
}

impl Driver {
    async fn run(self, mut child: Child) {
        let shared = Arc::clone(&self.guard.shared);
        let (out_tx, mut out_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (err_tx, mut err_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, out_tx));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, err_tx));
        }

        let mut tail = StderrTail::default();
        let mut out_window = LineWindow::default();
        let mut err_window = LineWindow::default();
        let mut out_open = true;
        let mut err_open = true;

        let outcome = loop {
            tokio::select! {
                chunk = out_rx.recv(), if out_open => match chunk {
                    Some(text) => forward(
                        &shared,
                        OutputStream::Stdout,
                        text,
                        &mut out_window,
                        &mut tail,
                    ),
                    None => out_open = false,
                },
                chunk = err_rx.recv(), if err_open => match chunk {
                    Some(text) => forward(
                        &shared,
                        OutputStream::Stderr,
                        text,
                        &mut err_window,
                        &mut tail,
                    ),
                    None => err_open = false,
                },
                status = child.wait() => break Outcome::Exited(status),
                _ = self.cancel.cancelled() => break Outcome::Cancelled,
            }
        };

        match outcome {
            Outcome::Cancelled => {
                terminate(&mut child, self.termination_grace).await;
            }
            Outcome::Exited(status) => {
                let drain = async {
                    while out_open || err_open {
                        tokio::select! {
                            chunk = out_rx.recv(), if out_open => match chunk {
                                Some(text) => forward(
                                    &shared,
                                    OutputStream::Stdout,
                                    text,
                                    &mut out_window,
                                    &mut tail,
                                ),
                                None => out_open = false,
                            },
                            chunk = err_rx.recv(), if err_open => match chunk {
                                Some(text) => forward(
                                    &shared,
                                    OutputStream::Stderr,
                                    text,
                                    &mut err_window,
                                    &mut tail,
                                ),
                                None => err_open = false,
                            },
                        }
                    }
                };
                if tokio::time::timeout(self.drain_grace, drain).await.is_err() {
                    log::debug!("Engine output still open after exit, abandoning readers");
                }
                if let Some(open) = err_window.flush() {
                    tail.push(&open);
                }

                let state = match status {
                    Ok(status) => terminal_state(status, &tail),
                    Err(e) => BuildState::Failed(BuildFailure::new(
                        FailureKind::EngineLaunch,
                        format!("failed to wait for packaging engine: {}", e),
                    )),
                };
                shared.finish(state);
            }
        }

        for reader in readers {
            reader.abort();
        }
        drop(self.guard);
    }
}

/// Routes one chunk to the log, progress, subscribers and the stderr tail.
fn forward(
    shared: &Shared,
    stream: OutputStream,
    text: String,
    window: &mut LineWindow,
    tail: &mut StderrTail,
) {
    let lines = window.feed(&text);
    if stream == OutputStream::Stderr {
        for line in lines.iter().filter(|line| line.ends_with('\n')) {
            tail.push(line);
        }
    }
    shared.ingest(stream, text, &lines);
}

/// Forwards whatever each read returns, without waiting for a newline.
fn spawn_reader<R>(mut stream: R, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let mut pending = Vec::new();
        loop {
            match stream.read(&mut buffer).await {
                Ok(0) => {
                    if !pending.is_empty() {
                        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned()).await;
                    }
                    break;
                }
                Ok(n) => {
                    pending.extend_from_slice(&buffer[..n]);
                    let text = decode_available(&mut pending);
                    if text.is_empty() {
                        continue;
                    }
                    if tx.send(text).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Engine output read failed: {}", e);
                    break;
                }
            }
        }
    })
}

/// Decodes `pending`, holding back a UTF-8 sequence cut off by the read.
fn decode_available(pending: &mut Vec<u8>) -> String {
    let incomplete = match std::str::from_utf8(pending) {
        Err(e) if e.error_len().is_none() => pending.len() - e.valid_up_to(),
        _ => 0,
    };
    let rest = pending.split_off(pending.len() - incomplete);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

/// SIGTERM first, then a hard kill once the grace period runs out.
async fn terminate(child: &mut Child, grace: Duration) {
    send_sigterm(child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => log::debug!("Cancelled engine exited with {}", status),
        Ok(Err(e)) => log::debug!("Failed to reap cancelled engine: {}", e),
        Err(_) => {
            log::warn!(
                "Packaging engine ignored SIGTERM for {}s, killing",
                grace.as_secs_f32()
            );
            if let Err(e) = child.start_kill() {
                log::warn!("Failed to kill packaging engine: {}", e);
            }
            let _ = child.wait().await;
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        log::debug!("SIGTERM to engine {} failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) {
    let _ = child.start_kill();
}

fn terminal_state(status: ExitStatus, tail: &StderrTail) -> BuildState {
    if status.success() {
        return BuildState::Completed;
    }
    if was_interrupted(&status) {
        return BuildState::Cancelled;
    }

    let code = status.code().unwrap_or(-1);
    let mut message = Error::ProcessExit { code }.to_string();
    if !tail.is_empty() {
        message.push_str(":\n");
        message.push_str(&tail.render());
    }
    BuildState::Failed(BuildFailure::new(FailureKind::ProcessExit { code }, message))
}

/// Only a SIGINT or SIGTERM death counts; exit codes are reported as they are.
#[cfg(unix)]
fn was_interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status
        .signal()
        .is_some_and(|signal| signal == nix::libc::SIGINT || signal == nix::libc::SIGTERM)
}

#[cfg(not(unix))]
fn was_interrupted(_status: &ExitStatus) -> bool {
    false
}

/// Last stderr lines, for failure messages.
#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
}

impl StderrTail {
    fn push(&mut self, text: &str) {
        let line = text.trim_end();
        if line.is_empty() {
            return;
        }
        if self.lines.len() == STDERR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

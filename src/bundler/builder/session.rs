//! Build session state.

use super::progress::Progress;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Log size above which the oldest half is dropped.
pub const LOG_CEILING: usize = 100_000;

/// What went wrong, without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Engine missing or not spawnable.
    EngineLaunch,
    /// Engine exited non-zero.
    ProcessExit { code: i32 },
    /// A temporary script or engine copy could not be written.
    TemporaryResource,
}

/// A failed build: the kind plus a human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl BuildFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Exit code, for engine exit failures.
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            FailureKind::ProcessExit { code } => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&crate::bundler::Error> for BuildFailure {
    fn from(error: &crate::bundler::Error) -> Self {
        use crate::bundler::Error;
        let kind = match error {
            Error::ProcessExit { code } => FailureKind::ProcessExit { code: *code },
            Error::TemporaryResource { .. } => FailureKind::TemporaryResource,
            _ => FailureKind::EngineLaunch,
        };
        Self::new(kind, error.to_string())
    }
}

/// Session lifecycle.
///
/// `PartialEq` compares full detail. Use [`BuildState::tag`] to compare
/// variants only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BuildState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed(BuildFailure),
    Cancelled,
}

/// Variant of a [`BuildState`] without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTag {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl BuildState {
    pub fn tag(&self) -> StateTag {
        match self {
            Self::Idle => StateTag::Idle,
            Self::Running => StateTag::Running,
            Self::Completed => StateTag::Completed,
            Self::Failed(_) => StateTag::Failed,
            Self::Cancelled => StateTag::Cancelled,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }

    pub fn failure(&self) -> Option<&BuildFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(failure) => write!(f, "failed: {}", failure),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Engine output accumulated for display, bounded by [`LOG_CEILING`].
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    text: String,
    ceiling: usize,
}

impl SessionLog {
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            text: String::new(),
            ceiling,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Appends a chunk. Past the ceiling the oldest half is dropped, cut just
    /// after a newline so no line is left truncated.
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if self.ceiling == 0 || self.text.len() <= self.ceiling {
            return;
        }

        let mut half = self.text.len() / 2;
        while !self.text.is_char_boundary(half) {
            half += 1;
        }
        // A single line longer than the remaining half cannot be kept whole.
        let cut = match self.text[half..].find('\n') {
            Some(offset) => half + offset + 1,
            None => half,
        };
        self.text.drain(..cut);
    }
}

/// One build session. Owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct BuildSession {
    pub(crate) id: Uuid,
    pub(crate) state: BuildState,
    pub(crate) log: SessionLog,
    pub(crate) progress: Progress,
    pub(crate) resources: Vec<PathBuf>,
    pub(crate) cleanup_pending: bool,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl Default for BuildSession {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            state: BuildState::Idle,
            log: SessionLog::with_ceiling(LOG_CEILING),
            progress: Progress::default(),
            resources: Vec::new(),
            cleanup_pending: false,
            started_at: None,
            finished_at: None,
        }
    }
}

impl BuildSession {
    /// Fresh running session.
    pub(crate) fn begin(&mut self) {
        *self = Self {
            id: Uuid::new_v4(),
            state: BuildState::Running,
            started_at: Some(Utc::now()),
            ..Default::default()
        };
    }

    /// Moves to a terminal state unless one was already reached.
    pub(crate) fn finish(&mut self, state: BuildState) -> bool {
        if !self.state.is_running() {
            return false;
        }
        if state == BuildState::Completed {
            self.progress.raise(super::progress::COMPLETED_PROGRESS);
        }
        self.state = state;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Appends `chunk` to the log and scans the lines it touched.
    pub(crate) fn ingest<'a>(&mut self, chunk: &str, lines: impl IntoIterator<Item = &'a str>) {
        self.log.append(chunk);
        for line in lines {
            self.progress.observe(line);
        }
    }

    pub(crate) fn settled(&self) -> bool {
        !self.state.is_running() && !self.cleanup_pending
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state.clone(),
            progress: self.progress.value(),
            settled: self.settled(),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state.clone(),
            progress: self.progress.value(),
            log: self.log.as_str().to_string(),
            resources: self.resources.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Lightweight status published on every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub state: BuildState,
    pub progress: f64,
    /// Not running and every temporary resource has been released.
    pub settled: bool,
}

/// Point-in-time copy of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: BuildState,
    pub progress: f64,
    pub log: String,
    /// Temporary files owned by the session, kept for inspection after release.
    pub resources: Vec<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drops_oldest_half_at_line_boundary() {
        let mut log = SessionLog::with_ceiling(100);
        for i in 0..12 {
            log.append(&format!("line {:03}\n", i));
        }
        // 12 lines of 9 bytes = 108 > 100
        assert!(log.len() <= 100);
        assert!(log.as_str().starts_with("line "));
        assert!(log.as_str().ends_with("line 011\n"));
        assert!(!log.as_str().contains("line 000"));
    }

    #[test]
    fn log_without_newline_still_bounded() {
        let mut log = SessionLog::with_ceiling(10);
        log.append(&"x".repeat(30));
        assert_eq!(log.len(), 15);
    }

    #[test]
    fn log_cut_respects_utf8() {
        let mut log = SessionLog::with_ceiling(8);
        log.append("ééééé\nok\n");
        assert!(log.as_str().ends_with("ok\n"));
    }

    #[test]
    fn tags_ignore_failure_payload() {
        let a = BuildState::Failed(BuildFailure::new(FailureKind::ProcessExit { code: 1 }, "a"));
        let b = BuildState::Failed(BuildFailure::new(FailureKind::EngineLaunch, "b"));
        assert_ne!(a, b);
        assert_eq!(a.tag(), b.tag());
        assert_eq!(a.failure().and_then(BuildFailure::exit_code), Some(1));
    }

    #[test]
    fn finish_only_from_running() {
        let mut session = BuildSession::default();
        assert!(!session.finish(BuildState::Completed));
        session.begin();
        assert!(session.finish(BuildState::Cancelled));
        assert!(!session.finish(BuildState::Completed));
        assert_eq!(session.state, BuildState::Cancelled);
        assert_eq!(session.progress.value(), 0.0);
    }

    #[test]
    fn completion_reaches_one() {
        let mut session = BuildSession::default();
        session.begin();
        session.ingest("running pkgbuild\n", ["running pkgbuild\n"]);
        assert_eq!(session.progress.value(), 0.7);
        session.finish(BuildState::Completed);
        assert_eq!(session.progress.value(), 1.0);
    }
}

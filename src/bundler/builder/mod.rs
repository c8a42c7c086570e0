//! Build orchestration.
//!
//! This module drives one packaging engine invocation at a time through
//! [`BuildOrchestrator`], from validated configuration to a terminal
//! [`BuildState`].
//!
//! # Module Organization
//!
//! - [`checksum`] - size and SHA-256 of the produced package
//! - [`orchestrator`] - session lifecycle, engine process and output streaming
//! - [`progress`] - ordered phrase table turning engine output into progress
//! - [`scratch`] - scoped temporary engine copy and install scripts
//! - [`session`] - session state, failure taxonomy and bounded log
//! - [`tool_detection`] - packaging engine lookup

pub mod checksum;
pub mod orchestrator;
pub mod progress;
pub mod scratch;
pub mod session;
pub mod tool_detection;

pub use checksum::PackageArtifact;
pub use orchestrator::{BuildOrchestrator, OutputChunk, OutputStream};
pub use progress::{PROGRESS_RULES, Phrase, Progress, ProgressRule};
pub use scratch::ScratchFiles;
pub use session::{
    BuildFailure, BuildState, FailureKind, LOG_CEILING, SessionLog, SessionSnapshot,
    SessionStatus, StateTag,
};
pub use tool_detection::{ENGINE_ENV, ENGINE_NAME, EngineLocator, EngineSource};

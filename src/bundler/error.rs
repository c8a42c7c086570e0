//! Error types for package building.
//!
//! [`Error`] covers the whole build taxonomy: configuration validation,
//! engine launch, engine exit, cancellation and temporary resource failures.
//! [`ErrorExt`] attaches file system context to I/O failures.

use crate::bundler::settings::ValidationIssue;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the bundler library.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is incomplete or malformed. Nothing was spawned.
    #[error("invalid configuration: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The packaging engine is missing or could not be spawned.
    #[error("packaging engine could not be launched: {0}")]
    EngineLaunch(String),

    /// The packaging engine ran and reported failure.
    #[error("packaging engine failed with exit code {code}")]
    ProcessExit {
        /// Exit code reported by the engine (-1 when killed by a signal)
        code: i32,
    },

    /// The build was cancelled by the caller.
    #[error("build was cancelled")]
    Cancelled,

    /// A temporary script or engine copy could not be written.
    #[error("failed to prepare temporary resource {}: {source}", .path.display())]
    TemporaryResource {
        /// Path of the resource being written
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// `start` was called while a build is running.
    #[error("a build is already running")]
    AlreadyRunning,

    /// `cancel` was called while no build is running.
    #[error("no build is running")]
    NotRunning,

    /// File system operation failed on a specific path.
    #[error("{context} {}: {source}", .path.display())]
    Fs {
        /// What was being done
        context: String,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Property list could not be parsed.
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// Anything else, with a message.
    #[error("{0}")]
    GenericError(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Attaches file system context to I/O results.
pub trait ErrorExt<T> {
    /// Converts an I/O error into [`Error::Fs`] naming the operation and path.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = Error::Validation(vec![
            ValidationIssue::MissingIdentifier,
            ValidationIssue::MissingVersion,
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: identifier is required; version is required"
        );
    }

    #[test]
    fn fs_context_names_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = result
            .fs_context("reading engine", "/tmp/engine.sh")
            .unwrap_err();
        assert_eq!(err.to_string(), "reading engine /tmp/engine.sh: gone");
    }
}

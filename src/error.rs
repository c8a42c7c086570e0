//! Application error types.
//!
//! [`BundlerError`] is what the command line front end deals in. Library
//! failures arrive wrapped as [`BundlerError::Bundler`]; argument and file
//! problems are [`CliError`]s.

use crate::bundler::ValidationIssue;
use crate::bundler::builder::tool_detection::ENGINE_ENV;
use thiserror::Error;

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Library errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Named preset does not exist
    #[error("Unknown preset: {name}")]
    UnknownPreset {
        /// Requested name
        name: String,
    },

    /// Configuration or script file could not be read
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// File path
        path: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Actionable hints for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error;

        match self {
            Self::Bundler(Error::EngineLaunch(_)) => vec![
                "Pass the engine with --engine <path>".to_string(),
                format!("Or set {} to the engine path", ENGINE_ENV),
            ],
            Self::Bundler(Error::Validation(issues)) => {
                let mut hints = vec![
                    "Provide --identifier and --version, or an input the classifier understands"
                        .to_string(),
                ];
                if issues.contains(&ValidationIssue::RelativeInstallLocation) {
                    hints.push("Pass an absolute install location with --location".to_string());
                }
                hints
            }
            Self::Cli(CliError::UnknownPreset { .. }) => {
                vec!["Run with --list-presets to see available presets".to_string()]
            }
            Self::Toml(_) => vec!["Check the configuration file syntax".to_string()],
            _ => Vec::new(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bundler(crate::bundler::Error::ProcessExit { code }) if *code > 0 => *code,
            Self::Bundler(crate::bundler::Error::Cancelled) => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let exit = BundlerError::from(crate::bundler::Error::ProcessExit { code: 3 });
        assert_eq!(exit.exit_code(), 3);
        assert_eq!(BundlerError::from(crate::bundler::Error::Cancelled).exit_code(), 130);
        let killed = BundlerError::from(crate::bundler::Error::ProcessExit { code: -1 });
        assert_eq!(killed.exit_code(), 1);
    }

    #[test]
    fn engine_launch_suggests_flag() {
        let err = BundlerError::from(crate::bundler::Error::EngineLaunch("missing".into()));
        assert!(
            err.recovery_suggestions()
                .iter()
                .any(|s| s.contains("--engine"))
        );
    }

    #[test]
    fn relative_location_suggests_flag() {
        let err = BundlerError::from(crate::bundler::Error::Validation(vec![
            ValidationIssue::RelativeInstallLocation,
        ]));
        assert!(
            err.recovery_suggestions()
                .iter()
                .any(|s| s.contains("--location"))
        );
    }
}

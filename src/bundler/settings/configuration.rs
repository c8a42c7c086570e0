//! Build configuration, validation and engine argument serialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default preinstall script written when the user enables the hook without
/// providing their own text.
pub const DEFAULT_PREINSTALL_SCRIPT: &str =
    "#!/bin/bash\n# Pre-installation script\necho \"Preparing installation...\"\nexit 0";

/// Default postinstall script.
pub const DEFAULT_POSTINSTALL_SCRIPT: &str =
    "#!/bin/bash\n# Post-installation script\necho \"Installation complete.\"\nexit 0";

/// What kind of payload the package installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageMode {
    /// Applications (.app, .dmg, .zip) installed the standard way.
    #[default]
    Application,
    /// Arbitrary files deployed to a fixed location on managed devices.
    FileDeployment,
}

impl PackageMode {
    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::FileDeployment => "File Deployment",
        }
    }
}

impl fmt::Display for PackageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Everything the packaging engine needs to know about the package to build.
///
/// The struct is plain data: callers mutate it freely, then hand a snapshot
/// to [`BuildOrchestrator::start`](crate::bundler::BuildOrchestrator::start).
///
/// # Configuration file
///
/// Every field has a default, so a TOML file only needs the fields it changes:
///
/// ```toml
/// identifier = "com.acme.tool"
/// version = "2.1.0"
/// install_location = "/usr/local/bin"
/// include_postinstall = true
/// postinstall_script = "#!/bin/sh\nexit 0"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfiguration {
    /// Package identifier in reverse domain notation.
    pub identifier: String,
    /// Package version.
    pub version: String,
    /// Absolute install location on the target machine.
    pub install_location: String,
    /// Installer signing identity (name or fingerprint).
    pub signing_identity: Option<String>,
    /// Run a preinstall script.
    pub include_preinstall: bool,
    /// Run a postinstall script.
    pub include_postinstall: bool,
    /// Keep the payload's file permissions.
    pub preserve_permissions: bool,
    /// Create missing parent folders of the install location (file deployment only).
    pub create_intermediate_folders: bool,
    /// Application install or file deployment.
    pub package_mode: PackageMode,
    /// Preinstall script text, used when `include_preinstall` is set.
    pub preinstall_script: String,
    /// Postinstall script text, used when `include_postinstall` is set.
    pub postinstall_script: String,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            version: "1.0".to_string(),
            install_location: "/Applications".to_string(),
            signing_identity: None,
            include_preinstall: false,
            include_postinstall: false,
            preserve_permissions: false,
            create_intermediate_folders: false,
            package_mode: PackageMode::Application,
            preinstall_script: DEFAULT_PREINSTALL_SCRIPT.to_string(),
            postinstall_script: DEFAULT_POSTINSTALL_SCRIPT.to_string(),
        }
    }
}

/// How much a validation issue matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth showing, does not block a build.
    Advisory,
    /// Blocks a build.
    Error,
}

/// A single problem found by [`BuildConfiguration::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationIssue {
    MissingIdentifier,
    IdentifierNotReverseDomain,
    MissingVersion,
    MissingInstallLocation,
    RelativeInstallLocation,
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            Self::IdentifierNotReverseDomain => Severity::Advisory,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MissingIdentifier => "identifier is required",
            Self::IdentifierNotReverseDomain => {
                "identifier should use reverse domain notation (e.g. com.example.app)"
            }
            Self::MissingVersion => "version is required",
            Self::MissingInstallLocation => "install location is required",
            Self::RelativeInstallLocation => "install location must be an absolute path",
        };
        f.write_str(message)
    }
}

/// Outcome of validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Same as [`BuildConfiguration::is_valid`].
    pub ok: bool,
    /// Every issue found, advisory ones included.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when some issue must be fixed before building.
    pub fn has_errors(&self) -> bool {
        !self.ok
            || self
                .issues
                .iter()
                .any(|issue| issue.severity() == Severity::Error)
    }

    /// Issue messages, in discovery order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Temporary script files handed to the engine alongside the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptPaths {
    pub preinstall: Option<PathBuf>,
    pub postinstall: Option<PathBuf>,
}

impl BuildConfiguration {
    /// Identifier, version and install location are all present.
    pub fn is_valid(&self) -> bool {
        !self.identifier.is_empty() && !self.version.is_empty() && !self.install_location.is_empty()
    }

    /// Checks the configuration without side effects.
    pub fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();

        if self.identifier.is_empty() {
            issues.push(ValidationIssue::MissingIdentifier);
        } else if !self.identifier.contains('.') {
            issues.push(ValidationIssue::IdentifierNotReverseDomain);
        }

        if self.version.is_empty() {
            issues.push(ValidationIssue::MissingVersion);
        }

        if self.install_location.is_empty() {
            issues.push(ValidationIssue::MissingInstallLocation);
        } else if !self.install_location.starts_with('/') {
            issues.push(ValidationIssue::RelativeInstallLocation);
        }

        ValidationReport {
            ok: self.is_valid(),
            issues,
        }
    }

    /// Whether the preinstall file should be handed to the engine.
    pub fn wants_preinstall_file(&self) -> bool {
        self.include_preinstall && !self.preinstall_script.is_empty()
    }

    /// Whether the postinstall file should be handed to the engine.
    pub fn wants_postinstall_file(&self) -> bool {
        self.include_postinstall && !self.postinstall_script.is_empty()
    }

    /// Engine argument vector without script file references.
    pub fn to_arguments(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Vec<String> {
        self.to_arguments_with_scripts(input, output, &ScriptPaths::default())
    }

    /// Engine argument vector, in the engine's fixed order:
    ///
    /// `-i -v -l -p -o [-s] [--preinstall] [--postinstall] [--preserve-permissions]
    /// [--file-deployment-mode [--create-intermediate-folders]]
    /// [--preinstall-file F] [--postinstall-file F] --verbose`
    pub fn to_arguments_with_scripts(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        scripts: &ScriptPaths,
    ) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.identifier.clone(),
            "-v".to_string(),
            self.version.clone(),
            "-l".to_string(),
            self.install_location.clone(),
            "-p".to_string(),
            path_arg(input.as_ref()),
            "-o".to_string(),
            path_arg(output.as_ref()),
        ];

        if let Some(identity) = self.signing_identity.as_deref().filter(|s| !s.is_empty()) {
            args.push("-s".to_string());
            args.push(identity.to_string());
        }

        if self.include_preinstall {
            args.push("--preinstall".to_string());
        }

        if self.include_postinstall {
            args.push("--postinstall".to_string());
        }

        if self.preserve_permissions {
            args.push("--preserve-permissions".to_string());
        }

        if self.package_mode == PackageMode::FileDeployment {
            args.push("--file-deployment-mode".to_string());

            if self.create_intermediate_folders {
                args.push("--create-intermediate-folders".to_string());
            }
        }

        if let Some(path) = &scripts.preinstall {
            args.push("--preinstall-file".to_string());
            args.push(path_arg(path));
        }

        if let Some(path) = &scripts.postinstall {
            args.push("--postinstall-file".to_string());
            args.push(path_arg(path));
        }

        args.push("--verbose".to_string());

        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

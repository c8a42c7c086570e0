//! Command line argument parsing and validation.

use clap::Parser;
use std::path::PathBuf;

/// macOS installer package builder
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kodegen_bundler_pkg",
    about = "Builds macOS installer packages (.pkg) from disk images, archives, apps and binaries",
    long_about = "Builds macOS installer packages (.pkg) from a disk image, zip archive, app bundle, \
directory or executable by running the packaging engine.

Missing identifier and version are derived from the input.

Usage:
  kodegen_bundler_pkg -p ./Acme-2.1.dmg -o ./Acme.pkg
  kodegen_bundler_pkg -p ./tool -i com.acme.tool -v 1.4.0 -l /usr/local/bin --postinstall
  kodegen_bundler_pkg --preset \"Microsoft Teams Custom Backgrounds\" -p ./backgrounds

Exit code 0 = package written to the output path.",
    disable_version_flag = true
)]
pub struct Args {
    /// Package identifier in reverse domain notation (e.g. com.acme.app)
    #[arg(short = 'i', long, value_name = "ID")]
    pub identifier: Option<String>,

    /// Package version
    #[arg(short = 'v', long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Absolute install location on the target machine
    #[arg(short = 'l', long, value_name = "PATH")]
    pub location: Option<String>,

    /// Installer signing identity (certificate name or SHA-1 fingerprint)
    #[arg(short = 's', long, value_name = "IDENTITY")]
    pub sign: Option<String>,

    /// Input: .dmg, .zip, .app, directory or executable
    #[arg(short = 'p', long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output package path (defaults to <input>.pkg beside the input)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Include a preinstall script
    #[arg(long)]
    pub preinstall: bool,

    /// Include a postinstall script
    #[arg(long)]
    pub postinstall: bool,

    /// Preinstall script file (implies --preinstall)
    #[arg(long, value_name = "FILE")]
    pub preinstall_script: Option<PathBuf>,

    /// Postinstall script file (implies --postinstall)
    #[arg(long, value_name = "FILE")]
    pub postinstall_script: Option<PathBuf>,

    /// Keep the payload's file permissions
    #[arg(long)]
    pub preserve_permissions: bool,

    /// Deploy arbitrary files to the install location instead of an application
    #[arg(long)]
    pub file_deployment: bool,

    /// Create missing parent folders of the install location (file deployment)
    #[arg(long)]
    pub create_intermediate_folders: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Start from a built-in preset (see --list-presets)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Packaging engine executable
    #[arg(long, value_name = "PATH", env = "KODEGEN_PKG_ENGINE")]
    pub engine: Option<PathBuf>,

    /// Show engine output while building
    #[arg(long)]
    pub verbose: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// List installer signing identities and exit
    #[arg(long, conflicts_with_all = ["list_presets", "classify"])]
    pub list_identities: bool,

    /// List built-in presets and exit
    #[arg(long, conflicts_with = "classify")]
    pub list_presets: bool,

    /// Print what the input was classified as and exit
    #[arg(long)]
    pub classify: bool,
}

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Classify,
    ListIdentities,
    ListPresets,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn mode(&self) -> Mode {
        if self.list_identities {
            Mode::ListIdentities
        } else if self.list_presets {
            Mode::ListPresets
        } else if self.classify {
            Mode::Classify
        } else {
            Mode::Build
        }
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.identifier.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err("Identifier cannot be empty".to_string());
        }

        if self.version.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err("Version cannot be empty".to_string());
        }

        // A preset or config file may already select file deployment.
        if self.create_intermediate_folders
            && !self.file_deployment
            && self.config.is_none()
            && self.preset.is_none()
        {
            return Err("--create-intermediate-folders requires --file-deployment".to_string());
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    json: bool,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.json),
            json: args.json,
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.output.info(message)
    }

    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("kodegen_bundler_pkg").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn short_flags_follow_engine_letters() {
        let args = parse(&[
            "-i", "com.acme.app", "-v", "2.0", "-l", "/Applications", "-s", "Dev", "-p",
            "/tmp/a.dmg", "-o", "/tmp/a.pkg",
        ]);
        assert_eq!(args.identifier.as_deref(), Some("com.acme.app"));
        assert_eq!(args.version.as_deref(), Some("2.0"));
        assert_eq!(args.location.as_deref(), Some("/Applications"));
        assert_eq!(args.sign.as_deref(), Some("Dev"));
        assert_eq!(args.mode(), Mode::Build);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn modes() {
        assert_eq!(parse(&["--list-presets"]).mode(), Mode::ListPresets);
        assert_eq!(parse(&["--list-identities"]).mode(), Mode::ListIdentities);
        assert_eq!(parse(&["--classify", "-p", "x"]).mode(), Mode::Classify);
    }

    #[test]
    fn config_conflicts_with_preset() {
        let result = Args::try_parse_from([
            "kodegen_bundler_pkg",
            "--config",
            "a.toml",
            "--preset",
            "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn intermediate_folders_need_file_deployment() {
        assert!(parse(&["--create-intermediate-folders"]).validate().is_err());
        assert!(
            parse(&["--create-intermediate-folders", "--file-deployment"])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn empty_identifier_rejected() {
        assert!(parse(&["-i", " "]).validate().is_err());
    }
}

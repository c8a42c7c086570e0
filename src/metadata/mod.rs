//! Build configuration files.
//!
//! A configuration file is TOML holding [`BuildConfiguration`] fields at the
//! top level, every one optional, plus optional `input`, `output` and
//! `engine` paths. Relative paths are taken relative to the file.
//!
//! ```toml
//! identifier = "com.acme.tool"
//! version = "2.1.0"
//! install_location = "/usr/local/bin"
//! include_postinstall = true
//! postinstall_script_file = "scripts/postinstall.sh"
//! input = "dist/tool"
//! ```

use crate::bundler::BuildConfiguration;
use crate::error::{BundlerError, CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub configuration: BuildConfiguration,

    /// Script file replacing `preinstall_script`.
    pub preinstall_script_file: Option<PathBuf>,

    /// Script file replacing `postinstall_script`.
    pub postinstall_script_file: Option<PathBuf>,

    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub engine: Option<PathBuf>,
}

impl ConfigFile {
    /// Parses `contents`; relative paths are resolved against `base`.
    pub fn parse(contents: &str, base: &Path) -> Result<Self> {
        let mut file: ConfigFile = toml::from_str(contents)?;

        for path in [
            &mut file.preinstall_script_file,
            &mut file.postinstall_script_file,
            &mut file.input,
            &mut file.output,
            &mut file.engine,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }

        if let Some(script) = &file.preinstall_script_file {
            file.configuration.preinstall_script = read_script(script)?;
        }
        if let Some(script) = &file.postinstall_script_file {
            file.configuration.postinstall_script = read_script(script)?;
        }

        Ok(file)
    }
}

/// Loads a configuration file.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        BundlerError::Cli(CliError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let file = ConfigFile::parse(&contents, base)?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(file)
}

/// Reads an install script from disk.
pub fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        BundlerError::Cli(CliError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

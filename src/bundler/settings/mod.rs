//! Build configuration model.
//!
//! This module holds what the user wants built: the [`BuildConfiguration`]
//! itself, its validation rules, the engine argument contract, a fluent
//! [`ConfigurationBuilder`] and the read-only [`PresetRegistry`].

mod builder;
mod configuration;
mod preset;

pub use builder::{ConfigurationBuilder, EXECUTABLE_INSTALL_LOCATION};
pub use configuration::{
    BuildConfiguration, DEFAULT_POSTINSTALL_SCRIPT, DEFAULT_PREINSTALL_SCRIPT, PackageMode,
    ScriptPaths, Severity, ValidationIssue, ValidationReport,
};
pub use preset::{Preset, PresetCategory, PresetDetails, PresetRegistry};

//! Builder for constructing a BuildConfiguration.

use super::{BuildConfiguration, PackageMode, Preset};
use crate::bundler::classify::{InputDescriptor, InputKind};
use crate::bundler::signing::SigningIdentity;

/// Install location used for bare executables.
pub const EXECUTABLE_INSTALL_LOCATION: &str = "/usr/local/bin";

/// Builder for constructing [`BuildConfiguration`].
///
/// Layers sources in call order: later calls win over earlier ones.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::bundler::{ConfigurationBuilder, classify};
///
/// # fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
/// let input = classify("/tmp/Acme.app");
/// let configuration = ConfigurationBuilder::new()
///     .input(&input)
///     .version("2.0")
///     .include_postinstall(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    configuration: BuildConfiguration,
}

impl ConfigurationBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_configuration(configuration: BuildConfiguration) -> Self {
        Self { configuration }
    }

    /// Starts from a preset's configuration.
    pub fn from_preset(preset: &Preset) -> Self {
        Self::from_configuration(preset.configuration.clone())
    }

    /// Seeds identifier and version from a classified input.
    ///
    /// Bare executables default to [`EXECUTABLE_INSTALL_LOCATION`].
    pub fn input(mut self, input: &InputDescriptor) -> Self {
        self.configuration.identifier = input.suggested_identifier();
        if let Some(version) = &input.version {
            self.configuration.version = version.clone();
        }
        if input.kind == InputKind::Executable {
            self.configuration.install_location = EXECUTABLE_INSTALL_LOCATION.to_string();
        }
        self
    }

    /// Uses the identity's fingerprint for signing.
    pub fn signing(mut self, identity: &SigningIdentity) -> Self {
        self.configuration.signing_identity = Some(identity.id.clone());
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.configuration.identifier = identifier.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.configuration.version = version.into();
        self
    }

    pub fn install_location(mut self, location: impl Into<String>) -> Self {
        self.configuration.install_location = location.into();
        self
    }

    pub fn signing_identity(mut self, identity: impl Into<String>) -> Self {
        self.configuration.signing_identity = Some(identity.into());
        self
    }

    pub fn include_preinstall(mut self, include: bool) -> Self {
        self.configuration.include_preinstall = include;
        self
    }

    pub fn include_postinstall(mut self, include: bool) -> Self {
        self.configuration.include_postinstall = include;
        self
    }

    /// Sets the preinstall script text and enables the hook.
    pub fn preinstall_script(mut self, script: impl Into<String>) -> Self {
        self.configuration.preinstall_script = script.into();
        self.configuration.include_preinstall = true;
        self
    }

    /// Sets the postinstall script text and enables the hook.
    pub fn postinstall_script(mut self, script: impl Into<String>) -> Self {
        self.configuration.postinstall_script = script.into();
        self.configuration.include_postinstall = true;
        self
    }

    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.configuration.preserve_permissions = preserve;
        self
    }

    pub fn package_mode(mut self, mode: PackageMode) -> Self {
        self.configuration.package_mode = mode;
        self
    }

    pub fn create_intermediate_folders(mut self, create: bool) -> Self {
        self.configuration.create_intermediate_folders = create;
        self
    }

    /// Returns the configuration without validating it.
    pub fn into_inner(self) -> BuildConfiguration {
        self.configuration
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::bundler::Error::Validation) when any
    /// blocking issue is found. Advisory issues are logged and ignored.
    pub fn build(self) -> crate::bundler::Result<BuildConfiguration> {
        let report = self.configuration.validate();
        if report.has_errors() {
            return Err(crate::bundler::Error::Validation(report.issues));
        }
        for issue in &report.issues {
            log::warn!("{}", issue);
        }
        Ok(self.configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(kind: InputKind) -> InputDescriptor {
        InputDescriptor {
            path: PathBuf::from("/tmp/Acme Tool-3.1.zip"),
            size: 0,
            kind,
            app_name: None,
            binary_name: None,
            version: Some("3.1".into()),
            icon: None,
        }
    }

    #[test]
    fn input_seeds_identifier_and_version() {
        let configuration = ConfigurationBuilder::new()
            .input(&descriptor(InputKind::Archive))
            .into_inner();

        assert_eq!(configuration.identifier, "com.company.acmetool-3.1");
        assert_eq!(configuration.version, "3.1");
        assert_eq!(configuration.install_location, "/Applications");
    }

    #[test]
    fn executables_install_into_usr_local_bin() {
        let mut input = descriptor(InputKind::Executable);
        input.binary_name = Some("acmectl".into());

        let configuration = ConfigurationBuilder::new().input(&input).into_inner();
        assert_eq!(configuration.identifier, "com.company.acmectl");
        assert_eq!(configuration.install_location, EXECUTABLE_INSTALL_LOCATION);
    }

    #[test]
    fn later_calls_override_input() {
        let configuration = ConfigurationBuilder::new()
            .input(&descriptor(InputKind::Archive))
            .identifier("com.acme.tool")
            .build()
            .unwrap();

        assert_eq!(configuration.identifier, "com.acme.tool");
    }

    #[test]
    fn build_rejects_blocking_issues() {
        let err = ConfigurationBuilder::new().build().unwrap_err();
        assert!(matches!(err, crate::bundler::Error::Validation(_)));
    }

    #[test]
    fn script_text_enables_hook() {
        let configuration = ConfigurationBuilder::new()
            .postinstall_script("#!/bin/sh\nexit 0")
            .into_inner();

        assert!(configuration.include_postinstall);
        assert!(configuration.wants_postinstall_file());
    }
}

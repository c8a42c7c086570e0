//! The build command: configuration layering, engine run and result report.

use crate::bundler::{
    BuildConfiguration, BuildOrchestrator, BuildState, ConfigurationBuilder, EngineLocator, Error,
    InputDescriptor, PackageArtifact, PackageMode, PresetRegistry, Severity,
};
use crate::cli::{Args, RuntimeConfig, output::bar_position};
use crate::error::{BundlerError, CliError, Result};
use crate::metadata::{self, ConfigFile};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

/// Result printed by `--json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CliResult {
    pub success: bool,
    pub message: String,
    pub output_path: Option<String>,
    pub error: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<String>,
}

impl CliResult {
    fn succeeded(artifact: &PackageArtifact) -> Self {
        Self {
            success: true,
            message: format!("Package created at {}", artifact.path.display()),
            output_path: Some(artifact.path.display().to_string()),
            error: None,
            size: Some(artifact.size),
            checksum: Some(artifact.checksum.clone()),
        }
    }

    fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Layers the configuration: preset or config file, then the classified
/// input for whatever is still missing, then explicit flags.
pub fn configuration_from_args(
    args: &Args,
    presets: &PresetRegistry,
    config_file: Option<&ConfigFile>,
    input: &InputDescriptor,
) -> Result<BuildConfiguration> {
    let base = if let Some(file) = config_file {
        Some(file.configuration.clone())
    } else if let Some(name) = &args.preset {
        let preset = presets.find(name).ok_or_else(|| {
            BundlerError::Cli(CliError::UnknownPreset { name: name.clone() })
        })?;
        Some(preset.configuration.clone())
    } else {
        None
    };

    let mut builder = match base {
        Some(configuration) => {
            let seeded = configuration.identifier.is_empty();
            let builder = ConfigurationBuilder::from_configuration(configuration);
            if seeded {
                builder.identifier(input.suggested_identifier())
            } else {
                builder
            }
        }
        None => ConfigurationBuilder::new().input(input),
    };

    if let Some(identifier) = &args.identifier {
        builder = builder.identifier(identifier);
    }
    if let Some(version) = &args.version {
        builder = builder.version(version);
    }
    if let Some(location) = &args.location {
        builder = builder.install_location(location);
    }
    if let Some(identity) = &args.sign {
        builder = builder.signing_identity(identity);
    }
    if args.preinstall {
        builder = builder.include_preinstall(true);
    }
    if args.postinstall {
        builder = builder.include_postinstall(true);
    }
    if let Some(path) = &args.preinstall_script {
        builder = builder.preinstall_script(metadata::read_script(path)?);
    }
    if let Some(path) = &args.postinstall_script {
        builder = builder.postinstall_script(metadata::read_script(path)?);
    }
    if args.preserve_permissions {
        builder = builder.preserve_permissions(true);
    }
    if args.file_deployment {
        builder = builder.package_mode(PackageMode::FileDeployment);
    }
    if args.create_intermediate_folders {
        builder = builder.create_intermediate_folders(true);
    }

    Ok(builder.into_inner())
}

/// Runs one build and reports it. Returns the process exit code.
pub async fn execute(
    configuration: &BuildConfiguration,
    input: &Path,
    output: &Path,
    engine: Option<PathBuf>,
    runtime: &RuntimeConfig,
) -> Result<i32> {
    for issue in configuration.validate().issues {
        if issue.severity() == Severity::Advisory {
            runtime.warn(&issue.to_string())?;
        }
    }

    let orchestrator = BuildOrchestrator::new()
        .with_engine_locator(EngineLocator::from_env().with_explicit(engine));

    runtime.section(&format!(
        "Building {} {}",
        configuration.identifier, configuration.version
    ))?;
    runtime.verbose_println(&format!("Input: {}", input.display()))?;
    runtime.verbose_println(&format!("Output: {}", output.display()))?;
    runtime.verbose_println(&format!(
        "Mode: {}, install location: {}",
        configuration.package_mode, configuration.install_location
    ))?;

    let mut engine_output = orchestrator.subscribe_output();
    if let Err(e) = orchestrator.start(configuration, input, output).await {
        let error = BundlerError::from(e);
        report(
            runtime,
            &CliResult::failed("Build could not start", error.to_string()),
        )?;
        for suggestion in error.recovery_suggestions() {
            runtime.warn(&suggestion)?;
        }
        return Ok(error.exit_code());
    }

    let bar = runtime.output().build_bar();
    let mut status = orchestrator.watch();
    let mut output_open = true;
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    loop {
        let current = status.borrow_and_update().clone();
        bar.set_position(bar_position(current.progress));
        if current.settled {
            break;
        }

        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            chunk = engine_output.recv(), if output_open => match chunk {
                Ok(chunk) => {
                    if runtime.output().is_verbose() {
                        bar.println(chunk.text.trim_end());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Skipped {} engine output lines", skipped);
                }
                Err(RecvError::Closed) => output_open = false,
            },
            _ = &mut interrupt => {
                bar.set_message("cancelling");
                if let Err(e) = orchestrator.cancel() {
                    log::debug!("Cancel ignored: {}", e);
                }
                interrupt.set(tokio::signal::ctrl_c());
            }
        }
    }
    bar.finish_and_clear();

    let state = orchestrator.wait().await;
    let (result, code) = match &state {
        BuildState::Completed => match PackageArtifact::inspect(output).await {
            Ok(artifact) => (CliResult::succeeded(&artifact), 0),
            Err(e) => (
                CliResult::failed(
                    "Packaging engine reported success but produced no package",
                    e.to_string(),
                ),
                1,
            ),
        },
        unfinished => unfinished_result(unfinished),
    };

    report(runtime, &result)?;
    Ok(code)
}

/// Report and exit code for a build that did not complete.
fn unfinished_result(state: &BuildState) -> (CliResult, i32) {
    match state {
        BuildState::Failed(failure) => {
            let code = failure
                .exit_code()
                .map(|code| BundlerError::from(Error::ProcessExit { code }).exit_code())
                .unwrap_or(1);
            (CliResult::failed("Build failed", failure.message.clone()), code)
        }
        BuildState::Cancelled => {
            let error = BundlerError::from(Error::Cancelled);
            (
                CliResult::failed("Build cancelled", error.to_string()),
                error.exit_code(),
            )
        }
        other => (
            CliResult::failed("Build did not finish", other.to_string()),
            1,
        ),
    }
}

fn report(runtime: &RuntimeConfig, result: &CliResult) -> Result<()> {
    if runtime.json() {
        runtime.output().println(&serde_json::to_string_pretty(result)?)?;
        return Ok(());
    }

    if result.success {
        runtime.success(&result.message)?;
        if let (Some(size), Some(checksum)) = (result.size, &result.checksum) {
            runtime.indent(&format!("Size: {} bytes", size))?;
            runtime.indent(&format!("SHA256: {}", checksum))?;
        }
    } else {
        runtime.output().error(&result.message)?;
        if let Some(error) = &result.error {
            runtime.output().error(error)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::InputKind;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("kodegen_bundler_pkg").chain(extra.iter().copied()))
            .unwrap()
    }

    fn dmg() -> InputDescriptor {
        InputDescriptor {
            path: PathBuf::from("/tmp/Acme Tool-2.1.dmg"),
            size: 10,
            kind: InputKind::DiskImage,
            app_name: Some("Acme Tool.app".into()),
            binary_name: None,
            version: Some("2.1".into()),
            icon: None,
        }
    }

    #[test]
    fn classifier_seeds_missing_fields() {
        let configuration =
            configuration_from_args(&args(&[]), &PresetRegistry::builtin(), None, &dmg()).unwrap();
        assert_eq!(configuration.identifier, "com.company.acmetool");
        assert_eq!(configuration.version, "2.1");
        assert_eq!(configuration.install_location, "/Applications");
    }

    #[test]
    fn flags_override_classifier() {
        let configuration = configuration_from_args(
            &args(&["-i", "com.acme.app", "-v", "3.0", "--file-deployment", "--preinstall"]),
            &PresetRegistry::builtin(),
            None,
            &dmg(),
        )
        .unwrap();
        assert_eq!(configuration.identifier, "com.acme.app");
        assert_eq!(configuration.version, "3.0");
        assert_eq!(configuration.package_mode, PackageMode::FileDeployment);
        assert!(configuration.include_preinstall);
    }

    #[test]
    fn preset_keeps_its_values() {
        let registry = PresetRegistry::builtin();
        let preset = &registry.all()[0];
        let configuration = configuration_from_args(
            &args(&["--preset", &preset.name.to_uppercase()]),
            &registry,
            None,
            &dmg(),
        )
        .unwrap();
        assert_eq!(configuration, preset.configuration);
    }

    #[test]
    fn unknown_preset_is_error() {
        let err = configuration_from_args(
            &args(&["--preset", "nope"]),
            &PresetRegistry::builtin(),
            None,
            &dmg(),
        )
        .unwrap_err();
        assert!(matches!(err, BundlerError::Cli(CliError::UnknownPreset { .. })));
    }

    #[test]
    fn unfinished_states_map_to_exit_codes() {
        use crate::bundler::{BuildFailure, FailureKind};

        let (result, code) = unfinished_result(&BuildState::Cancelled);
        assert_eq!(code, 130);
        assert_eq!(result.error.as_deref(), Some("build was cancelled"));

        let engine_exit = BuildState::Failed(BuildFailure::new(
            FailureKind::ProcessExit { code: 3 },
            "payload is missing",
        ));
        assert_eq!(unfinished_result(&engine_exit).1, 3);

        let killed = BuildState::Failed(BuildFailure::new(
            FailureKind::ProcessExit { code: -1 },
            "killed",
        ));
        assert_eq!(unfinished_result(&killed).1, 1);

        let launch = BuildState::Failed(BuildFailure::new(FailureKind::EngineLaunch, "missing"));
        let (result, code) = unfinished_result(&launch);
        assert_eq!(code, 1);
        assert!(!result.success);
    }

    #[test]
    fn json_result_shape() {
        let result = CliResult::failed("Build failed", "boom");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
        assert!(value["output_path"].is_null());
        assert!(value["checksum"].is_null());
    }
}

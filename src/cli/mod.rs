//! Command line interface for the package builder.
//!
//! Parses arguments, seeds the configuration from presets, configuration
//! files and the classified input, then hands off to the orchestrator.

mod args;
pub mod commands;
pub mod output;

pub use args::{Args, Mode, RuntimeConfig};
pub use output::OutputManager;

use crate::bundler::{IdentityDiscovery, InputDescriptor, PresetRegistry, classify};
use crate::error::{BundlerError, CliError, Result};
use crate::{metadata, source};
use std::path::{Path, PathBuf};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    run_with(args).await
}

/// Runs already parsed arguments.
pub async fn run_with(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| BundlerError::Cli(CliError::InvalidArguments { reason }))?;
    let runtime = RuntimeConfig::from(&args);
    let presets = PresetRegistry::builtin();

    match args.mode() {
        Mode::ListPresets => return commands::list_presets(&presets, &runtime),
        Mode::ListIdentities => {
            return commands::list_identities(&IdentityDiscovery::new(), &runtime).await;
        }
        Mode::Classify | Mode::Build => {}
    }

    let config_file = args
        .config
        .as_deref()
        .map(metadata::load_config)
        .transpose()?;

    let input = args
        .input
        .clone()
        .or_else(|| config_file.as_ref().and_then(|f| f.input.clone()))
        .ok_or_else(|| {
            BundlerError::Cli(CliError::MissingArgument {
                argument: "--input".to_string(),
            })
        })?;
    let input = source::resolve_input(&input)?;
    let descriptor = classify_blocking(&input).await?;

    if args.mode() == Mode::Classify {
        return commands::show_classification(&descriptor, &runtime);
    }

    let configuration =
        commands::configuration_from_args(&args, &presets, config_file.as_ref(), &descriptor)?;

    let output = args
        .output
        .clone()
        .or_else(|| config_file.as_ref().and_then(|f| f.output.clone()));
    let output = source::resolve_output(output.as_deref(), &input)?;

    let engine: Option<PathBuf> = args
        .engine
        .clone()
        .or_else(|| config_file.as_ref().and_then(|f| f.engine.clone()));

    commands::execute(&configuration, &input, &output, engine, &runtime).await
}

async fn classify_blocking(path: &Path) -> Result<InputDescriptor> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || classify(path))
        .await
        .map_err(|e| BundlerError::Anyhow(anyhow::anyhow!("classification task failed: {}", e)))
}

//! Listing commands: presets, signing identities, input classification.

use crate::bundler::{IdentityDiscovery, InputDescriptor, PresetRegistry, SigningIdentity};
use crate::cli::RuntimeConfig;
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PresetView<'a> {
    name: &'a str,
    category: &'a str,
    description: &'a str,
    identifier: &'a str,
    version: &'a str,
    install_location: &'a str,
}

#[derive(Debug, Serialize)]
struct IdentityView<'a> {
    id: &'a str,
    name: &'a str,
    team_id: Option<&'a str>,
    display_name: String,
}

impl<'a> From<&'a SigningIdentity> for IdentityView<'a> {
    fn from(identity: &'a SigningIdentity) -> Self {
        Self {
            id: &identity.id,
            name: &identity.name,
            team_id: identity.team_id.as_deref(),
            display_name: identity.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassificationView<'a> {
    path: String,
    kind: &'a str,
    size: u64,
    app_name: Option<&'a str>,
    binary_name: Option<&'a str>,
    version: Option<&'a str>,
    has_icon: bool,
    suggested_identifier: String,
}

/// Prints the built-in presets.
pub fn list_presets(presets: &PresetRegistry, runtime: &RuntimeConfig) -> Result<i32> {
    if runtime.json() {
        let views: Vec<PresetView<'_>> = presets
            .all()
            .iter()
            .map(|preset| PresetView {
                name: &preset.name,
                category: preset.category.as_str(),
                description: &preset.description,
                identifier: &preset.configuration.identifier,
                version: &preset.configuration.version,
                install_location: &preset.configuration.install_location,
            })
            .collect();
        runtime.output().println(&serde_json::to_string_pretty(&views)?)?;
        return Ok(0);
    }

    runtime.section("Presets")?;
    for preset in presets.all() {
        runtime.output().println(&format!("{} [{}]", preset.name, preset.category))?;
        runtime.indent(&preset.description)?;
        runtime.indent(&format!(
            "{} {} -> {}",
            preset.configuration.identifier,
            preset.configuration.version,
            preset.configuration.install_location
        ))?;
    }
    Ok(0)
}

/// Prints the installer signing identities found in the keychain.
pub async fn list_identities(discovery: &IdentityDiscovery, runtime: &RuntimeConfig) -> Result<i32> {
    let identities = discovery.fetch_identities().await;

    if runtime.json() {
        let views: Vec<IdentityView<'_>> = identities.iter().map(IdentityView::from).collect();
        runtime.output().println(&serde_json::to_string_pretty(&views)?)?;
        return Ok(0);
    }

    if identities.is_empty() {
        runtime.warn("No installer signing identities found")?;
        return Ok(0);
    }

    runtime.section("Installer signing identities")?;
    for identity in &identities {
        runtime.output().println(&format!("{}  {}", identity.id, identity.display_name()))?;
    }
    Ok(0)
}

/// Prints what an input was classified as.
pub fn show_classification(input: &InputDescriptor, runtime: &RuntimeConfig) -> Result<i32> {
    let view = ClassificationView {
        path: input.path.display().to_string(),
        kind: input.kind.description(),
        size: input.size,
        app_name: input.app_name.as_deref(),
        binary_name: input.binary_name.as_deref(),
        version: input.version.as_deref(),
        has_icon: input.icon.is_some(),
        suggested_identifier: input.suggested_identifier(),
    };

    if runtime.json() {
        runtime.output().println(&serde_json::to_string_pretty(&view)?)?;
        return Ok(0);
    }

    runtime.section(&view.path)?;
    runtime.indent(&format!("Kind: {}", view.kind))?;
    runtime.indent(&format!("Size: {} bytes", view.size))?;
    if let Some(app) = view.app_name {
        runtime.indent(&format!("Application: {}", app))?;
    }
    if let Some(binary) = view.binary_name {
        runtime.indent(&format!("Executable: {}", binary))?;
    }
    runtime.indent(&format!("Version: {}", view.version.unwrap_or("unknown")))?;
    runtime.indent(&format!("Suggested identifier: {}", view.suggested_identifier))?;
    Ok(0)
}

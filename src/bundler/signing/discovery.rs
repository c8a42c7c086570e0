//! Keychain identity discovery through the `security` tool.

use super::identity::{SigningIdentity, installer_identities, parse_security_output};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Credential-listing tool shipped with macOS.
pub const SECURITY_TOOL: &str = "/usr/bin/security";

/// Arguments asking for valid identities only.
pub const FIND_IDENTITY_ARGS: &[&str] = &["find-identity", "-v"];

/// Lists installer signing identities from the keychain.
///
/// Discovery is best effort: a missing tool, a non-zero exit or unreadable
/// output all produce an empty list.
#[derive(Debug, Clone)]
pub struct IdentityDiscovery {
    program: PathBuf,
}

impl Default for IdentityDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityDiscovery {
    pub fn new() -> Self {
        Self::with_program(SECURITY_TOOL)
    }

    /// Uses another program speaking the `find-identity -v` output format.
    pub fn with_program(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Runs the tool and returns package-signing identities. Blocks.
    pub fn list_identities(&self) -> Vec<SigningIdentity> {
        let output = match Command::new(&self.program)
            .args(FIND_IDENTITY_ARGS)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                log::warn!(
                    "Failed to run {}: {}. No signing identities available.",
                    self.program.display(),
                    e
                );
                return Vec::new();
            }
        };

        if !output.status.success() {
            log::warn!(
                "{} find-identity exited with {:?}: {}",
                self.program.display(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let identities = installer_identities(parse_security_output(&stdout));
        log::debug!("Found {} installer signing identities", identities.len());
        identities
    }

    /// Async wrapper running [`list_identities`](Self::list_identities) on
    /// the blocking pool.
    pub async fn fetch_identities(&self) -> Vec<SigningIdentity> {
        let discovery = self.clone();
        match tokio::task::spawn_blocking(move || discovery.list_identities()).await {
            Ok(identities) => identities,
            Err(e) => {
                log::warn!("Identity discovery task failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// The most recently fetched identities.
///
/// A refresh swaps the whole list at once; readers never see a mix of old and
/// new entries.
#[derive(Debug, Clone, Default)]
pub struct IdentityCatalog {
    identities: Vec<SigningIdentity>,
}

impl IdentityCatalog {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the list with a fresh discovery run.
    pub fn refresh(&mut self, discovery: &IdentityDiscovery) -> &[SigningIdentity] {
        self.replace(discovery.list_identities())
    }

    /// Replaces the list wholesale.
    pub fn replace(&mut self, identities: Vec<SigningIdentity>) -> &[SigningIdentity] {
        self.identities = identities;
        &self.identities
    }

    pub fn identities(&self) -> &[SigningIdentity] {
        &self.identities
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Finds an identity by fingerprint (case-insensitive) or exact name.
    pub fn find(&self, key: &str) -> Option<&SigningIdentity> {
        self.identities.iter().find(|identity| {
            identity.id.eq_ignore_ascii_case(key)
                || identity.name == key
                || identity.display_name() == key
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_yields_empty_list() {
        let discovery = IdentityDiscovery::with_program("/nonexistent/security-tool");
        assert!(discovery.list_identities().is_empty());
    }

    #[test]
    fn catalog_replaces_atomically() {
        let identity = |id: &str, name: &str| SigningIdentity {
            id: id.into(),
            name: name.into(),
            team_id: Some("TEAM123".into()),
            expiry_date: None,
        };

        let mut catalog = IdentityCatalog::new();
        catalog.replace(vec![identity(
            "1111111111111111111111111111111111111111",
            "Developer ID Installer: Old",
        )]);
        catalog.replace(vec![identity(
            "2222222222222222222222222222222222222222",
            "Developer ID Installer: New",
        )]);

        assert_eq!(catalog.identities().len(), 1);
        assert!(catalog.find("Developer ID Installer: Old").is_none());
        assert!(catalog.find("Developer ID Installer: New (TEAM123)").is_some());
        assert!(
            catalog
                .find("2222222222222222222222222222222222222222")
                .is_some()
        );
    }
}

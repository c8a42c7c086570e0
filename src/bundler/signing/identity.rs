//! Signing identity records and `security find-identity` output parsing.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Certificate classes able to sign installer packages.
pub const INSTALLER_CERTIFICATE_CLASSES: &[&str] =
    &["Developer ID Installer", "3rd Party Mac Developer Installer"];

/// `  1) <40 hex> "<name>"` with an optional trailing ` (<qualifier>)`.
static IDENTITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\d+\)\s+([0-9A-Fa-f]{40})\s+"([^"]+)"(?:\s+\(([^)]+)\))?"#)
        .expect("identity line pattern is valid")
});

/// Trailing `(TEAMID)` on a certificate common name.
static TEAM_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(([A-Z0-9]+)\)$").expect("team suffix pattern is valid"));

/// A certificate usable to sign the produced package.
///
/// Two identities are equal when their fingerprints are.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    /// SHA-1 fingerprint, 40 hex characters.
    pub id: String,
    /// Common name without the team qualifier.
    pub name: String,
    pub team_id: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl SigningIdentity {
    /// Name with the team re-attached, as shown by Keychain Access.
    pub fn display_name(&self) -> String {
        match &self.team_id {
            Some(team) => format!("{} ({})", self.name, team),
            None => self.name.clone(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < Utc::now())
    }

    /// Whether the certificate class can sign installer packages.
    pub fn can_sign_packages(&self) -> bool {
        INSTALLER_CERTIFICATE_CLASSES
            .iter()
            .any(|class| self.name.contains(class))
    }
}

impl PartialEq for SigningIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SigningIdentity {}

impl Hash for SigningIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Parses one `security find-identity` line. Non-identity lines yield `None`.
pub fn parse_identity_line(line: &str) -> Option<SigningIdentity> {
    let caps = IDENTITY_LINE.captures(line)?;
    let id = caps.get(1)?.as_str().to_string();
    let full_name = caps.get(2)?.as_str();

    let team_id = TEAM_SUFFIX
        .captures(full_name)
        .and_then(|team| team.get(1))
        .map(|team| team.as_str().to_string());
    let name = TEAM_SUFFIX.replace(full_name, "").into_owned();

    Some(SigningIdentity {
        id,
        name,
        team_id,
        expiry_date: None,
    })
}

/// Parses every identity line in the tool output, in order.
pub fn parse_security_output(output: &str) -> Vec<SigningIdentity> {
    output.lines().filter_map(parse_identity_line).collect()
}

/// Keeps only identities able to sign installer packages.
pub fn installer_identities(identities: Vec<SigningIdentity>) -> Vec<SigningIdentity> {
    identities
        .into_iter()
        .filter(SigningIdentity::can_sign_packages)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: &str = "AABBCCDDEEFF00112233445566778899AABB0011";

    #[test]
    fn parses_installer_identity_with_team() {
        let line = format!(
            "  1) {} \"Developer ID Installer: Acme Inc (TEAM123)\"",
            FINGERPRINT
        );
        let identity = parse_identity_line(&line).unwrap();

        assert_eq!(identity.id, FINGERPRINT);
        assert_eq!(identity.name, "Developer ID Installer: Acme Inc");
        assert_eq!(identity.team_id.as_deref(), Some("TEAM123"));
        assert_eq!(identity.display_name(), "Developer ID Installer: Acme Inc (TEAM123)");
        assert!(identity.can_sign_packages());
    }

    #[test]
    fn trailing_qualifier_after_quote_is_ignored() {
        let line = format!(
            "  2) {} \"Apple Development: jane@acme.com (Q1W2E3R4T5)\" (CSSMERR_TP_CERT_REVOKED)",
            FINGERPRINT
        );
        let identity = parse_identity_line(&line).unwrap();
        assert_eq!(identity.name, "Apple Development: jane@acme.com");
        assert_eq!(identity.team_id.as_deref(), Some("Q1W2E3R4T5"));
    }

    #[test]
    fn skips_non_identity_lines() {
        assert!(parse_identity_line("     1 valid identities found").is_none());
        assert!(parse_identity_line("Policy: X.509 Basic").is_none());
        assert!(parse_identity_line("  1) DEADBEEF \"Too short\"").is_none());
    }

    #[test]
    fn filters_to_installer_classes() {
        let output = format!(
            "Policy: X.509 Basic\n\
             \x20 1) {fp} \"Developer ID Application: Acme Inc (TEAM123)\"\n\
             \x20 2) {fp2} \"Developer ID Installer: Acme Inc (TEAM123)\"\n\
             \x20 3) {fp3} \"3rd Party Mac Developer Installer: Acme Inc (TEAM123)\"\n\
             \x20    3 valid identities found\n",
            fp = "1111111111111111111111111111111111111111",
            fp2 = "2222222222222222222222222222222222222222",
            fp3 = "3333333333333333333333333333333333333333",
        );

        let all = parse_security_output(&output);
        assert_eq!(all.len(), 3);

        let installers = installer_identities(all);
        let ids: Vec<&str> = installers.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "2222222222222222222222222222222222222222",
                "3333333333333333333333333333333333333333",
            ]
        );
    }

    #[test]
    fn equality_is_by_fingerprint() {
        let a = SigningIdentity {
            id: FINGERPRINT.into(),
            name: "A".into(),
            team_id: None,
            expiry_date: None,
        };
        let b = SigningIdentity {
            name: "B".into(),
            team_id: Some("T".into()),
            ..a.clone()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn expiry() {
        let expired = SigningIdentity {
            id: FINGERPRINT.into(),
            name: "Developer ID Installer: Acme".into(),
            team_id: None,
            expiry_date: Some(Utc::now() - chrono::Duration::days(1)),
        };
        assert!(expired.is_expired());
        assert!(!SigningIdentity { expiry_date: None, ..expired }.is_expired());
    }
}

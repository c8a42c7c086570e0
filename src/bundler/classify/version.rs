//! Version extraction from file names.
//!
//! Rules are tried in order and the first match wins.

use regex::Regex;
use std::sync::LazyLock;

/// One file-name pattern whose first capture group is the version.
pub struct VersionRule {
    pub name: &'static str,
    pattern: &'static str,
}

impl VersionRule {
    const fn new(name: &'static str, pattern: &'static str) -> Self {
        Self { name, pattern }
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }
}

/// File-name version rules, in priority order.
pub const VERSION_RULES: &[VersionRule] = &[
    VersionRule::new("dotted", r"v?(\d+\.\d+(?:\.\d+)?(?:\.\d+)?)"),
    VersionRule::new("underscore", r"_(\d+\.\d+(?:\.\d+)?)"),
    VersionRule::new("dash", r"-(\d+\.\d+(?:\.\d+)?)"),
];

static COMPILED_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    VERSION_RULES
        .iter()
        .filter_map(|rule| match Regex::new(rule.pattern) {
            Ok(regex) => Some((rule.name, regex)),
            Err(e) => {
                log::warn!("Skipping version rule {}: {}", rule.name, e);
                None
            }
        })
        .collect()
});

/// Applies a single rule by name. Returns `None` for unknown rules.
pub fn apply_rule(name: &str, file_name: &str) -> Option<String> {
    COMPILED_RULES
        .iter()
        .find(|(rule, _)| *rule == name)
        .and_then(|(_, regex)| capture(regex, file_name))
}

/// Extracts a version-looking token from a file name.
pub fn version_from_file_name(file_name: &str) -> Option<String> {
    COMPILED_RULES.iter().find_map(|(name, regex)| {
        let version = capture(regex, file_name)?;
        log::debug!("Version {} from {} via {} rule", version, file_name, name);
        Some(version)
    })
}

fn capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

//! Ready-made configurations for common deployment jobs.
//!
//! A [`PresetRegistry`] is a plain value: callers build one (usually
//! [`PresetRegistry::builtin`]) and pass it by reference to whatever needs it.

use super::BuildConfiguration;
use std::fmt;

/// Grouping shown when listing presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetCategory {
    Enterprise,
}

impl PresetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra guidance attached to a preset.
#[derive(Debug, Clone, Default)]
pub struct PresetDetails {
    pub requirements: Vec<String>,
    pub supported_formats: Vec<String>,
    pub notes: Vec<String>,
}

/// A named configuration with a description of when to use it.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub category: PresetCategory,
    pub hint: String,
    pub configuration: BuildConfiguration,
    pub details: Option<PresetDetails>,
}

impl Preset {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.hint.to_lowercase().contains(needle)
            || self.category.as_str().to_lowercase().contains(needle)
    }
}

/// Read-only collection of presets.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    /// Registry over an explicit preset list.
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    /// Registry holding the presets shipped with the tool.
    pub fn builtin() -> Self {
        Self::new(vec![teams_backgrounds()])
    }

    pub fn all(&self) -> &[Preset] {
        &self.presets
    }

    pub fn by_category(&self, category: PresetCategory) -> Vec<&Preset> {
        self.presets
            .iter()
            .filter(|preset| preset.category == category)
            .collect()
    }

    /// Case-insensitive search over name, description, hint and category.
    /// An empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<&Preset> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.presets.iter().collect();
        }
        self.presets.iter().filter(|preset| preset.matches(&needle)).collect()
    }

    /// Looks a preset up by exact name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }
}

fn teams_backgrounds() -> Preset {
    Preset {
        name: "Microsoft Teams Custom Backgrounds".to_string(),
        description: "Deploy custom branded backgrounds for the new Microsoft Teams application"
            .to_string(),
        category: PresetCategory::Enterprise,
        hint: "Package your company's branded backgrounds for Microsoft Teams. The postinstall \
               script will process images and generate thumbnails automatically."
            .to_string(),
        configuration: BuildConfiguration {
            identifier: "com.company.teams.backgrounds".to_string(),
            version: "1.0.0".to_string(),
            install_location: "~/Library/Containers/com.microsoft.teams2/Data/Library/\
                               Application Support/Microsoft/MSTeams/Backgrounds/Uploads"
                .to_string(),
            include_postinstall: true,
            ..Default::default()
        },
        details: Some(PresetDetails {
            requirements: vec![
                "Microsoft Teams (New) must be installed".to_string(),
                "Images should be high quality for best results".to_string(),
                "Recommended resolution: 1920x1080 or higher".to_string(),
            ],
            supported_formats: vec![
                "PNG (recommended)".to_string(),
                "JPG/JPEG (will be converted to PNG)".to_string(),
                "ZIP archives containing multiple images".to_string(),
            ],
            notes: vec![
                "Teams automatically generates thumbnails (186px height)".to_string(),
                "Each background gets a unique GUID".to_string(),
                "Backgrounds appear immediately in Teams after installation".to_string(),
            ],
        }),
    }
}

//! Classified input metadata.

use std::fmt;
use std::path::PathBuf;

/// Reverse-domain stem used for suggested identifiers.
pub const IDENTIFIER_STEM: &str = "com.company";

/// What a dropped input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    DiskImage,
    Archive,
    AppBundle,
    Directory,
    Executable,
    Unknown,
}

impl InputKind {
    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::DiskImage => "Disk Image",
            Self::Archive => "ZIP Archive",
            Self::AppBundle => "Application Bundle",
            Self::Directory => "Directory",
            Self::Executable => "Executable",
            Self::Unknown => "File",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Metadata derived from an input path by [`classify`](super::classify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    /// Path that was classified.
    pub path: PathBuf,
    /// Size in bytes. Directories report the total of their regular files.
    pub size: u64,
    pub kind: InputKind,
    /// File name of the located application bundle, e.g. `Acme.app`.
    pub app_name: Option<String>,
    /// File name of the located executable.
    pub binary_name: Option<String>,
    pub version: Option<String>,
    /// Raw bytes of the bundle icon (`.icns`).
    pub icon: Option<Vec<u8>>,
}

impl InputDescriptor {
    /// Identifier derived from the app name, the binary name, or the file
    /// stem, in that order of preference.
    pub fn suggested_identifier(&self) -> String {
        let base = self
            .app_name
            .clone()
            .or_else(|| self.binary_name.clone())
            .or_else(|| {
                self.path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        format!("{}.{}", IDENTIFIER_STEM, clean_name(&base))
    }
}

fn clean_name(name: &str) -> String {
    let compact: String = name.chars().filter(|c| *c != ' ').collect();
    let trimmed = compact.strip_suffix(".app").unwrap_or(&compact);
    trimmed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str) -> InputDescriptor {
        InputDescriptor {
            path: PathBuf::from(path),
            size: 0,
            kind: InputKind::Unknown,
            app_name: None,
            binary_name: None,
            version: None,
            icon: None,
        }
    }

    #[test]
    fn app_name_wins() {
        let mut input = descriptor("/Volumes/Installer");
        input.app_name = Some("Acme Studio.app".into());
        input.binary_name = Some("helper".into());
        assert_eq!(input.suggested_identifier(), "com.company.acmestudio");
    }

    #[test]
    fn binary_name_before_file_stem() {
        let mut input = descriptor("/tmp/payload");
        input.binary_name = Some("AcmeCTL".into());
        assert_eq!(input.suggested_identifier(), "com.company.acmectl");
    }

    #[test]
    fn file_stem_drops_extension() {
        let input = descriptor("/tmp/My Tool.dmg");
        assert_eq!(input.suggested_identifier(), "com.company.mytool");
    }
}

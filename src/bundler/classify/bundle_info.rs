//! Application bundle metadata (`Contents/Info.plist`).

use crate::bundler::error::Result;
use std::path::{Path, PathBuf};

const INFO_PLIST: &str = "Contents/Info.plist";
const RESOURCES_DIR: &str = "Contents/Resources";
const SHORT_VERSION_KEY: &str = "CFBundleShortVersionString";
const BUILD_VERSION_KEY: &str = "CFBundleVersion";
const ICON_FILE_KEY: &str = "CFBundleIconFile";

/// The parts of an app bundle's Info.plist the classifier cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleInfo {
    pub short_version: Option<String>,
    pub build_version: Option<String>,
    pub icon_file: Option<String>,
}

impl BundleInfo {
    /// Reads `Contents/Info.plist` from the bundle at `app`.
    pub fn read(app: &Path) -> Result<Self> {
        let value = plist::Value::from_file(app.join(INFO_PLIST))?;
        let dict = value.as_dictionary().ok_or_else(|| {
            crate::bundler::Error::GenericError(format!(
                "{} in {} is not a dictionary",
                INFO_PLIST,
                app.display()
            ))
        })?;

        let string = |key: &str| {
            dict.get(key)
                .and_then(|v| v.as_string())
                .map(str::to_string)
        };

        Ok(Self {
            short_version: string(SHORT_VERSION_KEY),
            build_version: string(BUILD_VERSION_KEY),
            icon_file: string(ICON_FILE_KEY),
        })
    }

    /// Short version, falling back to the build version.
    pub fn version(&self) -> Option<String> {
        self.short_version
            .clone()
            .or_else(|| self.build_version.clone())
    }

    /// Location of the declared icon inside the bundle.
    pub fn icon_path(&self, app: &Path) -> Option<PathBuf> {
        let name = self.icon_file.as_deref()?;
        let file = if name.ends_with(".icns") {
            name.to_string()
        } else {
            format!("{}.icns", name)
        };
        Some(app.join(RESOURCES_DIR).join(file))
    }

    /// Loads the declared icon. Missing keys or files simply yield `None`.
    pub fn load_icon(&self, app: &Path) -> Option<Vec<u8>> {
        let path = self.icon_path(app)?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("No icon at {}: {}", path.display(), e);
                None
            }
        }
    }
}

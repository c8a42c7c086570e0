//! Input classification.
//!
//! [`classify`] looks at a dropped path and reports what it is, plus any
//! metadata useful for pre-filling a configuration: application name,
//! executable name, version and icon. Classification only reads.
//!
//! # Detection order
//!
//! - Directories ending in `.app` are application bundles.
//! - Other directories are searched one level deep for an application bundle
//!   and an executable file.
//! - Regular files are dispatched on extension (`dmg`, `zip`); extensionless
//!   files with an executable bit are executables.
//!
//! # Version order
//!
//! 1. `CFBundleShortVersionString`, then `CFBundleVersion`, of the located bundle
//! 2. The file name, via [`version::VERSION_RULES`]

mod bundle_info;
mod descriptor;
pub mod version;

pub use bundle_info::BundleInfo;
pub use descriptor::{IDENTIFIER_STEM, InputDescriptor, InputKind};

use std::path::{Path, PathBuf};

/// Extensions treated as disk images.
pub const DISK_IMAGE_EXTENSIONS: &[&str] = &["dmg"];

/// Extensions treated as archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

const APP_EXTENSION: &str = "app";

/// Classifies the input at `path`.
///
/// Never fails: unreadable or missing paths come back as
/// [`InputKind::Unknown`] with whatever could be derived from the name.
pub fn classify(path: impl AsRef<Path>) -> InputDescriptor {
    let path = path.as_ref();
    let mut kind = InputKind::Unknown;
    let mut app_name = None;
    let mut binary_name = None;
    let mut version = None;
    let mut icon = None;

    let metadata = std::fs::metadata(path).ok();
    let is_dir = metadata.as_ref().is_some_and(|m| m.is_dir());

    if is_dir {
        let app = if has_extension(path, APP_EXTENSION) {
            kind = InputKind::AppBundle;
            Some(path.to_path_buf())
        } else {
            kind = InputKind::Directory;
            if let Some(binary) = find_executable(path) {
                binary_name = file_name(&binary);
            }
            find_app_bundle(path)
        };

        if let Some(app) = app {
            app_name = file_name(&app);
            match BundleInfo::read(&app) {
                Ok(info) => {
                    version = info.version();
                    icon = info.load_icon(&app);
                }
                Err(e) => log::debug!("No bundle metadata for {}: {}", app.display(), e),
            }
        }
    } else if metadata.as_ref().is_some_and(|m| m.is_file()) {
        kind = match extension(path).as_deref() {
            Some(ext) if DISK_IMAGE_EXTENSIONS.contains(&ext) => InputKind::DiskImage,
            Some(ext) if ARCHIVE_EXTENSIONS.contains(&ext) => InputKind::Archive,
            None if is_executable(path) => {
                binary_name = file_name(path);
                InputKind::Executable
            }
            _ => InputKind::Unknown,
        };
    }

    if version.is_none() {
        version = file_name(path).and_then(|name| version::version_from_file_name(&name));
    }

    let size = if is_dir {
        directory_size(path)
    } else {
        metadata.as_ref().map(|m| m.len()).unwrap_or(0)
    };

    log::debug!(
        "Classified {} as {} ({} bytes, version {:?})",
        path.display(),
        kind,
        size,
        version
    );

    InputDescriptor {
        path: path.to_path_buf(),
        size,
        kind,
        app_name,
        binary_name,
        version,
        icon,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    extension(path).as_deref() == Some(wanted)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Immediate children sorted by name, so results do not depend on
/// directory iteration order.
fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    children.sort();
    children
}

fn find_app_bundle(dir: &Path) -> Option<PathBuf> {
    sorted_children(dir)
        .into_iter()
        .find(|child| child.is_dir() && has_extension(child, APP_EXTENSION))
}

fn find_executable(dir: &Path) -> Option<PathBuf> {
    sorted_children(dir)
        .into_iter()
        .find(|child| child.is_file() && is_executable(child))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

fn directory_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

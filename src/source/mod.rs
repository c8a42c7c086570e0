//! Input and output path resolution

use crate::error::{BundlerError, CliError, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Extension of produced installer packages.
pub const PACKAGE_EXTENSION: &str = "pkg";

/// Absolute input path. The input must exist.
pub fn resolve_input(path: &Path) -> Result<PathBuf> {
    let absolute = absolutize(path)?;
    if !absolute.exists() {
        return Err(BundlerError::Cli(CliError::InvalidArguments {
            reason: format!("Input does not exist: {}", absolute.display()),
        }));
    }
    Ok(absolute)
}

/// Absolute output path.
///
/// Without an explicit output the package lands next to the input, named
/// after it. Parent directories are created.
pub fn resolve_output(output: Option<&Path>, input: &Path) -> Result<PathBuf> {
    let output = match output {
        Some(path) => absolutize(path)?,
        None => default_output(input),
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(output)
}

/// `<input dir>/<input stem>.pkg`
pub fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "package".to_string());
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.{}", stem, PACKAGE_EXTENSION))
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_beside_input() {
        assert_eq!(
            default_output(Path::new("/tmp/Acme-2.1.dmg")),
            PathBuf::from("/tmp/Acme-2.1.pkg")
        );
        assert_eq!(
            default_output(Path::new("/tmp/Acme.app")),
            PathBuf::from("/tmp/Acme.pkg")
        );
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = resolve_input(Path::new("/nonexistent/input.dmg")).unwrap_err();
        assert!(matches!(err, BundlerError::Cli(CliError::InvalidArguments { .. })));
    }

    #[test]
    fn output_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = dir.path().join("out/nested/a.pkg");
        let output = resolve_output(Some(&wanted), Path::new("/tmp/a.dmg")).unwrap();
        assert_eq!(output, wanted);
        assert!(wanted.parent().unwrap().is_dir());
    }
}

//! Scoped temporary files for one build session.
//!
//! Every file the orchestrator writes before spawning the engine (the
//! executable engine copy, the preinstall and postinstall scripts) is held as
//! a [`TempPath`] inside [`ScratchFiles`]. Release happens either explicitly
//! through [`ScratchFiles::release`] or when the guard is dropped, and each
//! file is removed exactly once.

use crate::bundler::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};

/// Prefix for the executable engine copy.
pub const ENGINE_COPY_PREFIX: &str = "kodegen-pkg-engine-";
pub const PREINSTALL_PREFIX: &str = "preinstall-";
pub const POSTINSTALL_PREFIX: &str = "postinstall-";

const EXECUTABLE_MODE: u32 = 0o755;

/// Temporary files owned by a session.
#[derive(Debug)]
pub struct ScratchFiles {
    dir: PathBuf,
    files: Vec<TempPath>,
}

impl ScratchFiles {
    /// Files will be created under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|file| file.to_path_buf()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Copies the engine into a fresh executable file.
    pub fn copy_engine(&mut self, engine: &Path) -> Result<PathBuf> {
        let path = self.reserve(ENGINE_COPY_PREFIX, ".sh")?;
        fs::copy(engine, &path).map_err(|source| Error::TemporaryResource {
            path: path.clone(),
            source,
        })?;
        make_executable(&path)?;
        log::debug!("Copied engine {} to {}", engine.display(), path.display());
        Ok(path)
    }

    /// Writes an executable script file with the given prefix.
    pub fn write_script(&mut self, prefix: &str, contents: &str) -> Result<PathBuf> {
        let path = self.reserve(prefix, ".sh")?;
        fs::write(&path, contents).map_err(|source| Error::TemporaryResource {
            path: path.clone(),
            source,
        })?;
        make_executable(&path)?;
        Ok(path)
    }

    /// Removes every file. Removal failures are logged and ignored.
    pub fn release(&mut self) {
        for file in self.files.drain(..) {
            let path = file.to_path_buf();
            if let Err(e) = file.close() {
                log::debug!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    /// Creates an empty uniquely named file and takes ownership of it.
    fn reserve(&mut self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let file = Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(|source| Error::TemporaryResource {
                path: self.dir.join(format!("{prefix}*{suffix}")),
                source,
            })?;
        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        self.files.push(temp_path);
        Ok(path)
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE)).map_err(|source| {
        Error::TemporaryResource {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_removes_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = ScratchFiles::new(dir.path());

        let pre = scratch.write_script(PREINSTALL_PREFIX, "#!/bin/bash\nexit 0\n").unwrap();
        let post = scratch.write_script(POSTINSTALL_PREFIX, "#!/bin/bash\nexit 0\n").unwrap();
        assert!(pre.exists() && post.exists());
        assert_eq!(scratch.len(), 2);
        assert_eq!(std::fs::read_to_string(&pre).unwrap(), "#!/bin/bash\nexit 0\n");

        scratch.release();
        assert!(!pre.exists() && !post.exists());
        assert!(scratch.is_empty());

        // Second release is a no-op.
        scratch.release();
    }

    #[test]
    fn drop_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut scratch = ScratchFiles::new(dir.path());
            scratch.write_script(PREINSTALL_PREFIX, "echo hi").unwrap()
        };
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn engine_copy_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("engine.sh");
        std::fs::write(&engine, "#!/bin/sh\nexit 0\n").unwrap();

        let mut scratch = ScratchFiles::new(dir.path());
        let copy = scratch.copy_engine(&engine).unwrap();
        let mode = std::fs::metadata(&copy).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(
            copy.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(ENGINE_COPY_PREFIX)
        );
    }

    #[test]
    fn missing_engine_is_temporary_resource_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = ScratchFiles::new(dir.path());
        let err = scratch
            .copy_engine(&dir.path().join("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, Error::TemporaryResource { .. }));
        // The reserved file is still owned and removed on release.
        let leftover = scratch.paths();
        scratch.release();
        assert!(leftover.iter().all(|p| !p.exists()));
    }
}

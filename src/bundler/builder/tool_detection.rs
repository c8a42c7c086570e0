//! Packaging engine detection.
//!
//! The engine is looked up in order: an explicit path, the
//! `KODEGEN_PKG_ENGINE` environment variable, next to the running executable,
//! in a sibling `../Resources` directory (app bundle layout), and finally on
//! `PATH`.

use crate::bundler::{Error, Result};
use std::path::{Path, PathBuf};

/// File name of the packaging engine.
pub const ENGINE_NAME: &str = "kodegen-pkg-engine.sh";

/// Environment variable naming the engine path.
pub const ENGINE_ENV: &str = "KODEGEN_PKG_ENGINE";

/// Where an engine was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSource {
    Explicit,
    Environment,
    BesideExecutable,
    Resources,
    Path,
}

/// Resolves the packaging engine.
#[derive(Debug, Clone, Default)]
pub struct EngineLocator {
    explicit: Option<PathBuf>,
    env_value: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
}

impl EngineLocator {
    /// Locator seeded from the process environment.
    pub fn from_env() -> Self {
        Self {
            explicit: None,
            env_value: std::env::var_os(ENGINE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }

    /// Locator that only considers `path`.
    pub fn explicit(path: impl AsRef<Path>) -> Self {
        Self {
            explicit: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    pub fn with_explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_exe_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.exe_dir = dir;
        self
    }

    /// Candidates in lookup order, before the `PATH` search.
    pub fn candidates(&self) -> Vec<(EngineSource, PathBuf)> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.explicit {
            candidates.push((EngineSource::Explicit, path.clone()));
        }
        if let Some(path) = &self.env_value {
            candidates.push((EngineSource::Environment, path.clone()));
        }
        if let Some(dir) = &self.exe_dir {
            candidates.push((EngineSource::BesideExecutable, dir.join(ENGINE_NAME)));
            candidates.push((
                EngineSource::Resources,
                dir.join("..").join("Resources").join(ENGINE_NAME),
            ));
        }
        candidates
    }

    /// First existing engine.
    ///
    /// An explicit path that does not exist is an error rather than a reason
    /// to keep searching.
    pub fn locate(&self) -> Result<(EngineSource, PathBuf)> {
        if let Some(path) = self.explicit.as_ref().filter(|p| !p.is_file()) {
            return Err(Error::EngineLaunch(format!(
                "engine not found at {}",
                path.display()
            )));
        }

        for (source, path) in self.candidates() {
            if path.is_file() {
                log::debug!("Found packaging engine ({:?}) at {}", source, path.display());
                return Ok((source, path));
            }
            log::debug!("No packaging engine at {}", path.display());
        }

        match which::which(ENGINE_NAME) {
            Ok(path) => {
                log::debug!("Found packaging engine on PATH at {}", path.display());
                Ok((EngineSource::Path, path))
            }
            Err(e) => Err(Error::EngineLaunch(format!(
                "{} not found (set {} or pass --engine): {}",
                ENGINE_NAME, ENGINE_ENV, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("custom.sh");
        std::fs::write(&engine, "#!/bin/sh\n").unwrap();

        let (source, path) = EngineLocator::explicit(&engine).locate().unwrap();
        assert_eq!(source, EngineSource::Explicit);
        assert_eq!(path, engine);
    }

    #[test]
    fn missing_explicit_path_is_launch_error() {
        let err = EngineLocator::explicit("/nonexistent/engine.sh")
            .locate()
            .unwrap_err();
        assert!(matches!(err, Error::EngineLaunch(_)));
    }

    #[test]
    fn finds_engine_beside_executable_then_resources() {
        let root = tempfile::tempdir().unwrap();
        let macos = root.path().join("MacOS");
        let resources = root.path().join("Resources");
        std::fs::create_dir_all(&macos).unwrap();
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join(ENGINE_NAME), "#!/bin/sh\n").unwrap();

        let locator = EngineLocator::default().with_exe_dir(Some(macos.clone()));
        let (source, _) = locator.locate().unwrap();
        assert_eq!(source, EngineSource::Resources);

        std::fs::write(macos.join(ENGINE_NAME), "#!/bin/sh\n").unwrap();
        let (source, path) = locator.locate().unwrap();
        assert_eq!(source, EngineSource::BesideExecutable);
        assert_eq!(path, macos.join(ENGINE_NAME));
    }
}

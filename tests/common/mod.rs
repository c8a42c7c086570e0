//! Common test utilities and helpers
//!
//! Fake packaging engines live in `tests/fixtures/engines`; each test gets
//! its own scratch directory so leftover temporary files can be counted.

#![allow(dead_code)]

use kodegen_bundler_pkg::bundler::{BuildConfiguration, BuildOrchestrator};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Path of a fixture engine script.
pub fn engine(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/engines")
        .join(name)
}

/// Valid configuration for `com.acme.app` 2.0.
pub fn configuration() -> BuildConfiguration {
    BuildConfiguration {
        identifier: "com.acme.app".to_string(),
        version: "2.0".to_string(),
        ..Default::default()
    }
}

/// Temporary workspace: scratch directory plus input/output locations.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(dir.path().join("scratch")).expect("Failed to create scratch dir");
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn scratch(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    pub fn input(&self) -> PathBuf {
        let input = self.dir.path().join("Acme-2.0.dmg");
        if !input.exists() {
            std::fs::write(&input, b"disk image").expect("Failed to write input");
        }
        input
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("Acme.pkg")
    }

    /// Files left in the scratch directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch())
            .expect("Failed to read scratch dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect()
    }

    /// Orchestrator running the named fixture engine with short grace periods.
    pub fn orchestrator(&self, engine_name: &str) -> BuildOrchestrator {
        BuildOrchestrator::new()
            .with_engine(engine(engine_name))
            .with_scratch_dir(self.scratch())
            .with_termination_grace(Duration::from_secs(2))
            .with_drain_grace(Duration::from_millis(500))
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls until `condition` holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

//! Produced package checksum calculation.
//!
//! Flat packages are single files; bundle-style packages are directories.
//! Both are reported with their size and a SHA-256 digest.

use crate::{bail, bundler::Result, bundler::error::ErrorExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Size and digest of a produced package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
}

impl PackageArtifact {
    /// Inspects the package at `path`.
    pub async fn inspect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size = artifact_size(path).await?;
        let checksum = calculate_sha256(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            size,
            checksum,
        })
    }
}

async fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading package metadata", path)?;
    if metadata.is_dir() {
        let dir = path.to_path_buf();
        let size = tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum::<u64>()
        })
        .await
        .map_err(|e| crate::bundler::Error::GenericError(e.to_string()))?;
        Ok(size)
    } else {
        Ok(metadata.len())
    }
}

/// SHA-256 of a file, or of a directory tree in sorted path order.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading package metadata", path)?;

    if metadata.is_file() {
        calculate_file_sha256(path).await
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }
}

async fn calculate_file_sha256(file_path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    hash_file_into(file_path, &mut hasher).await?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Each file contributes its relative path followed by its content.
async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(dir_path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by_key(|e| e.path().to_path_buf());

    let mut hasher = Sha256::new();
    for entry in entries {
        if let Ok(rel_path) = entry.path().strip_prefix(dir_path) {
            hasher.update(rel_path.to_string_lossy().as_bytes());
        }
        hash_file_into(entry.path(), &mut hasher).await?;
    }

    Ok(format!("{:x}", hasher.finalize()))
}

async fn hash_file_into(path: &Path, hasher: &mut Sha256) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("a.pkg");
        std::fs::write(&pkg, b"abc").unwrap();

        let artifact = PackageArtifact::inspect(&pkg).await.unwrap();
        assert_eq!(artifact.size, 3);
        assert_eq!(
            artifact.checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn directory_artifact_sums_files() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("bundle.pkg");
        std::fs::create_dir_all(pkg.join("Contents")).unwrap();
        std::fs::write(pkg.join("Contents/a"), b"12").unwrap();
        std::fs::write(pkg.join("b"), b"345").unwrap();

        let artifact = PackageArtifact::inspect(&pkg).await.unwrap();
        assert_eq!(artifact.size, 5);
        assert_eq!(artifact.checksum.len(), 64);
        assert_eq!(artifact.checksum, calculate_sha256(&pkg).await.unwrap());
    }

    #[tokio::test]
    async fn missing_artifact_is_error() {
        assert!(PackageArtifact::inspect("/nonexistent/out.pkg").await.is_err());
    }
}

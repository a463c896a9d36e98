//! Versioned, atomically-swappable persistence of trained model artifacts.

use std::path::{Path, PathBuf};
use thiserror::Error;

use digero_model::ModelArtifact;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt model artifact at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },
    #[error("No model artifact found in {0}")]
    NotFound(PathBuf),
    #[error("Failed to serialize model artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Directory of `model-v{N}.json` artifacts.
///
/// Publishing writes the full JSON to a `.tmp` sibling and then renames
/// it into place, so a reader (or a restart after a crash mid-write) only
/// ever sees complete artifacts; a half-written `.tmp` is invisible to
/// version scans.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ModelStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact_path(&self, version: u64) -> PathBuf {
        self.dir.join(format!("model-v{version}.json"))
    }

    /// Persist an artifact; returns its final location.
    pub async fn publish(&self, artifact: &ModelArtifact) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.artifact_path(artifact.version);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(artifact)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Highest version present, if any. Ignores temp files and anything
    /// that does not match the artifact naming scheme.
    pub async fn latest_version(&self) -> Result<Option<u64>, StoreError> {
        let mut latest = None;
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(version) = parse_artifact_name(&entry.file_name().to_string_lossy()) {
                latest = latest.max(Some(version));
            }
        }
        Ok(latest)
    }

    pub async fn load_version(&self, version: u64) -> Result<ModelArtifact, StoreError> {
        let path = self.artifact_path(version);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path))
            }
            Err(e) => return Err(e.into()),
        };
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        artifact.validate().map_err(|detail| StoreError::Corrupt {
            path: path.clone(),
            detail,
        })?;
        Ok(artifact)
    }

    pub async fn load_latest(&self) -> Result<ModelArtifact, StoreError> {
        match self.latest_version().await? {
            Some(version) => self.load_version(version).await,
            None => Err(StoreError::NotFound(self.dir.clone())),
        }
    }

    /// Remove old versions, always retaining the `keep` most recent
    /// (and never fewer than one).
    pub async fn prune(&self, keep: usize) -> Result<(), StoreError> {
        let keep = keep.max(1);
        let mut versions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(version) = parse_artifact_name(&entry.file_name().to_string_lossy()) {
                versions.push(version);
            }
        }
        versions.sort_unstable_by(|a, b| b.cmp(a));
        for version in versions.into_iter().skip(keep) {
            tokio::fs::remove_file(self.artifact_path(version)).await?;
        }
        Ok(())
    }
}

fn parse_artifact_name(name: &str) -> Option<u64> {
    name.strip_prefix("model-v")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

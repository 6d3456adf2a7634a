//! Output boundary for processed artifacts
//!
//! The pipeline hands every non-empty result to an [`ArtifactSink`]. Two implementations are
//! provided:
//!
//! - [`CsvDirectorySink`] writes `<root>/<event>/<segment>.csv` tables with an `x,y,t` header.
//! - [`CollectingSink`] keeps artifacts in memory, for embedding and tests.

use crate::{Artifact, LocalSample, Result, utils};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for artifacts. Called concurrently from the pipeline's worker threads.
pub trait ArtifactSink: Send + Sync {
    fn write(&self, artifact: &Artifact) -> Result<()>;
}

/// Writes one CSV table per artifact, grouped in one directory per event
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    root: PathBuf,
}

impl CsvDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an artifact's table
    ///
    /// The event name is sanitized so it always stays a single directory below the root.
    pub fn artifact_path(&self, artifact: &Artifact) -> PathBuf {
        self.root
            .join(utils::sanitize(&artifact.event))
            .join(format!("{}.csv", artifact.segment))
    }
}

impl ArtifactSink for CsvDirectorySink {
    fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = self.artifact_path(artifact);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_csv(&path, &artifact.samples)?;
        tracing::debug!(
            "Wrote {} samples to {}",
            artifact.samples.len(),
            path.display()
        );
        Ok(())
    }
}

/// Write samples as an `x,y,t` table
///
/// The header is written even without samples.
pub fn write_csv(path: &Path, samples: &[LocalSample]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(["x", "y", "t"])?;
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}

/// Keeps every artifact in memory, in write order
#[derive(Debug, Default)]
pub struct CollectingSink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl CollectingSink {
    /// Snapshot of the artifacts written so far
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactSink for CollectingSink {
    fn write(&self, artifact: &Artifact) -> Result<()> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(artifact.clone());
        Ok(())
    }
}

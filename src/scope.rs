use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DubError, Result};

/// Owner of every temporary artifact created during one pipeline run.
///
/// The manifest accumulates as the run proceeds because the set of paths
/// depends on how many target languages succeed. All artifacts are removed
/// when the scope closes, on success and failure alike; cleanup failures
/// are logged and never mask the primary result. Concurrent language
/// pipelines share the scope but each writes only to uniquely named paths,
/// so the manifest lock is the only synchronization needed.
pub struct PipelineScope {
    base: TempDir,
    manifest: Mutex<Vec<PathBuf>>,
}

impl PipelineScope {
    pub fn open() -> Result<Self> {
        let base = tempfile::Builder::new()
            .prefix("polydub_")
            .tempdir()
            .map_err(DubError::Io)?;

        debug!("Opened pipeline scope at {}", base.path().display());

        Ok(Self {
            base,
            manifest: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.base.path()
    }

    /// Allocate a uniquely named artifact path and record it in the
    /// manifest. The file itself is created by whoever writes it.
    pub fn allocate(&self, prefix: &str, extension: &str) -> PathBuf {
        let name = format!("{}_{}.{}", prefix, Uuid::new_v4().simple(), extension);
        let path = self.base.path().join(name);
        self.register(path.clone());
        path
    }

    /// Record an externally created path so it is removed at close.
    pub fn register(&self, path: PathBuf) {
        self.manifest
            .lock()
            .expect("scope manifest lock poisoned")
            .push(path);
    }

    pub fn artifact_count(&self) -> usize {
        self.manifest
            .lock()
            .expect("scope manifest lock poisoned")
            .len()
    }

    /// Write bytes into a freshly allocated artifact.
    pub async fn write_artifact(
        &self,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = self.allocate(prefix, extension);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove every recorded artifact and the scope directory.
    ///
    /// Failures are logged per path; the scope directory itself is a
    /// backstop that tempfile removes recursively either way.
    pub fn close(self) {
        let manifest = self
            .manifest
            .into_inner()
            .expect("scope manifest lock poisoned");

        info!("Closing pipeline scope ({} artifacts)", manifest.len());

        for path in manifest {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Resource cleanup failed for {}: {}", path.display(), e);
                }
            }
        }

        if let Err(e) = self.base.close() {
            warn!("Resource cleanup failed for scope directory: {}", e);
        }
    }
}

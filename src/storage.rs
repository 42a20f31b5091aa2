use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::StorageConfig;
use crate::error::{DubError, Result};

/// Object storage boundary: the pipeline only ever uploads finished
/// artifacts and receives a public URL back.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Kind of persisted record emitted after a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Media,
    Subtitle,
    AudioTrack,
}

/// One persisted-record emission. The record schema beyond this shape is
/// the downstream collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub kind: RecordKind,
    pub language: Option<String>,
    pub url: String,
    /// URL of the parent media artifact, for subtitle/audio-track records
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn media(url: String) -> Self {
        Self {
            kind: RecordKind::Media,
            language: None,
            url,
            media_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn subtitle(language: &str, url: String, media_url: &str) -> Self {
        Self {
            kind: RecordKind::Subtitle,
            language: Some(language.to_string()),
            url,
            media_url: Some(media_url.to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn audio_track(language: &str, url: String, media_url: &str) -> Self {
        Self {
            kind: RecordKind::AudioTrack,
            language: Some(language.to_string()),
            url,
            media_url: Some(media_url.to_string()),
            created_at: Utc::now(),
        }
    }
}

/// Persisted-record boundary.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn create_record(&self, record: ArtifactRecord) -> Result<()>;
}

/// Filesystem-backed storage for local runs and tests: artifacts land
/// under a configured directory and the "public URL" is a configured
/// prefix plus the key.
pub struct FsStorage {
    output_dir: PathBuf,
    public_base_url: String,
}

impl FsStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let target = self.output_dir.join(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        info!(
            "Stored {} ({} bytes, {}) at {}",
            key,
            bytes.len(),
            content_type,
            target.display()
        );
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// Record sink that appends one JSON line per record, standing in for the
/// external persistence collaborator.
pub struct JsonlRecordSink {
    path: PathBuf,
}

impl JsonlRecordSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RecordSink for JsonlRecordSink {
    async fn create_record(&self, record: ArtifactRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DubError::Storage(format!("failed to open record log: {}", e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DubError::Storage(format!("failed to append record: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_storage_writes_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(&StorageConfig {
            output_dir: dir.path().to_string_lossy().to_string(),
            public_base_url: "https://cdn.example/".to_string(),
        });

        let url = storage
            .upload("video/out.mp4", b"container", "video/mp4")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/video/out.mp4");
        assert_eq!(
            std::fs::read(dir.path().join("video/out.mp4")).unwrap(),
            b"container"
        );
    }

    #[tokio::test]
    async fn test_record_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("records.jsonl");
        let sink = JsonlRecordSink::new(log.clone());

        sink.create_record(ArtifactRecord::media("u1".to_string()))
            .await
            .unwrap();
        sink.create_record(ArtifactRecord::subtitle("fr", "u2".to_string(), "u1"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: ArtifactRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.kind, RecordKind::Subtitle);
        assert_eq!(second.language.as_deref(), Some("fr"));
        assert_eq!(second.media_url.as_deref(), Some("u1"));
    }
}

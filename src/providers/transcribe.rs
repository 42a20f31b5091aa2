use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::TranscriptionProvider;
use crate::config::TranscriptionConfig;
use crate::error::{DubError, Result};

/// Transcription job state as reported by the provider.
///
/// Modeled as an explicit tagged outcome so polling never has to infer
/// "not done yet" from an error path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JobResponse {
    id: String,
    status: String,
    error: Option<String>,
}

impl JobResponse {
    fn status(&self) -> JobStatus {
        match self.status.as_str() {
            "queued" => JobStatus::Queued,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Failed(
                self.error
                    .clone()
                    .unwrap_or_else(|| "unspecified provider error".to_string()),
            ),
            _ => JobStatus::Processing,
        }
    }
}

/// REST transcription provider (submit job, poll status, fetch SRT result).
pub struct RestTranscriber {
    client: Client,
    config: TranscriptionConfig,
}

impl RestTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    /// Upload a local audio file to the provider's staging storage.
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        info!("Uploading audio for transcription: {}", audio_path.display());

        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            DubError::Transcription(format!("failed to read audio file: {}", e))
        })?;

        let response = self
            .client
            .post(format!("{}/upload", self.config.endpoint))
            .header("Authorization", &self.config.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| DubError::Transcription(format!("upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DubError::Transcription(format!(
                "upload rejected with status {}",
                response.status()
            )));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| DubError::Transcription(format!("invalid upload response: {}", e)))?;

        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/transcript", self.config.endpoint))
            .header("Authorization", &self.config.api_key)
            .json(&json!({ "audio_url": audio_url }))
            .send()
            .await
            .map_err(|e| DubError::Transcription(format!("submit request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DubError::Transcription(format!(
                "submit rejected with status {}",
                response.status()
            )));
        }

        let job: JobResponse = response
            .json()
            .await
            .map_err(|e| DubError::Transcription(format!("invalid submit response: {}", e)))?;

        info!("Transcription job started: {}", job.id);
        Ok(job.id)
    }

    async fn poll_status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(format!("{}/transcript/{}", self.config.endpoint, job_id))
            .header("Authorization", &self.config.api_key)
            .send()
            .await
            .map_err(|e| DubError::Transcription(format!("status request failed: {}", e)))?;

        let job: JobResponse = response
            .json()
            .await
            .map_err(|e| DubError::Transcription(format!("invalid status response: {}", e)))?;

        debug!("Transcription job {} status: {:?}", job_id, job.status());
        Ok(job.status())
    }

    async fn fetch_result(&self, job_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!(
                "{}/transcript/{}/srt",
                self.config.endpoint, job_id
            ))
            .header("Authorization", &self.config.api_key)
            .send()
            .await
            .map_err(|e| DubError::Transcription(format!("result request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DubError::Transcription(format!(
                "result fetch rejected with status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DubError::Transcription(format!("failed to read result body: {}", e)))
    }

    async fn wait_for_completion(&self, job_id: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            match self.poll_status(job_id).await? {
                JobStatus::Completed => return Ok(()),
                JobStatus::Failed(cause) => {
                    return Err(DubError::Transcription(format!(
                        "job {} failed: {}",
                        job_id, cause
                    )));
                }
                JobStatus::Queued | JobStatus::Processing => {
                    if Instant::now() >= deadline {
                        return Err(DubError::Timeout(format!(
                            "transcription job {} exceeded {}s",
                            job_id, self.config.timeout_secs
                        )));
                    }
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl TranscriptionProvider for RestTranscriber {
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String> {
        let audio_url = self.upload(audio_path).await?;
        let job_id = self.submit(&audio_url).await?;
        self.wait_for_completion(&job_id).await?;

        let srt = self.fetch_result(&job_id).await?;
        info!("Transcription job {} completed ({} bytes)", job_id, srt.len());
        Ok(srt)
    }
}

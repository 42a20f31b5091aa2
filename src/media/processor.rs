use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::{MediaCommand, MediaCommandBuilder, MediaProcessor, ProbeReport};
use crate::config::MediaConfig;
use crate::error::{DubError, Result};

/// FFmpeg-backed media processor.
///
/// Tempo adjustment, concatenation, and muxing are CPU/IO-heavy external
/// processes; a semaphore caps how many run at once so concurrent language
/// pipelines cannot exhaust the host.
pub struct FfmpegProcessor {
    config: MediaConfig,
    builder: MediaCommandBuilder,
    subprocess_slots: Semaphore,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        let subprocess_slots = Semaphore::new(config.subprocess_concurrency.max(1));

        Self {
            config,
            builder,
            subprocess_slots,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn run(&self, command: MediaCommand) -> Result<()> {
        let _slot = self
            .subprocess_slots
            .acquire()
            .await
            .map_err(|_| DubError::Media("subprocess pool closed".to_string()))?;
        command.execute(self.timeout()).await
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            video_path.display(),
            audio_path.display()
        );

        let command =
            self.builder
                .extract_audio(video_path, audio_path, &self.config.extract_bitrate);
        self.run(command).await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn convert_subtitle(&self, input: &Path, output: &Path) -> Result<()> {
        debug!(
            "Converting subtitle {} -> {}",
            input.display(),
            output.display()
        );
        self.run(self.builder.convert_subtitle(input, output)).await
    }

    async fn adjust_tempo(&self, input: &Path, output: &Path, factor: f64) -> Result<()> {
        debug!("Applying atempo {:.4} to {}", factor, input.display());
        self.run(self.builder.adjust_tempo(input, output, factor))
            .await
    }

    async fn generate_silence(&self, output: &Path, duration_ms: u64) -> Result<()> {
        debug!("Rendering {}ms silence at {}", duration_ms, output.display());
        self.run(self.builder.generate_silence(output, duration_ms))
            .await
    }

    async fn concat_audio(&self, list_path: &Path, output: &Path) -> Result<()> {
        debug!(
            "Concatenating segments from {} into {}",
            list_path.display(),
            output.display()
        );
        self.run(self.builder.concat_audio(list_path, output)).await
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        let _slot = self
            .subprocess_slots
            .acquire()
            .await
            .map_err(|_| DubError::Media("subprocess pool closed".to_string()))?;

        let stdout = self
            .builder
            .probe(path)
            .execute_capture(self.timeout())
            .await?;
        ProbeReport::parse(&stdout)
    }

    async fn execute(&self, command: MediaCommand) -> Result<()> {
        info!("Executing media command: {}", command.description);
        self.run(command).await
    }

    fn check_availability(&self) -> Result<()> {
        let check = self.builder.version_check();
        let output = std::process::Command::new(&check.binary_path)
            .args(&check.args)
            .output()
            .map_err(|e| DubError::Media(format!("Media tool not found: {}", e)))?;

        if output.status.success() {
            info!("Media tool is available");
            Ok(())
        } else {
            Err(DubError::Media(
                "Media tool version check failed".to_string(),
            ))
        }
    }
}

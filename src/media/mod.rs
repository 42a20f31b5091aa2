// Media tool abstraction (ffmpeg/ffprobe)
//
// - Commands: invocation builder and subprocess execution
// - Probe: ffprobe JSON output model
// - Processor: the concrete ffmpeg-backed implementation with a
//   concurrency cap on simultaneous subprocesses

pub mod commands;
pub mod probe;
pub mod processor;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use std::path::Path;

pub use commands::{MediaCommand, MediaCommandBuilder};
pub use probe::{ProbeReport, ProbeStream};
pub use processor::FfmpegProcessor;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media tool operations.
///
/// Every method maps to one external subprocess invocation; non-zero exit
/// surfaces as an error carrying the tool's stderr.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Extract compressed audio from a video file
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Convert between timed-text dialects based on file extensions
    async fn convert_subtitle(&self, input: &Path, output: &Path) -> Result<()>;

    /// Speed up one audio segment by `factor` (single atempo pass)
    async fn adjust_tempo(&self, input: &Path, output: &Path, factor: f64) -> Result<()>;

    /// Render encoded silence of the given duration
    async fn generate_silence(&self, output: &Path, duration_ms: u64) -> Result<()>;

    /// Stream-copy concatenation of the segments named in a concat list file
    async fn concat_audio(&self, list_path: &Path, output: &Path) -> Result<()>;

    /// Probe a media file's streams and container format
    async fn probe(&self, path: &Path) -> Result<ProbeReport>;

    /// Execute a caller-assembled command (the mux step builds its own)
    async fn execute(&self, command: MediaCommand) -> Result<()>;

    /// Check the media tool is present on this host
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    pub fn create_processor(config: MediaConfig) -> std::sync::Arc<dyn MediaProcessor> {
        std::sync::Arc::new(FfmpegProcessor::new(config))
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{DubError, Result};

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_synthesis_concurrency() -> usize {
    4
}

fn default_subprocess_concurrency() -> usize {
    2
}

fn default_source_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub translation: TranslationConfig,
    pub speech: SpeechConfig,
    pub media: MediaConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Speech-to-text provider endpoint
    pub endpoint: String,
    /// Provider API key
    pub api_key: String,
    /// Seconds between job status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Overall timeout for one transcription job (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Chat-completion endpoint used for per-block translation
    pub endpoint: String,
    /// Provider API key
    pub api_key: String,
    /// Model to use for translation
    pub model: String,
    /// Keep the source-language text when a block's translation fails,
    /// instead of failing the whole language
    pub fallback_to_source: bool,
    /// Timeout for one translation call (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Text-to-speech endpoint
    pub endpoint: String,
    /// Provider API key
    pub api_key: String,
    /// TTS model
    pub model: String,
    /// Voice used when no per-language voice is configured
    pub default_voice: String,
    /// Per-language voice overrides
    #[serde(default)]
    pub voices: HashMap<String, String>,
    /// Timeout for one synthesis call (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Timeout for one subprocess invocation (seconds)
    pub timeout_secs: u64,
    /// How many ffmpeg subprocesses may run at once
    #[serde(default = "default_subprocess_concurrency")]
    pub subprocess_concurrency: usize,
    /// Delivery audio codec bitrate, e.g. "64k" for the transcription
    /// upload copy
    pub extract_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Language of the source video's speech (ISO 639-1 code), used for
    /// the original audio's stream metadata and the transcript artifact
    #[serde(default = "default_source_language")]
    pub source_language: String,
    /// How many block-level synthesis calls may be in flight per language
    #[serde(default = "default_synthesis_concurrency")]
    pub synthesis_concurrency: usize,
    /// Timeout for downloading the source video (seconds)
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory the filesystem storage backend publishes into
    pub output_dir: String,
    /// Base URL prefix reported for published artifacts
    pub public_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcription: TranscriptionConfig {
                endpoint: "https://api.assemblyai.com/v2".to_string(),
                api_key: String::new(),
                poll_interval_secs: 3,
                timeout_secs: 1800,
            },
            translation: TranslationConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4".to_string(),
                fallback_to_source: false,
                timeout_secs: 120,
            },
            speech: SpeechConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "tts-1".to_string(),
                default_voice: "nova".to_string(),
                voices: HashMap::from([
                    ("en".to_string(), "alloy".to_string()),
                    ("es".to_string(), "nova".to_string()),
                    ("fr".to_string(), "nova".to_string()),
                    ("de".to_string(), "nova".to_string()),
                    ("ja".to_string(), "nova".to_string()),
                ]),
                timeout_secs: 300,
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                timeout_secs: 600,
                subprocess_concurrency: 2,
                extract_bitrate: "64k".to_string(),
            },
            pipeline: PipelineConfig {
                source_language: "en".to_string(),
                synthesis_concurrency: 4,
                download_timeout_secs: 600,
            },
            storage: StorageConfig {
                output_dir: "output".to_string(),
                public_base_url: "file://output".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

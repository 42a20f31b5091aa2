// External capability adapters
//
// Each provider is modeled as a trait with a fixed request/result contract,
// isolating the pipeline from provider-specific schema churn. Failures are
// typed (`Transcription`, `TranslationFailed`, `SynthesisFailed`) and carry
// the provider's cause text.

pub mod speech;
pub mod transcribe;
pub mod translate;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use transcribe::JobStatus;
pub use translate::translate_blocks;

use crate::config::{SpeechConfig, TranscriptionConfig, TranslationConfig};
use crate::error::Result;

/// Speech-to-text capability: submit, poll to completion, fetch the timed
/// transcript as SRT text.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe a local audio file into SRT timed text
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String>;
}

/// Text-translation capability: one logical call per block.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Text-to-speech capability. Each call is a paid external request; no
/// retries happen inside the adapter.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>>;
}

/// Factory for creating provider instances from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_transcriber(config: TranscriptionConfig) -> Arc<dyn TranscriptionProvider> {
        Arc::new(transcribe::RestTranscriber::new(config))
    }

    pub fn create_translator(config: TranslationConfig) -> Arc<dyn TranslationProvider> {
        Arc::new(translate::ChatTranslator::new(config))
    }

    pub fn create_speech(config: SpeechConfig) -> Arc<dyn SpeechProvider> {
        Arc::new(speech::RestSpeechSynthesizer::new(config))
    }
}

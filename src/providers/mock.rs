//! In-crate provider fakes used by adapter and pipeline tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use super::{SpeechProvider, TranscriptionProvider, TranslationProvider};
use crate::error::{DubError, Result};

/// Translator that uppercases text and appends the target language, so
/// tests can assert exactly what was "translated".
pub struct MockTranslator {
    fail_on_text: Option<String>,
    fail_languages: HashSet<String>,
}

impl MockTranslator {
    pub fn uppercasing() -> Self {
        Self {
            fail_on_text: None,
            fail_languages: HashSet::new(),
        }
    }

    pub fn failing_on(text: &str) -> Self {
        Self {
            fail_on_text: Some(text.to_string()),
            fail_languages: HashSet::new(),
        }
    }

    pub fn failing_for_language(language: &str) -> Self {
        Self {
            fail_on_text: None,
            fail_languages: HashSet::from([language.to_string()]),
        }
    }
}

#[async_trait]
impl TranslationProvider for MockTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if self.fail_languages.contains(target_language) {
            return Err(DubError::Translation(format!(
                "provider rejects language {target_language}"
            )));
        }
        if let Some(bad) = &self.fail_on_text {
            if text.contains(bad.as_str()) {
                return Err(DubError::Translation(format!(
                    "provider rejects text {text:?}"
                )));
            }
        }
        Ok(format!("{} [{}]", text.to_uppercase(), target_language))
    }
}

/// Speech fake producing text-encoded audio (`AUDIO:<ms>`) that
/// [`crate::media::mock::MockMedia`] knows how to probe and adjust.
///
/// Per-text durations and artificial delays let tests scramble completion
/// order and drive the tempo computation precisely.
pub struct MockSpeech {
    durations_ms: HashMap<String, u64>,
    delays_ms: HashMap<String, u64>,
    default_duration_ms: u64,
}

impl MockSpeech {
    pub fn with_default_duration(default_duration_ms: u64) -> Self {
        Self {
            durations_ms: HashMap::new(),
            delays_ms: HashMap::new(),
            default_duration_ms,
        }
    }

    pub fn duration_for(mut self, text: &str, ms: u64) -> Self {
        self.durations_ms.insert(text.to_string(), ms);
        self
    }

    pub fn delay_for(mut self, text: &str, ms: u64) -> Self {
        self.delays_ms.insert(text.to_string(), ms);
        self
    }
}

#[async_trait]
impl SpeechProvider for MockSpeech {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<Vec<u8>> {
        if let Some(delay) = self.delays_ms.get(text) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        let ms = self
            .durations_ms
            .get(text)
            .copied()
            .unwrap_or(self.default_duration_ms);
        Ok(format!("AUDIO:{ms}").into_bytes())
    }
}

/// Transcriber that returns a canned SRT transcript.
pub struct MockTranscriber {
    srt: String,
}

impl MockTranscriber {
    pub fn returning(srt: &str) -> Self {
        Self {
            srt: srt.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscriber {
    async fn transcribe_file(&self, _audio_path: &Path) -> Result<String> {
        Ok(self.srt.clone())
    }
}

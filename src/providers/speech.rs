use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::SpeechProvider;
use crate::config::SpeechConfig;
use crate::error::{DubError, Result};

/// REST text-to-speech synthesizer returning encoded MP3 buffers.
pub struct RestSpeechSynthesizer {
    client: Client,
    config: SpeechConfig,
}

impl RestSpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    fn voice_for(&self, language: &str) -> &str {
        self.config
            .voices
            .get(language)
            .unwrap_or(&self.config.default_voice)
    }
}

#[async_trait]
impl SpeechProvider for RestSpeechSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        let voice = self.voice_for(language);
        let url = format!("{}/audio/speech", self.config.endpoint);

        debug!(
            "Synthesizing {} chars with voice {} for language {}",
            text.len(),
            voice,
            language
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "voice": voice,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| DubError::SynthesisFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubError::SynthesisFailed(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DubError::SynthesisFailed(format!("failed to read audio body: {}", e)))?;

        if bytes.is_empty() {
            return Err(DubError::SynthesisFailed(
                "provider returned an empty audio buffer".to_string(),
            ));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> SpeechConfig {
        SpeechConfig {
            endpoint: "http://tts.local".to_string(),
            api_key: "k".to_string(),
            model: "tts-1".to_string(),
            default_voice: "nova".to_string(),
            voices: HashMap::from([("en".to_string(), "alloy".to_string())]),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_voice_selection_prefers_language_override() {
        let synth = RestSpeechSynthesizer::new(config());
        assert_eq!(synth.voice_for("en"), "alloy");
        assert_eq!(synth.voice_for("fr"), "nova");
    }
}

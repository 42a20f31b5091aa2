use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::TranslationProvider;
use crate::config::TranslationConfig;
use crate::error::{DubError, Result};
use crate::lang;
use crate::subtitle::TimedBlock;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completion-backed translator, one request per subtitle block.
pub struct ChatTranslator {
    client: Client,
    config: TranslationConfig,
}

impl ChatTranslator {
    pub fn new(config: TranslationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    fn build_prompt(text: &str, language_name: &str) -> String {
        format!(
            "Translate the following subtitle text to {}. Maintain the same tone \
             and style, and ensure the translation fits the timing constraints:\n\n{}",
            language_name, text
        )
    }
}

#[async_trait]
impl TranslationProvider for ChatTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let language_name = lang::display_name(target_language)?;

        let request = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a professional subtitle translator. Provide only \
                                the translated text without any explanations or additional content."
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(text, language_name)
                }
            ],
            "temperature": 0.7
        });

        let url = format!("{}/chat/completions", self.config.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubError::Translation(format!("translation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubError::Translation(format!(
                "translation API error {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| DubError::Translation(format!("invalid translation response: {}", e)))?;

        let translated = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DubError::Translation("empty translation received".to_string()))?;

        Ok(translated.to_string())
    }
}

/// Map a block sequence through the translation capability.
///
/// Timing and sequence indices are preserved; only text changes. A failing
/// block either keeps its source text (`fallback_to_source`) or fails the
/// whole language with the block index attached.
pub async fn translate_blocks(
    provider: &dyn TranslationProvider,
    blocks: &[TimedBlock],
    target_language: &str,
    fallback_to_source: bool,
) -> Result<Vec<TimedBlock>> {
    info!(
        "Translating {} blocks to {}",
        blocks.len(),
        target_language
    );

    let mut translated = Vec::with_capacity(blocks.len());
    for block in blocks {
        match provider.translate(&block.text, target_language).await {
            Ok(text) => translated.push(block.with_text(text)),
            Err(e) if fallback_to_source => {
                warn!(
                    "Translation of block {} to {} failed, keeping source text: {}",
                    block.index, target_language, e
                );
                translated.push(block.clone());
            }
            Err(e) => {
                return Err(DubError::TranslationFailed {
                    block_index: block.index,
                    cause: e.to_string(),
                });
            }
        }
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockTranslator;

    fn blocks() -> Vec<TimedBlock> {
        vec![
            TimedBlock {
                index: 1,
                start_ms: 0,
                end_ms: 2000,
                text: "Hello".to_string(),
            },
            TimedBlock {
                index: 2,
                start_ms: 2500,
                end_ms: 4000,
                text: "World".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_translate_blocks_preserves_timing_and_count() {
        let provider = MockTranslator::uppercasing();
        let out = translate_blocks(&provider, &blocks(), "fr", false)
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start_ms, 0);
        assert_eq!(out[0].end_ms, 2000);
        assert_eq!(out[0].index, 1);
        assert_eq!(out[0].text, "HELLO [fr]");
        assert_eq!(out[1].text, "WORLD [fr]");
    }

    #[tokio::test]
    async fn test_failing_block_aborts_language() {
        let provider = MockTranslator::failing_on("World");
        let err = translate_blocks(&provider, &blocks(), "fr", false)
            .await
            .unwrap_err();

        match err {
            DubError::TranslationFailed { block_index, .. } => assert_eq!(block_index, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_keeps_source_text() {
        let provider = MockTranslator::failing_on("World");
        let out = translate_blocks(&provider, &blocks(), "fr", true)
            .await
            .unwrap();

        assert_eq!(out[0].text, "HELLO [fr]");
        assert_eq!(out[1].text, "World");
    }
}

//! Text-encoded fake media processor for tests.
//!
//! Fake "media files" are plain text: `AUDIO:<ms>` for an audio buffer,
//! `CONTAINER:v=1:a=<n>:s=<n>` for a muxed container. Durations flow
//! through tempo adjustment, silence, and concatenation the way real
//! encoded durations would, which is enough to exercise the reconciler,
//! assembler, and mux verification without ffmpeg.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::probe::{ProbeFormat, ProbeStream};
use super::{MediaCommand, MediaProcessor, ProbeReport};
use crate::error::{DubError, Result};

#[derive(Default)]
pub struct MockMedia {
    pub executed: Mutex<Vec<MediaCommand>>,
}

impl MockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    fn audio_stream(index: u32) -> ProbeStream {
        ProbeStream {
            index,
            codec_type: "audio".to_string(),
            codec_name: Some("mp3".to_string()),
            tags: HashMap::new(),
        }
    }

    async fn read_duration_ms(path: &Path) -> Result<u64> {
        let text = tokio::fs::read_to_string(path).await?;
        let value = text
            .trim()
            .strip_prefix("AUDIO:")
            .ok_or_else(|| DubError::Media(format!("not a fake audio file: {text:?}")))?;
        value
            .parse()
            .map_err(|_| DubError::Media(format!("bad fake duration: {value:?}")))
    }

    async fn write_duration_ms(path: &Path, ms: u64) -> Result<()> {
        tokio::fs::write(path, format!("AUDIO:{ms}")).await?;
        Ok(())
    }
}

#[async_trait]
impl MediaProcessor for MockMedia {
    async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> Result<()> {
        Self::write_duration_ms(audio_path, 60_000).await
    }

    async fn convert_subtitle(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn adjust_tempo(&self, input: &Path, output: &Path, factor: f64) -> Result<()> {
        let measured = Self::read_duration_ms(input).await?;
        let adjusted = (measured as f64 / factor).round() as u64;
        Self::write_duration_ms(output, adjusted).await
    }

    async fn generate_silence(&self, output: &Path, duration_ms: u64) -> Result<()> {
        Self::write_duration_ms(output, duration_ms).await
    }

    async fn concat_audio(&self, list_path: &Path, output: &Path) -> Result<()> {
        let list = tokio::fs::read_to_string(list_path).await?;
        let mut total = 0u64;
        for line in list.lines() {
            let path = line
                .trim()
                .strip_prefix("file '")
                .and_then(|l| l.strip_suffix('\''))
                .ok_or_else(|| DubError::Media(format!("bad concat list line: {line:?}")))?;
            total += Self::read_duration_ms(Path::new(path)).await?;
        }
        Self::write_duration_ms(output, total).await
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        let text = tokio::fs::read_to_string(path).await?;
        let text = text.trim();

        if let Some(ms) = text.strip_prefix("AUDIO:") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| DubError::Media(format!("bad fake duration: {text:?}")))?;
            return Ok(ProbeReport {
                streams: vec![Self::audio_stream(0)],
                format: Some(ProbeFormat {
                    duration: Some(format!("{:.6}", ms as f64 / 1000.0)),
                }),
            });
        }

        if let Some(spec) = text.strip_prefix("CONTAINER:") {
            let mut streams = Vec::new();
            let mut next_index = 0u32;
            for part in spec.split(':') {
                let (kind, count) = part
                    .split_once('=')
                    .ok_or_else(|| DubError::Media(format!("bad container spec: {spec:?}")))?;
                let codec_type = match kind {
                    "v" => "video",
                    "a" => "audio",
                    "s" => "subtitle",
                    _ => return Err(DubError::Media(format!("bad stream kind: {kind:?}"))),
                };
                let count: u32 = count
                    .parse()
                    .map_err(|_| DubError::Media(format!("bad stream count: {count:?}")))?;
                for _ in 0..count {
                    streams.push(ProbeStream {
                        index: next_index,
                        codec_type: codec_type.to_string(),
                        codec_name: None,
                        tags: HashMap::new(),
                    });
                    next_index += 1;
                }
            }
            return Ok(ProbeReport {
                streams,
                format: None,
            });
        }

        Err(DubError::Media(format!("unrecognized fake media: {text:?}")))
    }

    async fn execute(&self, command: MediaCommand) -> Result<()> {
        // A mux invocation fabricates a container whose stream counts
        // reflect the inputs that were mapped into it.
        if command.description.starts_with("Multiplex") {
            let mut subtitle_inputs = 0u32;
            let mut dub_inputs = 0u32;
            let mut args = command.args.iter().peekable();
            while let Some(arg) = args.next() {
                if arg == "-i" {
                    if let Some(input) = args.next() {
                        if input.ends_with(".srt") || input.ends_with(".vtt") {
                            subtitle_inputs += 1;
                        } else if input.ends_with(".mp3") {
                            dub_inputs += 1;
                        }
                    }
                }
            }
            let output = command
                .args
                .last()
                .ok_or_else(|| DubError::Media("mux command has no output".to_string()))?;
            tokio::fs::write(
                output,
                format!("CONTAINER:v=1:a={}:s={}", 1 + dub_inputs, subtitle_inputs),
            )
            .await?;
        }

        self.executed
            .lock()
            .expect("mock command log lock poisoned")
            .push(command);
        Ok(())
    }

    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

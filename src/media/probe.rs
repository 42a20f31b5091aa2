use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DubError, Result};

/// ffprobe `-print_format json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    pub codec_type: String,
    pub codec_name: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFormat {
    /// Container duration in seconds, as a decimal string
    pub duration: Option<String>,
}

impl ProbeReport {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DubError::Media(format!("Failed to parse probe output: {}", e)))
    }

    pub fn streams_of_type(&self, codec_type: &str) -> Vec<&ProbeStream> {
        self.streams
            .iter()
            .filter(|s| s.codec_type == codec_type)
            .collect()
    }

    pub fn audio_stream_count(&self) -> usize {
        self.streams_of_type("audio").len()
    }

    pub fn subtitle_stream_count(&self) -> usize {
        self.streams_of_type("subtitle").len()
    }

    /// Encoded duration of the probed file, in milliseconds.
    pub fn duration_ms(&self) -> Result<u64> {
        let raw = self
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .ok_or_else(|| DubError::Media("probe output has no duration".to_string()))?;

        let seconds: f64 = raw
            .parse()
            .map_err(|_| DubError::Media(format!("invalid probe duration: {raw:?}")))?;

        Ok((seconds * 1000.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac",
             "tags": {"language": "eng", "handler_name": "Original Audio"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "mov_text",
             "tags": {"language": "fra"}},
            {"index": 3, "codec_type": "audio", "codec_name": "aac",
             "tags": {"language": "fra"}}
        ],
        "format": {"duration": "3.041000"}
    }"#;

    #[test]
    fn test_parse_and_count_streams() {
        let report = ProbeReport::parse(SAMPLE).unwrap();
        assert_eq!(report.streams.len(), 4);
        assert_eq!(report.audio_stream_count(), 2);
        assert_eq!(report.subtitle_stream_count(), 1);
        assert_eq!(report.streams[1].tags.get("language").unwrap(), "eng");
    }

    #[test]
    fn test_duration_ms() {
        let report = ProbeReport::parse(SAMPLE).unwrap();
        assert_eq!(report.duration_ms().unwrap(), 3041);
    }

    #[test]
    fn test_missing_duration_is_error() {
        let report = ProbeReport::parse(r#"{"streams": []}"#).unwrap();
        assert!(report.duration_ms().is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{DubError, Result};

/// One timed caption unit: start/end in milliseconds plus the caption text.
///
/// Blocks are created by the parser and consumed read-only downstream;
/// translation produces a new block set with identical timing and indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedBlock {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl TimedBlock {
    /// Time allotted to this block on the original timeline.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Return a copy with the text replaced and timing untouched.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            index: self.index,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            text,
        }
    }
}

/// Timed-text interchange dialects. The two differ only in header and
/// millisecond separator punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    fn millis_separator(&self) -> char {
        match self {
            SubtitleFormat::Srt => ',',
            SubtitleFormat::Vtt => '.',
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "application/x-subrip",
            SubtitleFormat::Vtt => "text/vtt",
        }
    }

    /// Infer the dialect from a file extension.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("srt") => Ok(SubtitleFormat::Srt),
            Some("vtt") => Ok(SubtitleFormat::Vtt),
            other => Err(DubError::Config(format!(
                "unrecognized subtitle extension: {:?}",
                other.unwrap_or("none")
            ))),
        }
    }
}

/// Parse raw timed-text into an ordered block sequence.
///
/// Records are blank-line-delimited: an index line, a `start --> end`
/// timecode line, then one or more text lines. Index gaps and duplicates
/// are tolerated; serialization renumbers.
pub fn parse(raw: &str, format: SubtitleFormat) -> Result<Vec<TimedBlock>> {
    let normalized = raw.replace("\r\n", "\n");
    let mut body = normalized.trim_start_matches('\u{feff}').trim();

    if format == SubtitleFormat::Vtt {
        if let Some(rest) = body.strip_prefix("WEBVTT") {
            // Header line may carry trailing metadata up to the first blank line
            body = match rest.find("\n\n") {
                Some(pos) => &rest[pos..],
                None => "",
            };
        }
    }

    let mut blocks = Vec::new();
    for record in body.split("\n\n").map(str::trim).filter(|r| !r.is_empty()) {
        blocks.push(parse_record(record, format)?);
    }
    Ok(blocks)
}

fn parse_record(record: &str, format: SubtitleFormat) -> Result<TimedBlock> {
    let mut lines = record.lines();

    let index_line = lines
        .next()
        .ok_or_else(|| DubError::MalformedTimecode("empty record".to_string()))?;
    let index: usize = index_line.trim().parse().map_err(|_| {
        DubError::MalformedTimecode(format!("invalid block index: {index_line:?}"))
    })?;

    let timecode_line = lines
        .next()
        .ok_or_else(|| DubError::MalformedTimecode("record is missing a timecode line".to_string()))?;
    let (start_ms, end_ms) = parse_timecode_line(timecode_line, format)?;

    let text = lines.collect::<Vec<_>>().join("\n");
    if text.trim().is_empty() {
        return Err(DubError::MalformedTimecode(format!(
            "record {index} has no text lines"
        )));
    }

    Ok(TimedBlock {
        index,
        start_ms,
        end_ms,
        text: text.trim().to_string(),
    })
}

fn parse_timecode_line(line: &str, format: SubtitleFormat) -> Result<(u64, u64)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| DubError::MalformedTimecode(format!("missing '-->' separator: {line:?}")))?;

    Ok((
        parse_timestamp(start.trim(), format)?,
        parse_timestamp(end.trim(), format)?,
    ))
}

/// Parse `HH:MM:SS,mmm` (SRT) or `HH:MM:SS.mmm` (VTT) into milliseconds.
pub fn parse_timestamp(value: &str, format: SubtitleFormat) -> Result<u64> {
    let malformed = || DubError::MalformedTimecode(format!("invalid timestamp: {value:?}"));

    let (clock, millis) = value
        .rsplit_once(format.millis_separator())
        .ok_or_else(malformed)?;

    let mut clock_parts = clock.split(':').rev();
    let seconds: u64 = clock_parts
        .next()
        .ok_or_else(malformed)?
        .parse()
        .map_err(|_| malformed())?;
    let minutes: u64 = clock_parts
        .next()
        .ok_or_else(malformed)?
        .parse()
        .map_err(|_| malformed())?;
    let hours: u64 = match clock_parts.next() {
        Some(h) => h.parse().map_err(|_| malformed())?,
        None => 0,
    };
    let millis: u64 = millis.parse().map_err(|_| malformed())?;
    if millis > 999 {
        return Err(malformed());
    }

    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}

/// Format milliseconds into the dialect's timestamp notation.
pub fn format_timestamp(total_ms: u64, format: SubtitleFormat) -> String {
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours,
        minutes,
        seconds,
        format.millis_separator(),
        millis
    )
}

/// Serialize blocks back to timed text.
///
/// Output always carries 1-based contiguous indices regardless of the
/// indices on the input blocks.
pub fn serialize(blocks: &[TimedBlock], format: SubtitleFormat) -> String {
    let mut out = String::new();

    if format == SubtitleFormat::Vtt {
        out.push_str("WEBVTT\n\n");
    }

    for (position, block) in blocks.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            position + 1,
            format_timestamp(block.start_ms, format),
            format_timestamp(block.end_ms, format),
            block.text.trim()
        ));
    }

    out
}

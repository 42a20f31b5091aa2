use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DubError, Result};
use crate::media::MediaProcessor;
use crate::reconcile::AudioSegment;
use crate::scope::PipelineScope;
use crate::subtitle::{self, SubtitleFormat, TimedBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Subtitle,
}

/// One finished, timeline-aligned stream ready for multiplexing.
#[derive(Debug, Clone)]
pub struct Track {
    pub language: String,
    pub kind: TrackKind,
    pub path: PathBuf,
}

/// Silence plan for a segment sequence, computed against the rendered
/// timeline rather than the block timings alone: the cursor advances by
/// each segment's rendered duration, so a segment whose audio came up
/// shorter than its slot is followed by enough silence to keep the next
/// segment on its original start time.
///
/// Index i is the silence before segment i (index 0 covers the span from
/// timeline zero to the first block's start); the final extra entry pads
/// the last segment's slot. Overflowing segments yield a zero gap.
pub fn silence_gaps(segments: &[AudioSegment]) -> Vec<u64> {
    let mut gaps = Vec::with_capacity(segments.len() + 1);
    let mut cursor = 0u64;
    for segment in segments {
        gaps.push(segment.block.start_ms.saturating_sub(cursor));
        cursor = cursor.max(segment.block.start_ms) + segment.rendered_ms;
    }
    let end = segments.last().map(|s| s.block.end_ms).unwrap_or(0);
    gaps.push(end.saturating_sub(cursor));
    gaps
}

/// Concat demuxer list file content for the given segment paths.
pub fn concat_manifest(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect()
}

/// Concatenates reconciled segments into one continuous audio track per
/// language and renders the matching subtitle track.
pub struct TrackAssembler {
    media: Arc<dyn MediaProcessor>,
}

impl TrackAssembler {
    pub fn new(media: Arc<dyn MediaProcessor>) -> Self {
        Self { media }
    }

    /// Build the continuous dub track: silence for the leading span, every
    /// inter-segment gap, and the remainder of any slot whose rendered
    /// audio came up short, segments stream-copied in between.
    pub async fn assemble_audio(
        &self,
        segments: &[AudioSegment],
        language: &str,
        scope: &PipelineScope,
    ) -> Result<Track> {
        if segments.is_empty() {
            return Err(DubError::ConcatenationFailed {
                language: language.to_string(),
                cause: "no segments to assemble".to_string(),
            });
        }

        info!(
            "Assembling {} segments into dub track for {}",
            segments.len(),
            language
        );

        let gaps = silence_gaps(segments);

        let mut parts = Vec::with_capacity(segments.len() * 2 + 1);
        for (segment, gap_ms) in segments.iter().zip(&gaps) {
            if *gap_ms > 0 {
                let silence = scope.allocate(&format!("gap_{}_{}", language, segment.block.index), "mp3");
                self.media
                    .generate_silence(&silence, *gap_ms)
                    .await
                    .map_err(|e| DubError::ConcatenationFailed {
                        language: language.to_string(),
                        cause: e.to_string(),
                    })?;
                debug!("Inserted {}ms silence before block {}", gap_ms, segment.block.index);
                parts.push(silence);
            }
            parts.push(segment.path.clone());
        }

        let trailing_ms = gaps[segments.len()];
        if trailing_ms > 0 {
            let silence = scope.allocate(&format!("tail_{}", language), "mp3");
            self.media
                .generate_silence(&silence, trailing_ms)
                .await
                .map_err(|e| DubError::ConcatenationFailed {
                    language: language.to_string(),
                    cause: e.to_string(),
                })?;
            debug!("Inserted {}ms trailing silence", trailing_ms);
            parts.push(silence);
        }

        let list_path = scope.allocate(&format!("concat_{}", language), "txt");
        tokio::fs::write(&list_path, concat_manifest(&parts)).await?;

        let track_path = scope.allocate(&format!("dub_{}", language), "mp3");
        self.media
            .concat_audio(&list_path, &track_path)
            .await
            .map_err(|e| DubError::ConcatenationFailed {
                language: language.to_string(),
                cause: e.to_string(),
            })?;

        Ok(Track {
            language: language.to_string(),
            kind: TrackKind::Audio,
            path: track_path,
        })
    }

    /// Serialize the translated block set into a subtitle track. Derived
    /// from the blocks directly, never from audio timing.
    pub async fn subtitle_track(
        &self,
        blocks: &[TimedBlock],
        language: &str,
        format: SubtitleFormat,
        scope: &PipelineScope,
    ) -> Result<Track> {
        let rendered = subtitle::serialize(blocks, format);
        let path = scope
            .write_artifact(
                &format!("sub_{}", language),
                format.extension(),
                rendered.as_bytes(),
            )
            .await?;

        Ok(Track {
            language: language.to_string(),
            kind: TrackKind::Subtitle,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::mock::MockMedia;
    use crate::providers::mock::MockSpeech;
    use crate::providers::SpeechProvider;
    use crate::reconcile::Reconciler;

    fn block(index: usize, start_ms: u64, end_ms: u64, text: &str) -> TimedBlock {
        TimedBlock {
            index,
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }

    fn segment(index: usize, start_ms: u64, end_ms: u64, rendered_ms: u64) -> AudioSegment {
        AudioSegment {
            block: block(index, start_ms, end_ms, "x"),
            path: PathBuf::new(),
            measured_ms: rendered_ms,
            target_ms: end_ms - start_ms,
            rendered_ms,
            tempo: 1.0,
            overflow_ms: 0,
        }
    }

    #[test]
    fn test_silence_gaps_between_full_slots() {
        let gaps = silence_gaps(&[segment(1, 0, 2000, 2000), segment(2, 2500, 4000, 1500)]);
        assert_eq!(gaps, vec![0, 500, 0]);
    }

    #[test]
    fn test_leading_silence() {
        assert_eq!(silence_gaps(&[segment(1, 1200, 2000, 800)]), vec![1200, 0]);
    }

    #[test]
    fn test_short_segment_padded_to_keep_next_on_schedule() {
        // 800ms of audio in a 2000ms slot: the slack plus the 500ms block
        // gap must land before the second segment
        let gaps = silence_gaps(&[segment(1, 0, 2000, 800), segment(2, 2500, 4000, 1500)]);
        assert_eq!(gaps, vec![0, 1700, 0]);
    }

    #[test]
    fn test_short_final_segment_gets_trailing_pad() {
        assert_eq!(silence_gaps(&[segment(1, 0, 2000, 800)]), vec![0, 1200]);
    }

    #[test]
    fn test_overflowing_segment_clamps_next_gap_to_zero() {
        let gaps = silence_gaps(&[segment(1, 0, 2000, 2400), segment(2, 1900, 3000, 1100)]);
        assert_eq!(gaps, vec![0, 0, 0]);
    }

    #[test]
    fn test_concat_manifest_format() {
        let manifest = concat_manifest(&[PathBuf::from("/t/a.mp3"), PathBuf::from("/t/b.mp3")]);
        assert_eq!(manifest, "file '/t/a.mp3'\nfile '/t/b.mp3'\n");
    }

    #[tokio::test]
    async fn test_assembled_track_duration_includes_silence() {
        let media = Arc::new(MockMedia::new());
        let scope = Arc::new(PipelineScope::open().unwrap());

        // Both segments fit naturally: 2000ms and 1500ms of audio
        let speech = Arc::new(
            MockSpeech::with_default_duration(0)
                .duration_for("a", 2000)
                .duration_for("b", 1500),
        );
        let reconciler = Reconciler::new(speech, Arc::clone(&media) as _, 2);
        let segments = reconciler
            .reconcile(
                &[block(1, 0, 2000, "a"), block(2, 2500, 4000, "b")],
                "fr",
                Arc::clone(&scope),
            )
            .await
            .unwrap();

        let assembler = TrackAssembler::new(Arc::clone(&media) as _);
        let track = assembler
            .assemble_audio(&segments, "fr", &scope)
            .await
            .unwrap();

        assert_eq!(track.kind, TrackKind::Audio);
        // 2000 + 500 gap + 1500
        let total = media
            .probe(&track.path)
            .await
            .unwrap()
            .duration_ms()
            .unwrap();
        assert_eq!(total, 4000);
        Arc::try_unwrap(scope).ok().unwrap().close();
    }

    #[tokio::test]
    async fn test_short_segments_assemble_to_full_slot_length() {
        let media = Arc::new(MockMedia::new());
        let scope = Arc::new(PipelineScope::open().unwrap());

        // 800ms of audio in a 0..2000 slot, 1500ms in a 2500..4000 slot:
        // slack after the first segment and the inter-block gap must both
        // become silence so the track spans the whole timeline
        let speech = Arc::new(
            MockSpeech::with_default_duration(0)
                .duration_for("a", 800)
                .duration_for("b", 1500),
        );
        let reconciler = Reconciler::new(speech, Arc::clone(&media) as _, 2);
        let segments = reconciler
            .reconcile(
                &[block(1, 0, 2000, "a"), block(2, 2500, 4000, "b")],
                "fr",
                Arc::clone(&scope),
            )
            .await
            .unwrap();

        let assembler = TrackAssembler::new(Arc::clone(&media) as _);
        let track = assembler
            .assemble_audio(&segments, "fr", &scope)
            .await
            .unwrap();

        // 800 + 1700 silence + 1500, second segment starting at 2500
        let total = media
            .probe(&track.path)
            .await
            .unwrap()
            .duration_ms()
            .unwrap();
        assert_eq!(total, 4000);
        Arc::try_unwrap(scope).ok().unwrap().close();
    }

    #[tokio::test]
    async fn test_empty_segment_list_is_concatenation_failure() {
        let media = Arc::new(MockMedia::new());
        let scope = PipelineScope::open().unwrap();
        let assembler = TrackAssembler::new(media);

        let err = assembler
            .assemble_audio(&[], "fr", &scope)
            .await
            .unwrap_err();
        assert!(matches!(err, DubError::ConcatenationFailed { .. }));
        scope.close();
    }

    #[tokio::test]
    async fn test_subtitle_track_round_trips() {
        let media = Arc::new(MockMedia::new());
        let scope = PipelineScope::open().unwrap();
        let assembler = TrackAssembler::new(media);

        let blocks = vec![block(1, 0, 2000, "Bonjour"), block(2, 2500, 4000, "Le monde")];
        let track = assembler
            .subtitle_track(&blocks, "fr", SubtitleFormat::Srt, &scope)
            .await
            .unwrap();

        assert_eq!(track.kind, TrackKind::Subtitle);
        let rendered = tokio::fs::read_to_string(&track.path).await.unwrap();
        let reparsed = subtitle::parse(&rendered, SubtitleFormat::Srt).unwrap();
        assert_eq!(reparsed, blocks);
        scope.close();
    }

    // MockSpeech must stay in sync with what reconciliation feeds the
    // assembler in these tests
    #[tokio::test]
    async fn test_mock_speech_encodes_duration() {
        let speech = MockSpeech::with_default_duration(700);
        let bytes = speech.synthesize("anything", "fr").await.unwrap();
        assert_eq!(bytes, b"AUDIO:700");
    }
}

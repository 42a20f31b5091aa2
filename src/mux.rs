use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{DubError, Result};
use crate::lang;
use crate::media::{MediaCommand, MediaProcessor, ProbeReport};
use crate::track::{Track, TrackKind};

/// Combines the source container, every subtitle track, and every dub
/// track into one deliverable in a single ffmpeg invocation, then verifies
/// the result by probing its stream list. Verification failure is fatal
/// for the whole run; nothing partial is ever published.
pub struct MuxOrchestrator {
    media: Arc<dyn MediaProcessor>,
    ffmpeg_path: String,
}

impl MuxOrchestrator {
    pub fn new(media: Arc<dyn MediaProcessor>, ffmpeg_path: impl Into<String>) -> Self {
        Self {
            media,
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub async fn mux(
        &self,
        video: &Path,
        subtitle_tracks: &[Track],
        audio_tracks: &[Track],
        source_language: &str,
        output: &Path,
    ) -> Result<()> {
        info!(
            "Muxing {} subtitle and {} dub tracks into {}",
            subtitle_tracks.len(),
            audio_tracks.len(),
            output.display()
        );

        let command = build_mux_command(
            &self.ffmpeg_path,
            video,
            subtitle_tracks,
            audio_tracks,
            source_language,
            output,
        )?;
        self.media.execute(command).await?;

        let report = self.media.probe(output).await?;
        verify_stream_layout(&report, subtitle_tracks.len(), audio_tracks.len())?;

        info!("Mux verified: {} streams total", report.streams.len());
        Ok(())
    }
}

/// Assemble the single mux invocation: original video and audio mapped
/// first, then subtitle streams (stream 0 default-enabled), then dub audio
/// streams; video stream-copied, all audio re-encoded to AAC for container
/// compatibility, faststart set for progressive playback.
pub fn build_mux_command(
    ffmpeg_path: &str,
    video: &Path,
    subtitle_tracks: &[Track],
    audio_tracks: &[Track],
    source_language: &str,
    output: &Path,
) -> Result<MediaCommand> {
    for track in subtitle_tracks {
        debug_assert_eq!(track.kind, TrackKind::Subtitle);
    }
    for track in audio_tracks {
        debug_assert_eq!(track.kind, TrackKind::Audio);
    }

    let mut command = MediaCommand::new(ffmpeg_path, "Multiplex").input(video);
    for track in subtitle_tracks {
        command = command.input(&track.path);
    }
    for track in audio_tracks {
        command = command.input(&track.path);
    }

    command = command.map("0:v").map("0:a");
    for input_index in 1..=subtitle_tracks.len() + audio_tracks.len() {
        command = command.map(input_index.to_string());
    }

    // Original audio metadata
    command = command
        .stream_metadata(
            "s:a:0",
            format!("language={}", lang::iso639_2(source_language)?),
        )
        .stream_metadata("s:a:0", "handler_name=Original Audio");

    for (i, track) in subtitle_tracks.iter().enumerate() {
        let disposition = if i == 0 { "default" } else { "0" };
        command = command
            .disposition(format!("s:{i}"), disposition)
            .stream_metadata(
                format!("s:s:{i}"),
                format!("language={}", lang::iso639_2(&track.language)?),
            )
            .stream_metadata(
                format!("s:s:{i}"),
                format!("handler_name={} Subtitles", lang::display_name(&track.language)?),
            );
    }

    for (i, track) in audio_tracks.iter().enumerate() {
        let stream = i + 1; // stream 0 is the original audio
        command = command
            .stream_metadata(
                format!("s:a:{stream}"),
                format!("language={}", lang::iso639_2(&track.language)?),
            )
            .stream_metadata(
                format!("s:a:{stream}"),
                format!("handler_name={} Audio", lang::display_name(&track.language)?),
            );
    }

    Ok(command
        .copy_video()
        .audio_codec("aac")
        .subtitle_codec("mov_text")
        .faststart()
        .overwrite()
        .output(output))
}

/// Confirm the muxed container carries exactly the requested streams:
/// one video, the original audio plus one per dub track, and one subtitle
/// stream per subtitle track.
pub fn verify_stream_layout(
    report: &ProbeReport,
    expected_subtitles: usize,
    expected_dubs: usize,
) -> Result<()> {
    let video = report.streams_of_type("video").len();
    let audio = report.audio_stream_count();
    let subtitles = report.subtitle_stream_count();

    if video < 1 {
        return Err(DubError::MuxVerificationFailed(
            "output container has no video stream".to_string(),
        ));
    }
    if subtitles != expected_subtitles {
        return Err(DubError::MuxVerificationFailed(format!(
            "expected {} subtitle streams, found {}",
            expected_subtitles, subtitles
        )));
    }
    if audio != expected_dubs + 1 {
        return Err(DubError::MuxVerificationFailed(format!(
            "expected {} audio streams (original + {} dubs), found {}",
            expected_dubs + 1,
            expected_dubs,
            audio
        )));
    }

    Ok(())
}

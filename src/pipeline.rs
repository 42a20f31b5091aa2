use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{DubError, Result};
use crate::lang;
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::mux::MuxOrchestrator;
use crate::providers::{
    translate_blocks, ProviderFactory, SpeechProvider, TranscriptionProvider, TranslationProvider,
};
use crate::reconcile::Reconciler;
use crate::scope::PipelineScope;
use crate::storage::{ArtifactRecord, ObjectStorage, RecordSink};
use crate::subtitle::{self, SubtitleFormat, TimedBlock};
use crate::track::{Track, TrackAssembler};

/// Where the source video comes from.
#[derive(Debug, Clone)]
pub enum SourceRef {
    Url(String),
    File(PathBuf),
}

/// One language that could not be delivered, with the first fatal cause.
#[derive(Debug)]
pub struct LanguageFailure {
    pub language: String,
    pub cause: String,
}

/// Outcome of one end-to-end dubbing run. Partial successes are reported,
/// never silently dropped.
#[derive(Debug)]
pub struct DubReport {
    /// Public URL of the published container
    pub output_url: String,
    /// Languages whose subtitle and dub tracks made it into the container
    pub included_languages: Vec<String>,
    pub failed_languages: Vec<LanguageFailure>,
}

/// Per-language result of the translate → reconcile → assemble stage.
struct LanguageTracks {
    language: String,
    subtitle: Track,
    audio: Track,
    rendered_srt: String,
}

/// End-to-end dubbing pipeline.
///
/// All external-service handles are passed in explicitly; there is no
/// process-wide client state.
pub struct Pipeline {
    config: Config,
    transcriber: Arc<dyn TranscriptionProvider>,
    translator: Arc<dyn TranslationProvider>,
    speech: Arc<dyn SpeechProvider>,
    media: Arc<dyn MediaProcessor>,
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn RecordSink>,
    http: reqwest::Client,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        transcriber: Arc<dyn TranscriptionProvider>,
        translator: Arc<dyn TranslationProvider>,
        speech: Arc<dyn SpeechProvider>,
        media: Arc<dyn MediaProcessor>,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordSink>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.pipeline.download_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self {
            config,
            transcriber,
            translator,
            speech,
            media,
            storage,
            records,
            http,
        }
    }

    /// Wire the real provider and media implementations from configuration.
    pub fn from_config(
        config: Config,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordSink>,
    ) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        media.check_availability()?;

        Ok(Self::new(
            config.clone(),
            ProviderFactory::create_transcriber(config.transcription.clone()),
            ProviderFactory::create_translator(config.translation.clone()),
            ProviderFactory::create_speech(config.speech.clone()),
            media,
            storage,
            records,
        ))
    }

    /// Run the full pipeline for one source video.
    pub async fn dub(&self, source: SourceRef, target_languages: &[String]) -> Result<DubReport> {
        lang::validate_languages(target_languages)?;
        if target_languages.is_empty() {
            return Err(DubError::Config(
                "at least one target language is required".to_string(),
            ));
        }

        let scope = Arc::new(PipelineScope::open()?);
        let result = self.run(Arc::clone(&scope), source, target_languages).await;

        match Arc::try_unwrap(scope) {
            Ok(scope) => scope.close(),
            Err(_) => warn!("pipeline scope still referenced at close"),
        }

        result
    }

    async fn run(
        &self,
        scope: Arc<PipelineScope>,
        source: SourceRef,
        target_languages: &[String],
    ) -> Result<DubReport> {
        // Source acquisition
        let video_path = self.acquire_source(&source, &scope).await?;

        // Audio extraction for the transcription provider
        let audio_path = scope.allocate("source_audio", "mp3");
        self.media.extract_audio(&video_path, &audio_path).await?;

        // Source-language transcript
        let transcript_srt = self.transcriber.transcribe_file(&audio_path).await?;
        let source_blocks = subtitle::parse(&transcript_srt, SubtitleFormat::Srt)?;
        if source_blocks.is_empty() {
            return Err(DubError::Transcription(
                "transcript contains no timed blocks".to_string(),
            ));
        }
        info!("Transcription produced {} blocks", source_blocks.len());

        // Per-language fan-out: translate → reconcile → assemble. One
        // failing language never cancels the others.
        let (tracks, failures) = self
            .run_language_stages(&scope, &source_blocks, target_languages)
            .await;

        if tracks.is_empty() {
            let first = failures
                .into_iter()
                .next()
                .map(|f| f.cause)
                .unwrap_or_else(|| "no languages requested".to_string());
            return Err(DubError::Translation(format!(
                "all target languages failed; first cause: {first}"
            )));
        }

        // All-or-nothing mux over whatever languages succeeded
        let subtitle_tracks: Vec<Track> = tracks.iter().map(|t| t.subtitle.clone()).collect();
        let audio_tracks: Vec<Track> = tracks.iter().map(|t| t.audio.clone()).collect();

        let output_path = scope.allocate("deliverable", "mp4");
        let orchestrator =
            MuxOrchestrator::new(Arc::clone(&self.media), self.config.media.ffmpeg_path.clone());
        orchestrator
            .mux(
                &video_path,
                &subtitle_tracks,
                &audio_tracks,
                &self.config.pipeline.source_language,
                &output_path,
            )
            .await?;

        // Publish and emit records
        let output_url = self
            .publish(&output_path, &transcript_srt, &tracks)
            .await?;

        let report = DubReport {
            output_url,
            included_languages: tracks.iter().map(|t| t.language.clone()).collect(),
            failed_languages: failures,
        };

        info!(
            "Dub run completed: {} languages included, {} failed",
            report.included_languages.len(),
            report.failed_languages.len()
        );
        Ok(report)
    }

    async fn acquire_source(&self, source: &SourceRef, scope: &PipelineScope) -> Result<PathBuf> {
        match source {
            SourceRef::Url(url) => {
                info!("Downloading source video from {}", url);
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(DubError::Http)?;
                let bytes = response.bytes().await?;
                scope.write_artifact("source", "mp4", &bytes).await
            }
            SourceRef::File(path) => {
                if !path.exists() {
                    return Err(DubError::FileNotFound(path.display().to_string()));
                }
                let local = scope.allocate("source", "mp4");
                tokio::fs::copy(path, &local).await?;
                Ok(local)
            }
        }
    }

    async fn run_language_stages(
        &self,
        scope: &Arc<PipelineScope>,
        source_blocks: &[TimedBlock],
        target_languages: &[String],
    ) -> (Vec<LanguageTracks>, Vec<LanguageFailure>) {
        let mut tasks: JoinSet<std::result::Result<(usize, LanguageTracks), (usize, String, DubError)>> =
            JoinSet::new();

        for (position, language) in target_languages.iter().enumerate() {
            let language = language.clone();
            let blocks = source_blocks.to_vec();
            let scope = Arc::clone(scope);
            let translator = Arc::clone(&self.translator);
            let speech = Arc::clone(&self.speech);
            let media = Arc::clone(&self.media);
            let fallback = self.config.translation.fallback_to_source;
            let synthesis_concurrency = self.config.pipeline.synthesis_concurrency;

            tasks.spawn(async move {
                let result = language_stage(
                    &language,
                    &blocks,
                    scope,
                    translator,
                    speech,
                    media,
                    fallback,
                    synthesis_concurrency,
                )
                .await;
                match result {
                    Ok(tracks) => Ok((position, tracks)),
                    Err(e) => Err((position, language, e)),
                }
            });
        }

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((position, tracks))) => successes.push((position, tracks)),
                Ok(Err((position, language, e))) => {
                    warn!("Language {} failed: {}", language, e);
                    failures.push((position, LanguageFailure {
                        language,
                        cause: e.to_string(),
                    }));
                }
                Err(e) => {
                    warn!("Language task panicked: {}", e);
                }
            }
        }

        // Report in requested-language order, not completion order
        successes.sort_by_key(|(position, _)| *position);
        failures.sort_by_key(|(position, _)| *position);

        (
            successes.into_iter().map(|(_, t)| t).collect(),
            failures.into_iter().map(|(_, f)| f).collect(),
        )
    }

    async fn publish(
        &self,
        output_path: &Path,
        transcript_srt: &str,
        tracks: &[LanguageTracks],
    ) -> Result<String> {
        let stamp = chrono::Utc::now().timestamp_millis();

        let container = tokio::fs::read(output_path).await?;
        let output_url = self
            .storage
            .upload(&format!("video/{stamp}.mp4"), &container, "video/mp4")
            .await?;
        self.records
            .create_record(ArtifactRecord::media(output_url.clone()))
            .await?;

        // Source-language transcript is published alongside the container
        let source_language = &self.config.pipeline.source_language;
        let transcript_url = self
            .storage
            .upload(
                &format!("subtitles/{stamp}_{source_language}.srt"),
                transcript_srt.as_bytes(),
                SubtitleFormat::Srt.mime_type(),
            )
            .await?;
        self.records
            .create_record(ArtifactRecord::subtitle(
                source_language,
                transcript_url,
                &output_url,
            ))
            .await?;

        for track in tracks {
            let subtitle_url = self
                .storage
                .upload(
                    &format!("subtitles/{stamp}_{}.srt", track.language),
                    track.rendered_srt.as_bytes(),
                    SubtitleFormat::Srt.mime_type(),
                )
                .await?;
            self.records
                .create_record(ArtifactRecord::subtitle(
                    &track.language,
                    subtitle_url,
                    &output_url,
                ))
                .await?;

            let dub_bytes = tokio::fs::read(&track.audio.path).await?;
            let dub_url = self
                .storage
                .upload(
                    &format!("audio/{stamp}_{}_audio.mp3", track.language),
                    &dub_bytes,
                    "audio/mpeg",
                )
                .await?;
            self.records
                .create_record(ArtifactRecord::audio_track(
                    &track.language,
                    dub_url,
                    &output_url,
                ))
                .await?;
        }

        Ok(output_url)
    }

    /// Process every video file found under a directory.
    pub async fn dub_directory(
        &self,
        input_dir: &Path,
        target_languages: &[String],
    ) -> Result<Vec<DubReport>> {
        if !input_dir.is_dir() {
            return Err(DubError::Config(
                "input path is not a directory".to_string(),
            ));
        }

        let video_extensions = ["mp4", "avi", "mov", "mkv", "webm"];
        let mut video_files = Vec::new();
        for entry in walkdir::WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                if video_extensions.contains(&ext.to_lowercase().as_str()) {
                    video_files.push(entry.path().to_path_buf());
                }
            }
        }

        info!("Found {} video files to process", video_files.len());

        let mut reports = Vec::new();
        for video_path in video_files {
            match self
                .dub(SourceRef::File(video_path.clone()), target_languages)
                .await
            {
                Ok(report) => {
                    info!("Successfully processed: {}", video_path.display());
                    reports.push(report);
                }
                Err(e) => warn!("Failed to process {}: {}", video_path.display(), e),
            }
        }

        Ok(reports)
    }
}

/// The per-language stage: translate, reconcile segment durations,
/// assemble the dub and subtitle tracks.
#[allow(clippy::too_many_arguments)]
async fn language_stage(
    language: &str,
    source_blocks: &[TimedBlock],
    scope: Arc<PipelineScope>,
    translator: Arc<dyn TranslationProvider>,
    speech: Arc<dyn SpeechProvider>,
    media: Arc<dyn MediaProcessor>,
    fallback_to_source: bool,
    synthesis_concurrency: usize,
) -> Result<LanguageTracks> {
    info!("Starting language stage for {}", language);

    let translated =
        translate_blocks(translator.as_ref(), source_blocks, language, fallback_to_source).await?;

    let reconciler = Reconciler::new(speech, Arc::clone(&media), synthesis_concurrency);
    let segments = reconciler
        .reconcile(&translated, language, Arc::clone(&scope))
        .await?;

    let assembler = TrackAssembler::new(media);
    let audio = assembler.assemble_audio(&segments, language, &scope).await?;
    let subtitle = assembler
        .subtitle_track(&translated, language, SubtitleFormat::Srt, &scope)
        .await?;
    let rendered_srt = subtitle::serialize(&translated, SubtitleFormat::Srt);

    info!("Language stage completed for {}", language);
    Ok(LanguageTracks {
        language: language.to_string(),
        subtitle,
        audio,
        rendered_srt,
    })
}

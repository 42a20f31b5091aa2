use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{DubError, Result};
use crate::media::MediaProcessor;
use crate::providers::SpeechProvider;
use crate::scope::PipelineScope;
use crate::subtitle::TimedBlock;

/// Practical limit of a single-pass atempo filter without audible pitch
/// distortion.
pub const MAX_SPEED: f64 = 2.0;

/// Tempo decision for one synthesized segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPlan {
    /// Playback-speed multiplier, always within `[1.0, MAX_SPEED]`
    pub factor: f64,
    /// Milliseconds the sped-up segment still overruns its slot
    pub overflow_ms: u64,
}

/// Decide how to fit a synthesized duration into its original time slot.
///
/// Audio is only ever sped up, never slowed down: a translation shorter
/// than its slot plays at natural speed and trailing silence pads the
/// remainder. Beyond `MAX_SPEED` the segment is sped up by `MAX_SPEED`
/// only and allowed to overflow into the next block's start.
pub fn plan_tempo(measured_ms: u64, target_ms: u64) -> TempoPlan {
    if measured_ms <= target_ms {
        return TempoPlan {
            factor: 1.0,
            overflow_ms: 0,
        };
    }

    let ratio = if target_ms == 0 {
        f64::INFINITY
    } else {
        measured_ms as f64 / target_ms as f64
    };

    if ratio <= MAX_SPEED {
        TempoPlan {
            factor: ratio,
            overflow_ms: 0,
        }
    } else {
        let best_effort_ms = (measured_ms as f64 / MAX_SPEED).round() as u64;
        TempoPlan {
            factor: MAX_SPEED,
            overflow_ms: best_effort_ms.saturating_sub(target_ms),
        }
    }
}

/// One reconciled per-block audio buffer, ready for assembly.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub block: TimedBlock,
    /// Final per-segment buffer on disk (tempo already applied)
    pub path: PathBuf,
    pub measured_ms: u64,
    pub target_ms: u64,
    /// Duration of the buffer at `path`, after any tempo adjustment. The
    /// assembler advances its timeline cursor by this amount.
    pub rendered_ms: u64,
    pub tempo: f64,
    pub overflow_ms: u64,
}

/// Synthesizes each translated block and reconciles its duration against
/// the original timing window.
///
/// Block-level synthesis runs concurrently under a bounded permit pool,
/// but the returned segments are always in sequence-index order, never
/// completion order.
pub struct Reconciler {
    speech: Arc<dyn SpeechProvider>,
    media: Arc<dyn MediaProcessor>,
    synthesis_concurrency: usize,
}

impl Reconciler {
    pub fn new(
        speech: Arc<dyn SpeechProvider>,
        media: Arc<dyn MediaProcessor>,
        synthesis_concurrency: usize,
    ) -> Self {
        Self {
            speech,
            media,
            synthesis_concurrency: synthesis_concurrency.max(1),
        }
    }

    pub async fn reconcile(
        &self,
        blocks: &[TimedBlock],
        language: &str,
        scope: Arc<PipelineScope>,
    ) -> Result<Vec<AudioSegment>> {
        info!(
            "Reconciling {} segments for language {}",
            blocks.len(),
            language
        );

        let permits = Arc::new(Semaphore::new(self.synthesis_concurrency));
        let mut tasks: JoinSet<Result<AudioSegment>> = JoinSet::new();

        for block in blocks.iter().cloned() {
            let speech = Arc::clone(&self.speech);
            let media = Arc::clone(&self.media);
            let scope = Arc::clone(&scope);
            let permits = Arc::clone(&permits);
            let language = language.to_string();

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| DubError::SynthesisFailed("permit pool closed".to_string()))?;
                reconcile_block(block, &language, speech, media, scope).await
            });
        }

        let mut segments = Vec::with_capacity(blocks.len());
        while let Some(joined) = tasks.join_next().await {
            let segment = joined
                .map_err(|e| DubError::SynthesisFailed(format!("synthesis task panicked: {e}")))??;
            segments.push(segment);
        }

        // Completion order is arbitrary; assembly order is by sequence index
        segments.sort_by_key(|s| s.block.index);
        Ok(segments)
    }
}

async fn reconcile_block(
    block: TimedBlock,
    language: &str,
    speech: Arc<dyn SpeechProvider>,
    media: Arc<dyn MediaProcessor>,
    scope: Arc<PipelineScope>,
) -> Result<AudioSegment> {
    let raw_audio = speech.synthesize(&block.text, language).await?;
    let raw_path = scope
        .write_artifact(&format!("seg_{}_{}", language, block.index), "mp3", &raw_audio)
        .await?;

    let measured_ms = media.probe(&raw_path).await?.duration_ms()?;
    let target_ms = block.duration_ms();
    let plan = plan_tempo(measured_ms, target_ms);

    debug!(
        "Block {} ({}): measured {}ms, target {}ms, tempo {:.3}",
        block.index, language, measured_ms, target_ms, plan.factor
    );

    if plan.overflow_ms > 0 {
        warn!(
            "Duration overflow on block {} ({}): segment overruns its slot by {}ms even at x{}",
            block.index, language, plan.overflow_ms, MAX_SPEED
        );
    }

    let (path, rendered_ms) = if plan.factor > 1.0 + f64::EPSILON {
        let adjusted = scope.allocate(&format!("seg_{}_{}_fit", language, block.index), "mp3");
        media.adjust_tempo(&raw_path, &adjusted, plan.factor).await?;
        let rendered_ms = media.probe(&adjusted).await?.duration_ms()?;
        (adjusted, rendered_ms)
    } else {
        (raw_path, measured_ms)
    };

    Ok(AudioSegment {
        block,
        path,
        measured_ms,
        target_ms,
        rendered_ms,
        tempo: plan.factor,
        overflow_ms: plan.overflow_ms,
    })
}

use std::sync::Arc;

use tracing::info;

use crate::clip::{validate_gaps, AudioClip, CompositionResult, ContainerFormat};
use crate::config::ComposerConfig;
use crate::error::CompositionError;
use crate::services::decode_service::{PcmDecoder, SymphoniaDecoder};
use crate::services::mix_pipeline::{render, RenderLimits};
use crate::utils::concatenate::concatenate;
use crate::utils::silence::create_silence;

/// Entry point of the engine: picks byte-level concatenation or the PCM mix
/// for each call. Holds no state between calls.
#[derive(Clone)]
pub struct Composer {
    decoder: Arc<dyn PcmDecoder>,
    config: ComposerConfig,
}

impl Composer {
    pub fn new(decoder: Arc<dyn PcmDecoder>, config: ComposerConfig) -> Self {
        Self { decoder, config }
    }

    /// Symphonia decoding with default limits.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SymphoniaDecoder), ComposerConfig::default())
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose `clips` with `gaps[i]` seconds between clip `i` and `i + 1`.
    ///
    /// All-zero gaps over clips sharing one container are joined byte for
    /// byte in that container. Anything else (a silence gap, an overlap, or
    /// mixed containers) is decoded and mixed into 16-bit WAV.
    pub async fn compose(
        &self,
        clips: &[AudioClip],
        gaps: &[f64],
    ) -> Result<CompositionResult, CompositionError> {
        if clips.is_empty() {
            return Err(CompositionError::NoInput);
        }
        if clips.len() > self.config.max_clips {
            return Err(CompositionError::TooManyClips {
                count: clips.len(),
                limit: self.config.max_clips,
            });
        }
        validate_gaps(clips.len(), gaps)?;

        let needs_mix = gaps.iter().any(|gap| *gap != 0.0);
        let target = if needs_mix { None } else { shared_format(clips) };

        let result = match target {
            Some(format) => concatenate(clips, gaps, format, self.config.silence)?,
            None => {
                let limits = RenderLimits {
                    max_output_seconds: self.config.max_output_seconds,
                };
                render(clips, gaps, self.decoder.as_ref(), limits).await?
            }
        };

        info!(
            "Composed {} clip(s) via {} into {} bytes of {}",
            clips.len(),
            result.strategy.as_str(),
            result.bytes.len(),
            result.mime_type
        );
        Ok(result)
    }

    /// Silence in `format` using the configured WAV layout, capped at the
    /// configured output length.
    pub fn silence(
        &self,
        duration_seconds: f64,
        format: &ContainerFormat,
    ) -> Result<AudioClip, CompositionError> {
        if duration_seconds.is_finite() && duration_seconds > self.config.max_output_seconds {
            let rate = f64::from(self.config.silence.sample_rate);
            return Err(CompositionError::OutputTooLong {
                frames: (duration_seconds * rate).round() as usize,
                limit: (self.config.max_output_seconds * rate) as usize,
            });
        }
        create_silence(duration_seconds, format, self.config.silence)
    }
}

/// The one container shared by every non-silence clip, if there is one.
/// A list made only of silence uses the first clip's container.
fn shared_format(clips: &[AudioClip]) -> Option<&ContainerFormat> {
    let mut encoded = clips
        .iter()
        .filter(|clip| !clip.is_synthesized_silence())
        .map(AudioClip::format);

    match encoded.next() {
        Some(first) => encoded.all(|format| format == first).then_some(first),
        None => clips.first().map(AudioClip::format),
    }
}

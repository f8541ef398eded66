//! Decode, place on a shared timeline, mix, normalise, encode as WAV.
//!
//! Memory use is one output buffer of `total_frames * channels` samples plus
//! every decoded input, so callers bound it through
//! [`ComposerConfig::max_output_seconds`](crate::config::ComposerConfig).

use futures::future::join_all;
use tracing::{debug, info};

use crate::clip::{AudioClip, CompositionResult, PcmBuffer, Strategy, MIME_WAV};
use crate::error::{CompositionError, DecoderError};
use crate::services::decode_service::PcmDecoder;
use crate::utils::wav::encode_pcm16;

/// Start frame of every clip on the output timeline.
///
/// Each clip starts where the previous one ended plus the rounded gap, so a
/// negative gap pulls the clip back over its predecessor. The whole layout is
/// then shifted right so that no offset is negative. The arithmetic
/// saturates, so absurd gaps give absurd offsets rather than wrapping.
pub fn clip_offsets(lengths: &[usize], gaps: &[f64], sample_rate: u32) -> Vec<usize> {
    let mut offsets: Vec<i64> = Vec::with_capacity(lengths.len());
    let mut cursor = 0i64;
    for (index, _) in lengths.iter().enumerate() {
        if index > 0 {
            // `as` saturates for out-of-range floats
            let gap_frames = (gaps[index - 1] * f64::from(sample_rate)).round() as i64;
            let previous = i64::try_from(lengths[index - 1]).unwrap_or(i64::MAX);
            cursor = cursor.saturating_add(previous).saturating_add(gap_frames);
        }
        offsets.push(cursor);
    }

    let shift = offsets
        .iter()
        .min()
        .map_or(0, |min| min.checked_neg().unwrap_or(i64::MAX).max(0));
    offsets
        .into_iter()
        .map(|offset| usize::try_from(offset.saturating_add(shift)).unwrap_or(usize::MAX))
        .collect()
}

/// Additively mix `clips` at `offsets` into one buffer.
///
/// The output has as many channels as the widest clip. A narrower clip feeds
/// output channel `c` from its channel `min(c, channels - 1)`, so mono is
/// replicated across stereo. Every clip must have at least one channel.
pub fn mix_at_offsets(clips: &[PcmBuffer], offsets: &[usize], sample_rate: u32) -> PcmBuffer {
    let channel_count = clips.iter().map(PcmBuffer::channel_count).max().unwrap_or(0);
    let total_frames = clips
        .iter()
        .zip(offsets)
        .map(|(clip, offset)| offset + clip.frames())
        .max()
        .unwrap_or(0);

    let mut output = PcmBuffer::silent(sample_rate, channel_count, total_frames);
    for (clip, &offset) in clips.iter().zip(offsets) {
        let last_channel = clip.channel_count() - 1;
        for channel in 0..channel_count {
            let source = clip.channel(channel.min(last_channel));
            let target = &mut output.channel_mut(channel)[offset..offset + source.len()];
            for (out, sample) in target.iter_mut().zip(source) {
                *out += sample;
            }
        }
    }
    output
}

/// Scale the whole buffer by one gain if its peak exceeds 1.0.
///
/// Returns the gain applied, or `None` when the buffer was left untouched.
pub fn normalize_peak(buffer: &mut PcmBuffer) -> Option<f32> {
    let peak = buffer.peak();
    if peak <= 1.0 {
        return None;
    }
    let gain = 1.0 / peak;
    buffer.scale(gain);
    Some(gain)
}

/// Limits applied by [`render`].
#[derive(Clone, Copy, Debug)]
pub struct RenderLimits {
    pub max_output_seconds: f64,
}

/// Run the full decode-mix-normalise pipeline. Output is always 16-bit WAV.
pub async fn render(
    clips: &[AudioClip],
    gaps: &[f64],
    decoder: &dyn PcmDecoder,
    limits: RenderLimits,
) -> Result<CompositionResult, CompositionError> {
    if clips.is_empty() {
        return Err(CompositionError::NoInput);
    }

    let decodes = clips
        .iter()
        .map(|clip| decoder.decode(clip.bytes(), clip.format().mime_type()));
    let mut decoded = Vec::with_capacity(clips.len());
    for (clip_index, result) in join_all(decodes).await.into_iter().enumerate() {
        let buffer = result.map_err(|source| CompositionError::Decode { clip_index, source })?;
        if buffer.channel_count() == 0 {
            return Err(CompositionError::Decode {
                clip_index,
                source: DecoderError::NoChannels,
            });
        }
        decoded.push(buffer);
    }

    let sample_rate = decoded[0].sample_rate();
    if let Some((clip_index, mismatch)) = decoded
        .iter()
        .enumerate()
        .find(|(_, buffer)| buffer.sample_rate() != sample_rate)
    {
        return Err(CompositionError::SampleRateMismatch {
            clip_index,
            expected: sample_rate,
            found: mismatch.sample_rate(),
        });
    }

    // A gap of `g` frames either way spans at least `|g|` output frames.
    let limit = (limits.max_output_seconds * f64::from(sample_rate)) as usize;
    if let Some(gap) = gaps
        .iter()
        .map(|gap| (gap.abs() * f64::from(sample_rate)).round())
        .find(|frames| *frames > limit as f64)
    {
        return Err(CompositionError::OutputTooLong {
            frames: gap as usize,
            limit,
        });
    }

    let lengths: Vec<usize> = decoded.iter().map(PcmBuffer::frames).collect();
    let offsets = clip_offsets(&lengths, gaps, sample_rate);
    debug!("Clip offsets (frames): {:?}", offsets);

    let total_frames = offsets
        .iter()
        .zip(&lengths)
        .map(|(offset, length)| offset.saturating_add(*length))
        .max()
        .unwrap_or(0);
    if total_frames > limit {
        return Err(CompositionError::OutputTooLong {
            frames: total_frames,
            limit,
        });
    }

    let mut mixed = mix_at_offsets(&decoded, &offsets, sample_rate);
    if let Some(gain) = normalize_peak(&mut mixed) {
        debug!("Normalised mix with gain {}", gain);
    }

    info!(
        "Mixed {} clip(s) into {} frame(s) at {} Hz, {} channel(s)",
        clips.len(),
        mixed.frames(),
        sample_rate,
        mixed.channel_count()
    );

    Ok(CompositionResult {
        bytes: encode_pcm16(&mixed),
        mime_type: MIME_WAV.to_string(),
        strategy: Strategy::Mixed,
    })
}

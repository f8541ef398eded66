//! Byte-level fast path: join same-format clips, optionally with silence between them.

use std::borrow::Cow;

use tracing::{info, warn};

use crate::clip::{validate_gaps, AudioClip, CompositionResult, ContainerFormat, Strategy};
use crate::error::CompositionError;
use crate::utils::concat_mp3::concat_mp3;
use crate::utils::silence::{create_silence, SilenceSpec};
use crate::utils::wav::{merge_wav, parse_wav, WAV_HEADER_LEN};

/// Silence layout for the WAV path: match the first clip that parses, since
/// its header is the one `merge_wav` keeps.
fn wav_silence_spec(clips: &[AudioClip], fallback: SilenceSpec) -> SilenceSpec {
    clips
        .iter()
        .filter(|clip| clip.bytes().len() >= WAV_HEADER_LEN)
        .find_map(|clip| parse_wav(clip.bytes()).ok())
        .map(|info| SilenceSpec {
            sample_rate: info.sample_rate,
            channels: info.channels,
            bit_depth: info.bit_depth,
        })
        .unwrap_or(fallback)
}

/// Join `clips` in order as `target`, inserting silence for every positive gap.
///
/// Zero gaps abut. Negative gaps need mixing and are rejected here.
/// Opaque containers are joined byte for byte with no structural handling,
/// which is only sound for self-delimiting streams.
pub fn concatenate(
    clips: &[AudioClip],
    gaps: &[f64],
    target: &ContainerFormat,
    silence: SilenceSpec,
) -> Result<CompositionResult, CompositionError> {
    if clips.is_empty() {
        return Err(CompositionError::NoInput);
    }
    validate_gaps(clips.len(), gaps)?;
    if let Some(index) = gaps.iter().position(|gap| *gap < 0.0) {
        return Err(CompositionError::UnsupportedOperation(format!(
            "gap #{index} overlaps clips; overlap requires mixing"
        )));
    }

    let spec = match target {
        ContainerFormat::Wav => wav_silence_spec(clips, silence),
        _ => silence,
    };

    let mut sequence: Vec<Cow<'_, AudioClip>> = Vec::with_capacity(clips.len() * 2);
    for (index, clip) in clips.iter().enumerate() {
        if let Some(gap) = index.checked_sub(1).map(|boundary| gaps[boundary]) {
            if gap > 0.0 {
                sequence.push(Cow::Owned(create_silence(gap, target, spec)?));
            }
        }
        sequence.push(Cow::Borrowed(clip));
    }

    info!(
        "Concatenating {} clip(s) as {} ({} segment(s) with silence)",
        clips.len(),
        target,
        sequence.len()
    );

    let bytes = match target {
        ContainerFormat::Mp3 => concat_mp3(&sequence),
        ContainerFormat::Wav => merge_wav(&sequence)?.ok_or(CompositionError::NoInput)?,
        ContainerFormat::Opaque(mime) => {
            warn!(
                "Joining {} opaque clip(s) ({}) byte for byte; playback of the result is not guaranteed",
                sequence.len(),
                mime
            );
            sequence.iter().flat_map(|clip| clip.bytes()).copied().collect()
        }
    };

    Ok(CompositionResult {
        bytes,
        mime_type: target.mime_type().to_string(),
        strategy: Strategy::Concatenated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::silence::{mp3_frame_count, SILENT_MP3_FRAME};
    use crate::utils::wav::build_wav_header;

    fn wav(sample_rate: u32, payload: &[u8]) -> AudioClip {
        let mut bytes = build_wav_header(sample_rate, 1, 16, payload.len() as u32).to_vec();
        bytes.extend_from_slice(payload);
        AudioClip::encoded(bytes, ContainerFormat::Wav, "wav")
    }

    #[test]
    fn wav_gap_inserts_silence_matching_first_clip() {
        let clips = vec![wav(8_000, &[1, 1, 2, 2]), wav(8_000, &[3, 3])];
        let result =
            concatenate(&clips, &[0.5], &ContainerFormat::Wav, SilenceSpec::default()).unwrap();

        assert_eq!(result.mime_type, "audio/wav");
        assert_eq!(result.strategy, Strategy::Concatenated);
        let info = parse_wav(&result.bytes).unwrap();
        assert_eq!(info.sample_rate, 8_000);
        // 4 + 4000 samples * 2 bytes + 2
        assert_eq!(info.data_length, 4 + 8_000 + 2);
        let payload = info.payload(&result.bytes);
        assert_eq!(&payload[..4], &[1, 1, 2, 2]);
        assert_eq!(&payload[payload.len() - 2..], &[3, 3]);
    }

    #[test]
    fn mp3_gap_inserts_silent_frames() {
        let clips = vec![
            AudioClip::encoded(vec![0xFF, 0xFB, 1], ContainerFormat::Mp3, "a"),
            AudioClip::encoded(vec![0xFF, 0xFB, 2], ContainerFormat::Mp3, "b"),
        ];
        let result =
            concatenate(&clips, &[0.1], &ContainerFormat::Mp3, SilenceSpec::default()).unwrap();
        let frames = mp3_frame_count(0.1);
        assert_eq!(result.mime_type, "audio/mpeg");
        assert_eq!(result.bytes.len(), 6 + frames * SILENT_MP3_FRAME.len());
        assert_eq!(&result.bytes[..3], &[0xFF, 0xFB, 1]);
        assert_eq!(&result.bytes[3..25], &SILENT_MP3_FRAME);
    }

    #[test]
    fn opaque_clips_are_byte_joined() {
        let target = ContainerFormat::Opaque("audio/ogg".into());
        let clips = vec![
            AudioClip::encoded(vec![1, 2], target.clone(), "a"),
            AudioClip::encoded(vec![3], target.clone(), "b"),
        ];
        let result = concatenate(&clips, &[0.0], &target, SilenceSpec::default()).unwrap();
        assert_eq!(result.bytes, vec![1, 2, 3]);
        assert_eq!(result.mime_type, "audio/ogg");
    }

    #[test]
    fn opaque_gap_is_unsupported() {
        let target = ContainerFormat::Opaque("audio/ogg".into());
        let clips = vec![
            AudioClip::encoded(vec![1], target.clone(), "a"),
            AudioClip::encoded(vec![2], target.clone(), "b"),
        ];
        let err = concatenate(&clips, &[1.0], &target, SilenceSpec::default()).unwrap_err();
        assert!(matches!(err, CompositionError::UnsupportedOperation(_)));
    }

    #[test]
    fn negative_gap_is_rejected() {
        let clips = vec![wav(8_000, &[1, 1]), wav(8_000, &[2, 2])];
        let err =
            concatenate(&clips, &[-0.1], &ContainerFormat::Wav, SilenceSpec::default()).unwrap_err();
        assert!(matches!(err, CompositionError::UnsupportedOperation(_)));
    }

    #[test]
    fn wav_without_payload_is_no_input() {
        let clips = vec![AudioClip::encoded(vec![0; 4], ContainerFormat::Wav, "tiny")];
        let err = concatenate(&clips, &[], &ContainerFormat::Wav, SilenceSpec::default()).unwrap_err();
        assert!(matches!(err, CompositionError::NoInput));
    }
}

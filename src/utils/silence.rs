//! Empty-audio synthesis for the supported containers.

use crate::clip::{AudioClip, ContainerFormat};
use crate::error::{CompositionError, FormatError};
use crate::utils::wav::{build_wav_header, check_layout};

/// Placeholder frame for MP3 silence: a Layer III sync header followed by
/// zeros.
///
/// Its header describes a 104-byte frame at 32 kbps, so the 22 bytes here are
/// only a length-quantisation unit for byte-level splicing. Decoders are not
/// guaranteed to accept it, so MP3 silence must not be fed to the mix.
pub const SILENT_MP3_FRAME: [u8; 22] = [
    0xFF, 0xFB, 0x10, 0xC4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Playback length of one MP3 frame: 1152 samples at 44.1 kHz.
pub const MP3_FRAME_SECONDS: f64 = 1152.0 / 44_100.0;

/// PCM layout used for synthesised WAV silence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SilenceSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl Default for SilenceSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            bit_depth: 16,
        }
    }
}

/// Build a silence clip of `duration_seconds` in `target`.
///
/// WAV silence is exact to one sample. MP3 silence is quantised up to whole
/// frames of [`MP3_FRAME_SECONDS`]. Negative durations produce an empty
/// payload.
pub fn create_silence(
    duration_seconds: f64,
    target: &ContainerFormat,
    spec: SilenceSpec,
) -> Result<AudioClip, CompositionError> {
    if !duration_seconds.is_finite() {
        return Err(CompositionError::InvalidDuration(duration_seconds));
    }
    let duration = duration_seconds.max(0.0);

    let bytes = match target {
        ContainerFormat::Wav => silent_wav(duration, spec)?,
        ContainerFormat::Mp3 => silent_mp3(duration)?,
        ContainerFormat::Opaque(mime) => {
            return Err(CompositionError::UnsupportedOperation(format!(
                "cannot synthesise silence for {mime}"
            )))
        }
    };

    Ok(AudioClip::Silence {
        bytes,
        format: target.clone(),
        duration,
    })
}

fn silent_wav(duration: f64, spec: SilenceSpec) -> Result<Vec<u8>, CompositionError> {
    if spec.bit_depth == 0 || spec.bit_depth % 8 != 0 {
        return Err(FormatError::UnsupportedBitDepth(spec.bit_depth).into());
    }
    check_layout(spec.sample_rate, spec.channels, spec.bit_depth)?;

    // A RIFF data chunk cannot describe more than u32::MAX bytes.
    let frame_bytes = usize::from(spec.channels) * usize::from(spec.bit_depth / 8);
    let limit = u32::MAX as usize / frame_bytes.max(1);
    let num_samples = (duration * f64::from(spec.sample_rate)).round() as usize;
    if num_samples > limit {
        return Err(CompositionError::OutputTooLong {
            frames: num_samples,
            limit,
        });
    }

    let data_len = num_samples * frame_bytes;
    let header = build_wav_header(
        spec.sample_rate,
        spec.channels,
        spec.bit_depth,
        data_len as u32,
    );

    let mut bytes = Vec::with_capacity(header.len() + data_len);
    bytes.extend_from_slice(&header);
    bytes.resize(header.len() + data_len, 0);
    Ok(bytes)
}

/// Number of silent frames emitted for `duration` seconds.
pub fn mp3_frame_count(duration: f64) -> usize {
    (duration / MP3_FRAME_SECONDS).ceil() as usize
}

fn silent_mp3(duration: f64) -> Result<Vec<u8>, CompositionError> {
    let frames = mp3_frame_count(duration);
    let limit = isize::MAX as usize / SILENT_MP3_FRAME.len();
    if frames > limit {
        return Err(CompositionError::OutputTooLong { frames, limit });
    }
    Ok(SILENT_MP3_FRAME.repeat(frames))
}

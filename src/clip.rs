//! Clip, PCM buffer and result types shared by every composition path.

use std::fmt;

use crate::error::CompositionError;

pub const MIME_WAV: &str = "audio/wav";
pub const MIME_MPEG: &str = "audio/mpeg";

/// Container format of an encoded clip.
///
/// `Opaque` carries the caller's MIME type. It can be byte-joined but never
/// spliced, and silence cannot be synthesised for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Wav,
    Mp3,
    Opaque(String),
}

impl ContainerFormat {
    /// Parse a request label such as `"mp3"` or `"audio/wav"`.
    /// Anything unrecognised becomes `Opaque` with the label as its MIME type.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "wav" | "wave" | "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => {
                Self::Wav
            }
            "mp3" | "mpeg" | "audio/mpeg" | "audio/mp3" | "audio/mpeg3" => Self::Mp3,
            _ => Self::Opaque(normalized),
        }
    }

    /// Guess the container from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            Self::Wav
        } else if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
        {
            Self::Mp3
        } else {
            Self::Opaque(String::from("application/octet-stream"))
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Wav => MIME_WAV,
            Self::Mp3 => MIME_MPEG,
            Self::Opaque(mime) => mime,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wav => f.write_str("wav"),
            Self::Mp3 => f.write_str("mp3"),
            Self::Opaque(mime) => write!(f, "opaque ({mime})"),
        }
    }
}

/// One input to a composition call. Never mutated once built.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioClip {
    /// Audio produced elsewhere, typically a TTS response.
    Encoded {
        bytes: Vec<u8>,
        format: ContainerFormat,
        label: String,
    },
    /// Silence built by [`create_silence`](crate::utils::silence::create_silence).
    /// These carry no metadata, so the MP3 splicer passes them through untouched.
    Silence {
        bytes: Vec<u8>,
        format: ContainerFormat,
        duration: f64,
    },
}

impl AudioClip {
    pub fn encoded(bytes: Vec<u8>, format: ContainerFormat, label: impl Into<String>) -> Self {
        Self::Encoded {
            bytes,
            format,
            label: label.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Encoded { bytes, .. } | Self::Silence { bytes, .. } => bytes,
        }
    }

    pub fn format(&self) -> &ContainerFormat {
        match self {
            Self::Encoded { format, .. } | Self::Silence { format, .. } => format,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Encoded { label, .. } => label,
            Self::Silence { .. } => "silence",
        }
    }

    pub fn is_synthesized_silence(&self) -> bool {
        matches!(self, Self::Silence { .. })
    }
}

/// Planar floating-point audio, amplitudes nominally in `[-1, 1]`.
///
/// All channels have the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Build a buffer from per-channel samples. Shorter channels are padded
    /// with zeros up to the longest one.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(frames, 0.0);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// A zero-filled buffer.
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    /// Split interleaved samples into channels. A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Self {
        if channel_count == 0 {
            return Self::new(sample_rate, Vec::new());
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub(crate) fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Largest absolute amplitude across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flatten()
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }

    pub fn scale(&mut self, gain: f32) {
        for sample in self.channels.iter_mut().flatten() {
            *sample *= gain;
        }
    }
}

/// Which path produced a [`CompositionResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Concatenated,
    Mixed,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concatenated => "concatenated",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositionResult {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub strategy: Strategy,
}

/// Check the gap list against the clip list: one finite gap per boundary.
pub fn validate_gaps(clip_count: usize, gaps: &[f64]) -> Result<(), CompositionError> {
    if gaps.len() != clip_count.saturating_sub(1) {
        return Err(CompositionError::GapCountMismatch {
            clips: clip_count,
            gaps: gaps.len(),
        });
    }
    match gaps.iter().position(|gap| !gap.is_finite()) {
        Some(index) => Err(CompositionError::InvalidGap {
            index,
            value: gaps[index],
        }),
        None => Ok(()),
    }
}

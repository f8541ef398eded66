//! Error types for the composition engine (thiserror-based).

use thiserror::Error;

/// Structural problems with a RIFF/WAVE container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The buffer does not start with `RIFF....WAVE`.
    #[error("missing RIFF/WAVE header")]
    MissingRiffHeader,

    /// A `data` chunk was found before any `fmt ` chunk.
    #[error("WAV stream has no fmt chunk before its data chunk")]
    MissingFmtChunk,

    /// The chunk scan ran off the end of the buffer.
    #[error("WAV stream has no data chunk")]
    MissingDataChunk,

    #[error("unsupported WAV bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// Block align or byte rate would not fit the canonical header fields.
    #[error("unsupported WAV layout: {channels} channel(s) of {bit_depth} bit at {sample_rate} Hz")]
    UnsupportedLayout {
        sample_rate: u32,
        channels: u16,
        bit_depth: u16,
    },

    /// Only integer PCM (format tag 1) can be spliced or decoded natively.
    #[error("unsupported WAV encoding tag: {0}")]
    UnsupportedEncoding(u16),
}

/// Failures reported by a [`PcmDecoder`](crate::services::decode_service::PcmDecoder).
#[derive(Debug, Error)]
pub enum DecoderError {
    /// Wrapper around errors produced by the Symphonia decoding library.
    #[error(transparent)]
    Symphonia(#[from] symphonia::core::errors::Error),

    #[error("input stream does not provide a default track")]
    MissingDefaultTrack,

    #[error("input stream does not advertise a sample rate")]
    MissingSampleRate,

    #[error("decoded stream has no audio channels")]
    NoChannels,

    /// The blocking decode task panicked or was cancelled.
    #[error("decode task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Wav(#[from] FormatError),
}

/// Everything a composition call can fail with.
///
/// Every variant aborts the whole call; no partial buffer is ever returned.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("malformed container: {0}")]
    Format(#[from] FormatError),

    /// A clip's bytes could not be decoded to PCM.
    #[error("failed to decode clip #{clip_index}: {source}")]
    Decode {
        clip_index: usize,
        #[source]
        source: DecoderError,
    },

    /// Empty clip list, or every clip was empty/invalid.
    #[error("no audio to compose")]
    NoInput,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("expected {expected} gap(s) for {clips} clip(s), got {gaps}", expected = .clips.saturating_sub(1))]
    GapCountMismatch { clips: usize, gaps: usize },

    #[error("gap #{index} is not a finite number of seconds: {value}")]
    InvalidGap { index: usize, value: f64 },

    #[error("silence duration is not a finite number of seconds: {0}")]
    InvalidDuration(f64),

    /// Clips are never resampled; every clip must match clip 0.
    #[error("clip #{clip_index} is sampled at {found} Hz, expected {expected} Hz")]
    SampleRateMismatch {
        clip_index: usize,
        expected: u32,
        found: u32,
    },

    #[error("{count} clips exceeds the limit of {limit}")]
    TooManyClips { count: usize, limit: usize },

    #[error("composed output of {frames} frames exceeds the limit of {limit} frames")]
    OutputTooLong { frames: usize, limit: usize },
}

use std::str::FromStr;

use tracing::warn;

use crate::utils::silence::SilenceSpec;

pub const SILENCE_SAMPLE_RATE_KEY: &str = "COMPOSER_SILENCE_SAMPLE_RATE";
pub const SILENCE_CHANNELS_KEY: &str = "COMPOSER_SILENCE_CHANNELS";
pub const SILENCE_BIT_DEPTH_KEY: &str = "COMPOSER_SILENCE_BIT_DEPTH";
pub const MAX_CLIPS_KEY: &str = "COMPOSER_MAX_CLIPS";
pub const MAX_OUTPUT_SECONDS_KEY: &str = "COMPOSER_MAX_OUTPUT_SECONDS";
pub const MAX_REQUEST_BYTES_KEY: &str = "COMPOSER_MAX_REQUEST_BYTES";

/// Runtime settings for the composer and its HTTP surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComposerConfig {
    /// Layout of synthesised WAV silence when no clip header dictates one.
    pub silence: SilenceSpec,
    pub max_clips: usize,
    /// Ceiling on the mixed output length. The mix buffer grows linearly with it.
    pub max_output_seconds: f64,
    /// JSON body limit for `POST /api/compose`.
    pub max_request_bytes: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            silence: SilenceSpec::default(),
            max_clips: 256,
            max_output_seconds: 3_600.0,
            max_request_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ComposerConfig {
    /// Build a config from a key lookup such as the shuttle `SecretStore`.
    ///
    /// Missing keys keep their defaults. Values that do not parse, or are not
    /// positive, are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let silence = SilenceSpec {
            sample_rate: read(&lookup, SILENCE_SAMPLE_RATE_KEY, defaults.silence.sample_rate, |v| {
                *v > 0
            }),
            channels: read(&lookup, SILENCE_CHANNELS_KEY, defaults.silence.channels, |v| *v > 0),
            bit_depth: read(&lookup, SILENCE_BIT_DEPTH_KEY, defaults.silence.bit_depth, |v| {
                *v > 0 && v % 8 == 0
            }),
        };

        Self {
            silence,
            max_clips: read(&lookup, MAX_CLIPS_KEY, defaults.max_clips, |v| *v > 0),
            max_output_seconds: read(
                &lookup,
                MAX_OUTPUT_SECONDS_KEY,
                defaults.max_output_seconds,
                |v| v.is_finite() && *v > 0.0,
            ),
            max_request_bytes: read(
                &lookup,
                MAX_REQUEST_BYTES_KEY,
                defaults.max_request_bytes,
                |v| *v > 0,
            ),
        }
    }
}

fn read<F, T>(lookup: &F, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!("Ignoring invalid {}={:?}; using {:?}", key, raw, default);
            default
        }
    }
}

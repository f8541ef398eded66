//! Composes short audio clips into one stream.
//!
//! Clips sharing a container with no gaps between them are joined byte for
//! byte (`utils::concatenate`). Anything else goes through the PCM mix in
//! `services::mix_pipeline` and comes out as 16-bit WAV.

pub mod app_state;
pub mod clip;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod services;
pub mod utils;

pub use clip::{AudioClip, CompositionResult, ContainerFormat, PcmBuffer, Strategy};
pub use config::ComposerConfig;
pub use error::{CompositionError, DecoderError, FormatError};
pub use services::composition_service::Composer;
pub use services::decode_service::{PcmDecoder, SymphoniaDecoder, WavPcmDecoder};
pub use utils::concatenate::concatenate;
pub use utils::silence::{create_silence, SilenceSpec};

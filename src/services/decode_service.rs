use std::io::Cursor;

use futures::future::{BoxFuture, FutureExt};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tokio::task;
use tracing::{debug, warn};

use crate::clip::PcmBuffer;
use crate::error::DecoderError;
use crate::utils::wav::decode_wav_pcm;

/// Turns an encoded clip into linear PCM.
///
/// Implementations must be reentrant: the composer calls `decode` for every
/// clip at once and awaits them together.
pub trait PcmDecoder: Send + Sync {
    fn decode<'a>(
        &'a self,
        bytes: &'a [u8],
        mime_hint: &'a str,
    ) -> BoxFuture<'a, Result<PcmBuffer, DecoderError>>;
}

/// Default decoder backed by Symphonia (MP3, WAV and the other default codecs).
///
/// Decoding is CPU-bound, so each call runs on tokio's blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaDecoder;

impl PcmDecoder for SymphoniaDecoder {
    fn decode<'a>(
        &'a self,
        bytes: &'a [u8],
        mime_hint: &'a str,
    ) -> BoxFuture<'a, Result<PcmBuffer, DecoderError>> {
        let owned = bytes.to_vec();
        let mime = mime_hint.to_owned();
        async move {
            match task::spawn_blocking(move || decode_with_symphonia(owned, &mime)).await {
                Ok(result) => result,
                Err(e) => Err(DecoderError::Task(e.to_string())),
            }
        }
        .boxed()
    }
}

fn decode_with_symphonia(bytes: Vec<u8>, mime_hint: &str) -> Result<PcmBuffer, DecoderError> {
    let mut hint = Hint::new();
    hint.mime_type(mime_hint);

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or(DecoderError::MissingDefaultTrack)?;
    if track.codec_params.codec == CODEC_TYPE_NULL {
        return Err(DecoderError::Symphonia(SymphoniaError::Unsupported(
            "track has no codec",
        )));
    }
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping corrupted audio packet: {}", msg);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        sample_rate.get_or_insert(spec.rate);
        channel_count.get_or_insert(spec.channels.count());

        let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        samples.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(samples.samples());
    }

    let sample_rate = sample_rate.ok_or(DecoderError::MissingSampleRate)?;
    let channel_count = match channel_count {
        Some(count) if count > 0 => count,
        _ => return Err(DecoderError::NoChannels),
    };

    let buffer = PcmBuffer::from_interleaved(sample_rate, channel_count, &interleaved);
    debug!(
        "Decoded {} frame(s) at {} Hz across {} channel(s)",
        buffer.frames(),
        sample_rate,
        channel_count
    );
    Ok(buffer)
}

/// Decoder for integer PCM WAV only, with no codec library involved.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavPcmDecoder;

impl PcmDecoder for WavPcmDecoder {
    fn decode<'a>(
        &'a self,
        bytes: &'a [u8],
        _mime_hint: &'a str,
    ) -> BoxFuture<'a, Result<PcmBuffer, DecoderError>> {
        async move { decode_wav_pcm(bytes).map_err(DecoderError::from) }.boxed()
    }
}

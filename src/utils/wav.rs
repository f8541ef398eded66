//! RIFF/WAVE parsing, header synthesis and byte-level merging.

use std::borrow::Borrow;

use tracing::warn;

use crate::clip::{AudioClip, PcmBuffer};
use crate::error::FormatError;

/// Size of the canonical PCM header produced by [`build_wav_header`].
pub const WAV_HEADER_LEN: usize = 44;

const FORMAT_PCM: u16 = 1;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Header fields plus the location of the `data` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavInfo {
    pub format_tag: u16,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub data_offset: usize,
    pub data_length: usize,
}

impl WavInfo {
    pub fn payload<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.data_offset..self.data_offset + self.data_length]
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Walk the chunk list after `RIFF`/size/`WAVE` until the `data` chunk.
///
/// Chunks are word aligned, so an odd size is followed by one pad byte. A
/// `data` size running past the end of the buffer is clamped to what is
/// actually there.
pub fn parse_wav(bytes: &[u8]) -> Result<WavInfo, FormatError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(FormatError::MissingRiffHeader);
    }

    // (format tag, channels, sample rate, bit depth)
    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut offset = 12usize;

    while offset.saturating_add(8) <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4) as usize;
        let body = offset + 8;

        if id == b"fmt " && size >= 16 && body + 16 <= bytes.len() {
            fmt = Some((
                read_u16(bytes, body),
                read_u16(bytes, body + 2),
                read_u32(bytes, body + 4),
                read_u16(bytes, body + 14),
            ));
        } else if id == b"data" {
            let (format_tag, channels, sample_rate, bit_depth) =
                fmt.ok_or(FormatError::MissingFmtChunk)?;
            check_layout(sample_rate, channels, bit_depth)?;
            return Ok(WavInfo {
                format_tag,
                sample_rate,
                channels,
                bit_depth,
                data_offset: body,
                data_length: size.min(bytes.len() - body),
            });
        }

        offset = body.saturating_add(size).saturating_add(size & 1);
    }

    Err(FormatError::MissingDataChunk)
}

/// Block align and byte rate for a layout, if both fit their header fields.
fn layout_fields(sample_rate: u32, channels: u16, bit_depth: u16) -> Option<(u16, u32)> {
    let block_align = u16::try_from(u32::from(channels) * u32::from(bit_depth / 8)).ok()?;
    let byte_rate = sample_rate.checked_mul(u32::from(block_align))?;
    Some((block_align, byte_rate))
}

/// Reject layouts whose block align or byte rate cannot be written back
/// into a canonical header.
pub fn check_layout(sample_rate: u32, channels: u16, bit_depth: u16) -> Result<(), FormatError> {
    match layout_fields(sample_rate, channels, bit_depth) {
        Some(_) => Ok(()),
        None => Err(FormatError::UnsupportedLayout {
            sample_rate,
            channels,
            bit_depth,
        }),
    }
}

/// Canonical 44-byte PCM header.
///
/// Layouts rejected by [`check_layout`] get saturated `byte_rate` and
/// `block_align` fields.
pub fn build_wav_header(
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
    total_data_size: u32,
) -> [u8; WAV_HEADER_LEN] {
    let (block_align, byte_rate) =
        layout_fields(sample_rate, channels, bit_depth).unwrap_or((u16::MAX, u32::MAX));

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&36u32.saturating_add(total_data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&total_data_size.to_le_bytes());
    header
}

fn data_size_field(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Join the `data` payloads of several WAV clips under one header.
///
/// The first clip that parses decides sample rate, channel count and bit
/// depth for the whole output; later headers are not compared against it.
/// Clips shorter than a header are skipped. Returns `Ok(None)` when no
/// payload bytes were found at all.
pub fn merge_wav<C: Borrow<AudioClip>>(clips: &[C]) -> Result<Option<Vec<u8>>, FormatError> {
    let mut canonical: Option<WavInfo> = None;
    let mut payloads: Vec<&[u8]> = Vec::with_capacity(clips.len());
    let mut total = 0usize;

    for (index, clip) in clips.iter().enumerate() {
        let clip: &AudioClip = clip.borrow();
        let bytes = clip.bytes();
        if bytes.len() < WAV_HEADER_LEN {
            warn!(
                "Skipping WAV clip #{} ({}): only {} bytes",
                index,
                clip.label(),
                bytes.len()
            );
            continue;
        }

        let info = parse_wav(bytes)?;
        canonical.get_or_insert(info);
        let payload = info.payload(bytes);
        total += payload.len();
        payloads.push(payload);
    }

    let Some(format) = canonical else {
        return Ok(None);
    };
    if total == 0 {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + total);
    out.extend_from_slice(&build_wav_header(
        format.sample_rate,
        format.channels,
        format.bit_depth,
        data_size_field(total),
    ));
    for payload in payloads {
        out.extend_from_slice(payload);
    }
    Ok(Some(out))
}

/// Encode as interleaved 16-bit PCM WAV. Samples outside `[-1, 1]` are clamped.
pub fn encode_pcm16(buffer: &PcmBuffer) -> Vec<u8> {
    let channel_count = buffer.channel_count();
    let frames = buffer.frames();
    let data_len = frames * channel_count * 2;
    let channels = u16::try_from(channel_count).unwrap_or(u16::MAX);

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    out.extend_from_slice(&build_wav_header(
        buffer.sample_rate(),
        channels,
        16,
        data_size_field(data_len),
    ));
    for frame in 0..frames {
        for channel in 0..channel_count {
            let sample = buffer.channel(channel)[frame];
            out.extend_from_slice(&to_i16(sample).to_le_bytes());
        }
    }
    out
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Decode an integer-PCM WAV (8, 16, 24 or 32 bit) into planar floats.
pub fn decode_wav_pcm(bytes: &[u8]) -> Result<PcmBuffer, FormatError> {
    let info = parse_wav(bytes)?;
    if info.format_tag != FORMAT_PCM && info.format_tag != FORMAT_EXTENSIBLE {
        return Err(FormatError::UnsupportedEncoding(info.format_tag));
    }

    let width = match info.bit_depth {
        8 | 16 | 24 | 32 => usize::from(info.bit_depth / 8),
        other => return Err(FormatError::UnsupportedBitDepth(other)),
    };
    let channel_count = usize::from(info.channels);
    if channel_count == 0 {
        return Ok(PcmBuffer::new(info.sample_rate, Vec::new()));
    }

    let samples: Vec<f32> = info
        .payload(bytes)
        .chunks_exact(width)
        .map(|s| match width {
            1 => (f32::from(s[0]) - 128.0) / 128.0,
            2 => f32::from(i16::from_le_bytes([s[0], s[1]])) / 32_768.0,
            3 => (i32::from_le_bytes([0, s[0], s[1], s[2]]) >> 8) as f32 / 8_388_608.0,
            _ => i32::from_le_bytes([s[0], s[1], s[2], s[3]]) as f32 / 2_147_483_648.0,
        })
        .collect();

    Ok(PcmBuffer::from_interleaved(
        info.sample_rate,
        channel_count,
        &samples,
    ))
}

use std::borrow::Borrow;

use crate::clip::AudioClip;

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;

/// Size of an ID3v2 tag body, read from the synchsafe integer at bytes 6..10.
/// Only the low 7 bits of each byte count.
pub fn synchsafe_size(bytes: [u8; 4]) -> usize {
    bytes
        .iter()
        .fold(0usize, |size, byte| (size << 7) | usize::from(byte & 0x7F))
}

/// Byte range of `segment` left after dropping its metadata.
///
/// A leading ID3v2 tag is dropped only when `strip_leading` is set and a
/// trailing 128-byte ID3v1 tag only when `strip_trailing` is set.
fn frame_range(segment: &[u8], strip_leading: bool, strip_trailing: bool) -> (usize, usize) {
    let mut start = 0;
    let mut end = segment.len();

    if strip_leading && segment.len() >= ID3V2_HEADER_LEN && segment.starts_with(b"ID3") {
        let size = synchsafe_size([segment[6], segment[7], segment[8], segment[9]]);
        start = (ID3V2_HEADER_LEN + size).min(end);
    }

    if strip_trailing
        && end - start >= ID3V1_TAG_LEN
        && segment[end - ID3V1_TAG_LEN..].starts_with(b"TAG")
    {
        end -= ID3V1_TAG_LEN;
    }

    (start, end)
}

/// MP3 concatenation for in-memory segments.
///
/// MP3 frames are self-delimiting, so the frame streams can be joined byte for
/// byte once the metadata between them is gone. The first segment keeps its
/// ID3v2 tag and the last keeps its ID3v1 tag; every other tag is dropped.
/// Synthesised silence is a bare frame stream and is copied as-is.
pub fn concat_mp3<C: Borrow<AudioClip>>(segments: &[C]) -> Vec<u8> {
    let last = segments.len().saturating_sub(1);
    let total = segments
        .iter()
        .map(|s| Borrow::<AudioClip>::borrow(s).bytes().len())
        .sum();
    let mut out = Vec::with_capacity(total);

    for (index, segment) in segments.iter().enumerate() {
        let segment: &AudioClip = segment.borrow();
        let bytes = segment.bytes();
        if segment.is_synthesized_silence() {
            out.extend_from_slice(bytes);
            continue;
        }

        let (start, end) = frame_range(bytes, index > 0, index < last);
        out.extend_from_slice(&bytes[start..end]);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ContainerFormat;

    fn id3v2(body_len: usize) -> Vec<u8> {
        let mut tag = b"ID3\x04\x00\x00".to_vec();
        tag.extend_from_slice(&[
            ((body_len >> 21) & 0x7F) as u8,
            ((body_len >> 14) & 0x7F) as u8,
            ((body_len >> 7) & 0x7F) as u8,
            (body_len & 0x7F) as u8,
        ]);
        tag.extend(std::iter::repeat(0xAA).take(body_len));
        tag
    }

    fn id3v1() -> Vec<u8> {
        let mut tag = b"TAG".to_vec();
        tag.resize(ID3V1_TAG_LEN, b' ');
        tag
    }

    fn segment(bytes: Vec<u8>) -> AudioClip {
        AudioClip::encoded(bytes, ContainerFormat::Mp3, "segment")
    }

    #[test]
    fn synchsafe_ignores_high_bits() {
        assert_eq!(synchsafe_size([0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(synchsafe_size([0x7F, 0x7F, 0x7F, 0x7F]), (1 << 28) - 1);
        assert_eq!(synchsafe_size([0x80, 0x80, 0x80, 0x81]), 1);
    }

    #[test]
    fn inner_tags_are_stripped_outer_tags_kept() {
        let frames_a: Vec<u8> = vec![0xFF, 0xFB, 0x01, 0x02];
        let frames_b: Vec<u8> = vec![0xFF, 0xFB, 0x03, 0x04];
        let frames_c: Vec<u8> = vec![0xFF, 0xFB, 0x05, 0x06];
        let head = id3v2(300);
        let tail = id3v1();

        let segments = vec![
            segment([head.clone(), frames_a.clone(), tail.clone()].concat()),
            segment([head.clone(), frames_b.clone(), tail.clone()].concat()),
            segment([head.clone(), frames_c.clone(), tail.clone()].concat()),
        ];
        let input_len: usize = segments.iter().map(|s| s.bytes().len()).sum();

        let merged = concat_mp3(&segments);
        assert_eq!(merged.len(), input_len - 2 * head.len() - 2 * tail.len());
        assert_eq!(
            merged,
            [head.clone(), frames_a, frames_b, frames_c, tail.clone()].concat()
        );
    }

    #[test]
    fn silence_passes_through_untouched() {
        let fake_tag = id3v2(4);
        let silence = AudioClip::Silence {
            bytes: fake_tag.clone(),
            format: ContainerFormat::Mp3,
            duration: 0.0,
        };
        let segments = vec![segment(vec![0xFF, 0xFB]), silence, segment(vec![0xFF, 0xFA])];
        let merged = concat_mp3(&segments);
        assert_eq!(merged, [vec![0xFF, 0xFB], fake_tag, vec![0xFF, 0xFA]].concat());
    }

    #[test]
    fn oversized_tag_swallows_segment() {
        let mut bogus = b"ID3\x04\x00\x00\x7F\x7F\x7F\x7F".to_vec();
        bogus.extend_from_slice(&[1, 2, 3]);
        let segments = vec![segment(vec![9, 9]), segment(bogus)];
        assert_eq!(concat_mp3(&segments), vec![9, 9]);
    }

    #[test]
    fn single_segment_is_unchanged() {
        let bytes = [id3v2(2), vec![0xFF, 0xFB], id3v1()].concat();
        let segments = vec![segment(bytes.clone())];
        assert_eq!(concat_mp3(&segments), bytes);
    }
}

//! Sample transcoder
//!
//! Converts raw little-endian unsigned PCM into gain-adjusted signed samples
//! centred on a 12-bit midpoint. Output keeps the input's interleaving, and
//! only channel 0 of each frame is written.

use super::formats::SampleWidth;

/// Output midpoint (half of a 12-bit range)
pub const OUTPUT_MIDPOINT: f64 = 2047.5;

/// Transform one raw sample.
///
/// The sample is re-centred around half of its unsigned range, scaled by
/// `gain` and shifted to [`OUTPUT_MIDPOINT`]. The result is truncated toward
/// zero and saturated to the signed range of `width`.
pub fn transform_sample(raw: u64, width: SampleWidth, gain: f32) -> i64 {
    let centered = raw as f64 - (width.max_unsigned() / 2) as f64;
    let out = centered * f64::from(gain) + OUTPUT_MIDPOINT;
    match width {
        SampleWidth::One => i64::from(out as i8),
        SampleWidth::Two => i64::from(out as i16),
        SampleWidth::Four => i64::from(out as i32),
    }
}

fn read_sample(raw: &[u8], width: SampleWidth) -> u64 {
    match width {
        SampleWidth::One => u64::from(raw[0]),
        SampleWidth::Two => u64::from(u16::from_le_bytes([raw[0], raw[1]])),
        SampleWidth::Four => u64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
    }
}

fn write_sample(out: &mut [u8], width: SampleWidth, value: i64) {
    match width {
        SampleWidth::One => out[0] = (value as i8) as u8,
        SampleWidth::Two => out[..2].copy_from_slice(&(value as i16).to_le_bytes()),
        SampleWidth::Four => out[..4].copy_from_slice(&(value as i32).to_le_bytes()),
    }
}

/// Transcode whole frames from `input` into `output`.
///
/// `input` holds interleaved frames of `channels * width` bytes; any trailing
/// partial frame is ignored. Returns the number of bytes covered, which is
/// also the length of the meaningful region of `output`. Output positions of
/// channels other than 0 are not written.
pub fn transcode(
    input: &[u8],
    output: &mut [u8],
    width: SampleWidth,
    channels: usize,
    gain: f32,
) -> usize {
    let frame = width.bytes() * channels;
    if frame == 0 {
        return 0;
    }

    let mut covered = 0;
    for (src, dst) in input
        .chunks_exact(frame)
        .zip(output.chunks_exact_mut(frame))
    {
        let value = transform_sample(read_sample(src, width), width, gain);
        write_sample(dst, width, value);
        covered += frame;
    }
    covered
}

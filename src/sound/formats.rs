//! Audio format definitions for the WAVE decoder
//!
//! Holds the 16-byte `fmt ` record and the sample widths the transcoder
//! understands.

use super::chunk::{read_le_u16, read_le_u32};
use super::decoder::{DecodeError, DecodeResult};

/// Length of the PCM `fmt ` record that follows the subchunk header
pub const FMT_RECORD_LEN: usize = 16;

/// WAVE format code for integer PCM
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Bytes per sample for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleWidth {
    /// 8-bit samples
    One = 1,
    /// 16-bit samples
    Two = 2,
    /// 32-bit samples
    Four = 4,
}

impl SampleWidth {
    /// Map a `bits per sample` field onto a supported width
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(SampleWidth::One),
            16 => Some(SampleWidth::Two),
            32 => Some(SampleWidth::Four),
            _ => None,
        }
    }

    /// Returns the number of bytes per sample
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Largest unsigned value a sample of this width can hold
    pub fn max_unsigned(self) -> u64 {
        match self {
            SampleWidth::One => u64::from(u8::MAX),
            SampleWidth::Two => u64::from(u16::MAX),
            SampleWidth::Four => u64::from(u32::MAX),
        }
    }
}

/// Parsed `fmt ` subchunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaveFormat {
    /// Compression code (1 = PCM)
    pub format_tag: u16,
    /// Interleaved channel count
    pub channel_count: u16,
    /// Frames per second
    pub sample_rate: u32,
    /// Bytes per second
    pub byte_rate: u32,
    /// Bytes per frame as declared by the file
    pub block_align: u16,
    /// Bits per sample for one channel
    pub sample_width_bits: u16,
}

impl WaveFormat {
    /// Parse the record from the front of `buf`, or `None` if it is shorter than 16 bytes
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let raw = buf.get(..FMT_RECORD_LEN)?;
        Some(Self {
            format_tag: read_le_u16(&raw[0..2]),
            channel_count: read_le_u16(&raw[2..4]),
            sample_rate: read_le_u32(&raw[4..8]),
            byte_rate: read_le_u32(&raw[8..12]),
            block_align: read_le_u16(&raw[12..14]),
            sample_width_bits: read_le_u16(&raw[14..16]),
        })
    }

    /// Returns the sample width, or `None` for unsupported bit depths
    pub fn sample_width(&self) -> Option<SampleWidth> {
        SampleWidth::from_bits(self.sample_width_bits)
    }

    /// Bytes per interleaved frame as the transcoder walks it
    pub fn frame_len(&self) -> usize {
        self.sample_width().map_or(0, |w| w.bytes()) * usize::from(self.channel_count)
    }

    /// Check that samples in this format can be transcoded into buffers of
    /// `capacity` bytes.
    pub fn validate(&self, capacity: usize) -> DecodeResult<SampleWidth> {
        let width = self
            .sample_width()
            .ok_or(DecodeError::UnsupportedSampleWidth(self.sample_width_bits))?;
        if self.channel_count == 0 {
            return Err(DecodeError::InvalidChannelCount(self.channel_count));
        }
        let frame = width.bytes() * usize::from(self.channel_count);
        if frame > capacity {
            return Err(DecodeError::FrameTooLarge { frame, capacity });
        }
        Ok(width)
    }

    /// Returns true for plain integer PCM
    pub fn is_pcm(&self) -> bool {
        self.format_tag == WAVE_FORMAT_PCM
    }
}

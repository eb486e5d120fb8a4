//! Decoder error taxonomy and sink interfaces
//!
//! Defines what the streaming decoder reports back to its caller: surfaced
//! errors, and the two synchronous sinks that receive formats and samples.

use thiserror::Error;

use super::buffer::BufferSlot;
use super::formats::WaveFormat;

/// Smallest output buffer the decoder accepts
pub const MIN_BUFFER_SIZE: usize = 64;

/// Errors surfaced by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Output buffers are below the supported minimum
    #[error("output buffer too small: {size} bytes (minimum {min})")]
    BufferTooSmall { size: usize, min: usize },

    /// The two output buffers differ in length
    #[error("output buffers differ in size: {a} and {b} bytes")]
    BufferSizeMismatch { a: usize, b: usize },

    /// A chunk size places its end behind the bytes already consumed
    #[error("malformed chunk size: skip target {skip_until} is behind position {processed}")]
    MalformedChunkSize { skip_until: u64, processed: u64 },

    /// `fmt ` declared a bit depth the transcoder cannot handle
    #[error("unsupported sample width: {0} bits")]
    UnsupportedSampleWidth(u16),

    /// `fmt ` declared no channels
    #[error("invalid channel count: {0}")]
    InvalidChannelCount(u16),

    /// A single frame does not fit in an output buffer
    #[error("frame of {frame} bytes does not fit in {capacity}-byte buffers")]
    FrameTooLarge { frame: usize, capacity: usize },
}

impl DecodeError {
    /// Whether the decoder instance must be discarded after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::MalformedChunkSize { .. })
    }
}

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// One filled output buffer handed to the sample sink
#[derive(Debug, Clone, Copy)]
pub struct SampleBlock<'b> {
    /// Channel whose samples were transformed
    pub channel: u8,
    /// Which of the two output buffers holds the samples
    pub slot: BufferSlot,
    /// The filled region of the buffer
    pub samples: &'b [u8],
}

/// Receives transcoded sample buffers
///
/// Called synchronously from `process`. The block borrows the active buffer
/// and must be copied out if it is needed after the call returns.
pub trait SampleSink {
    fn on_samples(&mut self, block: SampleBlock<'_>);
}

impl<F> SampleSink for F
where
    F: FnMut(SampleBlock<'_>),
{
    fn on_samples(&mut self, block: SampleBlock<'_>) {
        self(block)
    }
}

/// Receives each accepted `fmt ` record
pub trait FormatSink {
    fn on_format(&mut self, format: &WaveFormat);
}

impl<F> FormatSink for F
where
    F: FnMut(&WaveFormat),
{
    fn on_format(&mut self, format: &WaveFormat) {
        self(format)
    }
}

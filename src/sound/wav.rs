//! Streaming WAV decoder
//!
//! Decodes RIFF/WAVE streams that arrive in arbitrary pieces. The caller
//! feeds bytes with [`WaveDecoder::process`], which returns how many it
//! consumed; anything left over must be prefixed to the next call. Headers
//! are never consumed partially, so a piece may end anywhere, including in
//! the middle of a header or a sample.
//!
//! Traversal:
//! - `AwaitingTopHeader` reads `RIFF <size> WAVE`; any other top-level
//!   chunk is skipped whole.
//! - `AwaitingSubchunkHeader` reads `fmt ` (format register + format sink),
//!   `data` (start of samples) or skips anything else. Bytes after a `fmt `
//!   record are always read as another subchunk header, never as samples.
//! - `ReadingSampleData` transcodes whole frames into the free output buffer
//!   and hands it to the sample sink.
//! - `SkippingChunk` discards bytes up to an absolute stream offset.
//!
//! No allocation happens while processing; output goes to the two
//! caller-supplied buffers.

use super::buffer::{BufferSlot, DoubleBuffer};
use super::chunk::{
    ChunkHeader, SubchunkHeader, CHUNK_HEADER_LEN, DATA_TAG, FMT_TAG, SUBCHUNK_HEADER_LEN,
};
use super::decoder::{DecodeError, DecodeResult, FormatSink, SampleBlock, SampleSink};
use super::formats::{SampleWidth, WaveFormat, FMT_RECORD_LEN};
use super::transcode::transcode;

/// Traversal state persisted between `process` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Expecting a 12-byte top-level chunk header
    AwaitingTopHeader,
    /// Discarding bytes up to `skip_until`
    SkippingChunk,
    /// Expecting an 8-byte subchunk header
    AwaitingSubchunkHeader,
    /// Inside a `data` subchunk
    ReadingSampleData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Keep going with the rest of the input
    Continue,
    /// Return to the caller
    Yield,
}

/// Incremental RIFF/WAVE decoder over two caller-owned output buffers
pub struct WaveDecoder<'a> {
    buffers: DoubleBuffer<'a>,
    state: DecoderState,
    /// Bytes consumed since creation (or the last reset)
    processed_bytes: u64,
    /// Absolute offset where the current skip ends
    skip_until: u64,
    /// State to enter once the skip is complete
    resume: DecoderState,
    /// Absolute offset where the current `data` body ends
    data_end: u64,
    /// The current `data` body has an odd size and is followed by a pad byte
    data_padded: bool,
    header: ChunkHeader,
    subchunk: SubchunkHeader,
    format: Option<WaveFormat>,
    width: Option<SampleWidth>,
    /// Most recent `fmt ` rejection not yet collected by the caller
    format_error: Option<DecodeError>,
    sample_sink: Option<Box<dyn SampleSink + 'a>>,
    format_sink: Option<Box<dyn FormatSink + 'a>>,
    gain: f32,
}

impl<'a> WaveDecoder<'a> {
    /// Create a decoder writing into `buf_a` and `buf_b`.
    ///
    /// Fails if the buffers differ in length or are smaller than
    /// [`MIN_BUFFER_SIZE`](super::decoder::MIN_BUFFER_SIZE).
    pub fn new(buf_a: &'a mut [u8], buf_b: &'a mut [u8]) -> DecodeResult<Self> {
        let buffers = DoubleBuffer::new(buf_a, buf_b)?;
        Ok(Self {
            buffers,
            state: DecoderState::AwaitingTopHeader,
            processed_bytes: 0,
            skip_until: 0,
            resume: DecoderState::AwaitingSubchunkHeader,
            data_end: 0,
            data_padded: false,
            header: ChunkHeader::default(),
            subchunk: SubchunkHeader::default(),
            format: None,
            width: None,
            format_error: None,
            sample_sink: None,
            format_sink: None,
            gain: 1.0,
        })
    }

    /// Install the sink that receives filled sample buffers
    pub fn set_sample_sink<S: SampleSink + 'a>(&mut self, sink: S) {
        self.sample_sink = Some(Box::new(sink));
    }

    /// Install the sink that receives each accepted `fmt ` record
    pub fn set_format_sink<S: FormatSink + 'a>(&mut self, sink: S) {
        self.format_sink = Some(Box::new(sink));
    }

    /// Set the output gain, clamped to `[0.0, 1.0]` (NaN becomes 0.0)
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_nan() {
            0.0
        } else {
            gain.clamp(0.0, 1.0)
        };
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }

    pub fn skip_until(&self) -> u64 {
        self.skip_until
    }

    /// Last top-level chunk header read
    pub fn chunk_header(&self) -> &ChunkHeader {
        &self.header
    }

    /// Last subchunk header read
    pub fn subchunk_header(&self) -> &SubchunkHeader {
        &self.subchunk
    }

    /// The accepted format, if a valid `fmt ` subchunk has been read
    pub fn format(&self) -> Option<&WaveFormat> {
        self.format.as_ref()
    }

    /// The last `fmt ` record rejection, if any, without clearing it
    pub fn format_error(&self) -> Option<&DecodeError> {
        self.format_error.as_ref()
    }

    /// Collect the last `fmt ` record rejection.
    ///
    /// A rejected record does not stop `process`: its bytes are consumed,
    /// the format is cleared and decoding carries on with the next
    /// subchunk. The rejection stays here until taken or [`reset`](Self::reset).
    pub fn take_format_error(&mut self) -> Option<DecodeError> {
        self.format_error.take()
    }

    /// Bytes left in the current `data` subchunk
    pub fn data_remaining(&self) -> Option<u64> {
        match self.state {
            DecoderState::ReadingSampleData => {
                Some(self.data_end.saturating_sub(self.processed_bytes))
            }
            _ => None,
        }
    }

    /// Capacity of each output buffer
    pub fn buffer_capacity(&self) -> usize {
        self.buffers.capacity()
    }

    /// Buffer most recently handed to the sample sink
    pub fn current_buffer(&self) -> Option<&[u8]> {
        self.buffers.current()
    }

    /// Buffer that the next batch of samples will be written into
    pub fn free_buffer(&self) -> &[u8] {
        self.buffers.free()
    }

    pub fn active_slot(&self) -> Option<BufferSlot> {
        self.buffers.active_slot()
    }

    pub fn free_slot(&self) -> BufferSlot {
        self.buffers.free_slot()
    }

    pub(crate) fn buffer_ptr(&self, slot: BufferSlot) -> *const u8 {
        self.buffers.as_ptr(slot)
    }

    /// Forget all stream state so a new stream can be decoded.
    ///
    /// Buffers, sinks and gain are kept.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingTopHeader;
        self.processed_bytes = 0;
        self.skip_until = 0;
        self.resume = DecoderState::AwaitingSubchunkHeader;
        self.data_end = 0;
        self.data_padded = false;
        self.header = ChunkHeader::default();
        self.subchunk = SubchunkHeader::default();
        self.format = None;
        self.width = None;
        self.format_error = None;
    }

    /// Feed the next piece of the stream.
    ///
    /// Returns the number of bytes consumed from the front of `input`. A
    /// count smaller than `input.len()` means the decoder needs the rest
    /// resubmitted, followed by more data.
    ///
    /// The only error is [`DecodeError::MalformedChunkSize`], which is fatal:
    /// the decoder stays in `SkippingChunk` and must be discarded or
    /// [`reset`](Self::reset). A rejected `fmt ` record is not an error here;
    /// see [`take_format_error`](Self::take_format_error).
    pub fn process(&mut self, input: &[u8]) -> DecodeResult<usize> {
        let start = self.processed_bytes;
        loop {
            let rest = &input[(self.processed_bytes - start) as usize..];
            let step = match self.state {
                DecoderState::AwaitingTopHeader => self.read_top_header(rest),
                DecoderState::SkippingChunk => self.skip(rest)?,
                DecoderState::AwaitingSubchunkHeader => self.read_subchunk_header(rest),
                DecoderState::ReadingSampleData => self.read_samples(rest),
            };
            if step == Step::Yield {
                break;
            }
        }
        Ok((self.processed_bytes - start) as usize)
    }

    fn consume(&mut self, count: usize) {
        self.processed_bytes += count as u64;
    }

    fn begin_skip(&mut self, until: u64, resume: DecoderState) {
        self.skip_until = until;
        self.resume = resume;
        self.state = DecoderState::SkippingChunk;
    }

    /// Read a 12-byte top-level header.
    ///
    /// A foreign chunk is skipped over its whole extent, header included
    /// (`chunk_start + 8 + size`), and the next bytes are read as another
    /// top-level header. Skipping only `chunk_start + size` would land inside
    /// the foreign chunk's body.
    fn read_top_header(&mut self, rest: &[u8]) -> Step {
        let Some(header) = ChunkHeader::parse(rest) else {
            return Step::Yield;
        };
        let chunk_start = self.processed_bytes;
        self.consume(CHUNK_HEADER_LEN);
        self.header = header;

        log::debug!(
            "wave: chunk '{}' type '{}' ({} bytes) at {}",
            header.id,
            header.kind,
            header.size,
            chunk_start
        );

        if header.is_riff_wave() {
            self.state = DecoderState::AwaitingSubchunkHeader;
            Step::Continue
        } else {
            log::debug!("wave: skipping unsupported top-level chunk '{}'", header.id);
            let until = chunk_start + SUBCHUNK_HEADER_LEN as u64 + u64::from(header.size);
            self.begin_skip(until, DecoderState::AwaitingTopHeader);
            Step::Yield
        }
    }

    fn skip(&mut self, rest: &[u8]) -> DecodeResult<Step> {
        if self.skip_until < self.processed_bytes {
            log::error!(
                "wave: invalid chunk size (skip to {} from {})",
                self.skip_until,
                self.processed_bytes
            );
            return Err(DecodeError::MalformedChunkSize {
                skip_until: self.skip_until,
                processed: self.processed_bytes,
            });
        }

        let gap = self.skip_until - self.processed_bytes;
        let take = gap.min(rest.len() as u64) as usize;
        self.consume(take);
        if take as u64 == gap {
            self.state = self.resume;
            Ok(Step::Continue)
        } else {
            Ok(Step::Yield)
        }
    }

    fn read_subchunk_header(&mut self, rest: &[u8]) -> Step {
        let Some(header) = SubchunkHeader::parse(rest) else {
            return Step::Yield;
        };
        let start = self.processed_bytes;
        let end = start + SUBCHUNK_HEADER_LEN as u64 + header.padded_size();

        log::debug!(
            "wave: subchunk '{}' ({} bytes) at {}",
            header.id,
            header.size,
            start
        );

        if header.id.matches(FMT_TAG.as_bytes()) && header.size as usize >= FMT_RECORD_LEN {
            let Some(format) = WaveFormat::parse(&rest[SUBCHUNK_HEADER_LEN..]) else {
                return Step::Yield;
            };
            self.subchunk = header;
            self.consume(SUBCHUNK_HEADER_LEN + FMT_RECORD_LEN);
            if header.size as usize > FMT_RECORD_LEN {
                self.begin_skip(end, DecoderState::AwaitingSubchunkHeader);
            } else {
                self.state = DecoderState::AwaitingSubchunkHeader;
            }
            self.accept_format(format);
            return Step::Continue;
        }

        self.subchunk = header;
        self.consume(SUBCHUNK_HEADER_LEN);

        if header.id.matches(DATA_TAG.as_bytes()) {
            if self.width.is_none() {
                log::warn!("wave: 'data' without a usable format, skipping {} bytes", header.size);
                self.begin_skip(end, DecoderState::AwaitingSubchunkHeader);
                return Step::Yield;
            }
            self.data_end = self.processed_bytes + u64::from(header.size);
            self.data_padded = header.size & 1 == 1;
            self.state = DecoderState::ReadingSampleData;
            return Step::Continue;
        }

        log::debug!("wave: skipping subchunk '{}'", header.id);
        self.begin_skip(end, DecoderState::AwaitingSubchunkHeader);
        Step::Yield
    }

    fn accept_format(&mut self, format: WaveFormat) {
        log::debug!(
            "wave: fmt tag={} channels={} rate={} byte_rate={} align={} bits={}",
            format.format_tag,
            format.channel_count,
            format.sample_rate,
            format.byte_rate,
            format.block_align,
            format.sample_width_bits
        );

        match format.validate(self.buffers.capacity()) {
            Ok(width) => {
                if !format.is_pcm() {
                    log::warn!(
                        "wave: format tag {:#06x} is not integer PCM, decoding as PCM",
                        format.format_tag
                    );
                }
                self.format = Some(format);
                self.width = Some(width);
                if let Some(sink) = self.format_sink.as_mut() {
                    sink.on_format(&format);
                }
            }
            Err(err) => {
                log::warn!("wave: rejecting format: {}", err);
                self.format = None;
                self.width = None;
                self.format_error = Some(err);
            }
        }
    }

    fn finish_data(&mut self) {
        if self.data_padded {
            self.begin_skip(self.data_end + 1, DecoderState::AwaitingSubchunkHeader);
        } else {
            self.state = DecoderState::AwaitingSubchunkHeader;
        }
    }

    fn read_samples(&mut self, rest: &[u8]) -> Step {
        let (Some(format), Some(width)) = (self.format, self.width) else {
            // Only reachable if the format was dropped mid-chunk
            self.begin_skip(self.data_end, DecoderState::AwaitingSubchunkHeader);
            return Step::Continue;
        };
        let channels = usize::from(format.channel_count);
        let frame = format.frame_len();

        let remaining = self.data_end - self.processed_bytes;
        if remaining == 0 {
            self.finish_data();
            return Step::Continue;
        }
        if remaining < frame as u64 {
            log::warn!("wave: dropping {} bytes of partial frame at end of data", remaining);
            let until = self.data_end + u64::from(self.data_padded);
            self.begin_skip(until, DecoderState::AwaitingSubchunkHeader);
            return Step::Continue;
        }

        let capacity = self.buffers.capacity() / frame * frame;
        let available = (rest.len() as u64).min(remaining).min(capacity as u64) as usize;
        let whole = available - available % frame;
        if whole == 0 {
            return Step::Yield;
        }

        let gain = self.gain;
        let (slot, out) = self.buffers.acquire();
        let written = transcode(&rest[..whole], out, width, channels, gain);
        if let Some(sink) = self.sample_sink.as_mut() {
            sink.on_samples(SampleBlock {
                channel: 0,
                slot,
                samples: &out[..written],
            });
        }

        self.consume(whole);
        if whole as u64 == remaining {
            self.finish_data();
        }
        Step::Yield
    }
}

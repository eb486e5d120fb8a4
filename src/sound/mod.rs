//! Streaming WAVE decoding
//!
//! This module provides an incremental RIFF/WAVE decoder that is fed a
//! stream piece by piece and never needs the whole file in memory.
//!
//! # Architecture
//!
//! - `chunk` parses FourCC tags and chunk/subchunk headers
//! - `formats` holds the `fmt ` record and supported sample widths
//! - `buffer` hands out the two caller-supplied output buffers in turn
//! - `transcode` turns raw PCM into gain-adjusted output samples
//! - `wav` drives the traversal state machine
//! - `wav_ffi` exposes the decoder to C callers

pub mod buffer;
pub mod chunk;
pub mod decoder;
pub mod formats;
pub mod transcode;
pub mod wav;
pub mod wav_ffi;

pub use buffer::{BufferSlot, DoubleBuffer};
pub use chunk::{ChunkHeader, FourCC, SubchunkHeader};
pub use decoder::{
    DecodeError, DecodeResult, FormatSink, SampleBlock, SampleSink, MIN_BUFFER_SIZE,
};
pub use formats::{SampleWidth, WaveFormat};
pub use wav::{DecoderState, WaveDecoder};
pub use wav_ffi::WaveDecoderHandle;

//! C FFI bindings for the streaming WAV decoder
//!
//! Exposes [`WaveDecoder`] through an opaque handle so C code can feed it
//! bytes and receive samples through plain function pointers. The caller
//! owns both output buffers and must keep them alive until
//! `wave_decoder_free`.

use std::ffi::c_void;
use std::ptr;
use std::slice;

use super::buffer::BufferSlot;
use super::decoder::{DecodeError, SampleBlock};
use super::formats::WaveFormat;
use super::wav::WaveDecoder;

/// Sample callback: `(user, channel, values, length)`
pub type WaveSampleCallback =
    extern "C" fn(user: *mut c_void, channel: u8, values: *const u8, length: usize);

/// Format callback: `(user, fmt)`
pub type WaveFormatCallback = extern "C" fn(user: *mut c_void, fmt: *const WaveFormatRecord);

/// C layout of the `fmt ` record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaveFormatRecord {
    pub fmt_tag: u16,
    pub ch_count: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub sample_width: u16,
}

impl From<&WaveFormat> for WaveFormatRecord {
    fn from(fmt: &WaveFormat) -> Self {
        Self {
            fmt_tag: fmt.format_tag,
            ch_count: fmt.channel_count,
            sample_rate: fmt.sample_rate,
            byte_rate: fmt.byte_rate,
            block_align: fmt.block_align,
            sample_width: fmt.sample_width_bits,
        }
    }
}

/// Opaque decoder handle handed to C
pub struct WaveDecoderHandle {
    decoder: WaveDecoder<'static>,
}

/// Create a decoder over two caller-owned buffers of `buf_size` bytes each.
///
/// Returns null if either pointer is null, the buffers are the same, or
/// `buf_size` is below the minimum.
///
/// # Safety
/// `buf1` and `buf2` must each point to `buf_size` writable bytes that do
/// not overlap and stay valid until the handle is freed.
#[no_mangle]
pub unsafe extern "C" fn wave_decoder_new(
    buf1: *mut u8,
    buf2: *mut u8,
    buf_size: usize,
) -> *mut WaveDecoderHandle {
    if buf1.is_null() || buf2.is_null() || buf1 == buf2 {
        log::warn!("wave_decoder_new: invalid buffers");
        return ptr::null_mut();
    }

    let a: &'static mut [u8] = slice::from_raw_parts_mut(buf1, buf_size);
    let b: &'static mut [u8] = slice::from_raw_parts_mut(buf2, buf_size);
    match WaveDecoder::new(a, b) {
        Ok(decoder) => Box::into_raw(Box::new(WaveDecoderHandle { decoder })),
        Err(e) => {
            log::warn!("wave_decoder_new: {}", e);
            ptr::null_mut()
        }
    }
}

/// Release a handle created by `wave_decoder_new`.
///
/// # Safety
/// `handle` must come from `wave_decoder_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn wave_decoder_free(handle: *mut WaveDecoderHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Install (or clear, with a null `cb`) the sample callback.
///
/// # Safety
/// `handle` must be a live handle. `user` is passed back untouched.
#[no_mangle]
pub unsafe extern "C" fn wave_set_sample_cb(
    handle: *mut WaveDecoderHandle,
    cb: Option<WaveSampleCallback>,
    user: *mut c_void,
) {
    let Some(handle) = handle.as_mut() else {
        return;
    };
    handle
        .decoder
        .set_sample_sink(move |block: SampleBlock<'_>| {
            if let Some(cb) = cb {
                cb(user, block.channel, block.samples.as_ptr(), block.samples.len());
            }
        });
}

/// Install (or clear, with a null `cb`) the format callback.
///
/// # Safety
/// `handle` must be a live handle. `user` is passed back untouched.
#[no_mangle]
pub unsafe extern "C" fn wave_set_fmt_cb(
    handle: *mut WaveDecoderHandle,
    cb: Option<WaveFormatCallback>,
    user: *mut c_void,
) {
    let Some(handle) = handle.as_mut() else {
        return;
    };
    handle.decoder.set_format_sink(move |fmt: &WaveFormat| {
        if let Some(cb) = cb {
            let record = WaveFormatRecord::from(fmt);
            cb(user, &record);
        }
    });
}

/// Set the output gain (clamped to 0.0..=1.0).
///
/// # Safety
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn wave_set_gain(handle: *mut WaveDecoderHandle, gain: f32) {
    if let Some(handle) = handle.as_mut() {
        handle.decoder.set_gain(gain);
    }
}

/// Feed `size` bytes. Returns the number consumed, or -1 on a fatal error.
///
/// A rejected `fmt ` record does not make this fail; collect it with
/// `wave_take_format_error`.
///
/// # Safety
/// `handle` must be a live handle and `buf` must point to `size` readable
/// bytes. Must not be called from inside a decoder callback.
#[no_mangle]
pub unsafe extern "C" fn wave_process_data(
    handle: *mut WaveDecoderHandle,
    buf: *const u8,
    size: u32,
) -> i32 {
    let Some(handle) = handle.as_mut() else {
        return -1;
    };
    if size > i32::MAX as u32 || (buf.is_null() && size > 0) {
        return -1;
    }
    let input: &[u8] = if size == 0 {
        &[]
    } else {
        slice::from_raw_parts(buf, size as usize)
    };

    match handle.decoder.process(input) {
        Ok(consumed) => consumed as i32,
        Err(e) => {
            log::warn!("wave_process_data: {}", e);
            -1
        }
    }
}

/// Buffer that the next samples will be written into.
///
/// # Safety
/// `handle` must be a live handle. Must not be called from inside a decoder
/// callback, while `wave_process_data` holds the handle.
#[no_mangle]
pub unsafe extern "C" fn wave_get_free_buf(handle: *const WaveDecoderHandle) -> *const u8 {
    match handle.as_ref() {
        Some(handle) => handle.decoder.buffer_ptr(handle.decoder.free_slot()),
        None => ptr::null(),
    }
}

/// Buffer most recently passed to the sample callback, or null before any.
///
/// # Safety
/// `handle` must be a live handle. Must not be called from inside a decoder
/// callback, while `wave_process_data` holds the handle.
#[no_mangle]
pub unsafe extern "C" fn wave_get_cur_buf(handle: *const WaveDecoderHandle) -> *const u8 {
    match handle.as_ref().and_then(|h| h.decoder.active_slot().map(|s| (h, s))) {
        Some((handle, slot)) => handle.decoder.buffer_ptr(slot),
        None => ptr::null(),
    }
}

/// Total bytes consumed by the decoder.
///
/// # Safety
/// `handle` must be a live handle. Must not be called from inside a decoder
/// callback, while `wave_process_data` holds the handle.
#[no_mangle]
pub unsafe extern "C" fn wave_get_processed_bytes(handle: *const WaveDecoderHandle) -> u64 {
    handle
        .as_ref()
        .map_or(0, |handle| handle.decoder.processed_bytes())
}

/// Index of the current buffer: 0 or 1, or -1 before any samples.
///
/// # Safety
/// `handle` must be a live handle. Must not be called from inside a decoder
/// callback, while `wave_process_data` holds the handle.
#[no_mangle]
pub unsafe extern "C" fn wave_get_cur_buf_index(handle: *const WaveDecoderHandle) -> i32 {
    match handle.as_ref().and_then(|h| h.decoder.active_slot()) {
        Some(BufferSlot::A) => 0,
        Some(BufferSlot::B) => 1,
        None => -1,
    }
}

/// Status code for a decoder error, as reported to C
fn error_code(err: &DecodeError) -> i32 {
    match err {
        DecodeError::BufferTooSmall { .. } => 1,
        DecodeError::BufferSizeMismatch { .. } => 2,
        DecodeError::MalformedChunkSize { .. } => 3,
        DecodeError::UnsupportedSampleWidth(_) => 4,
        DecodeError::InvalidChannelCount(_) => 5,
        DecodeError::FrameTooLarge { .. } => 6,
    }
}

/// Collect the last rejected `fmt ` record: 0 if none, otherwise 4
/// (unsupported sample width), 5 (no channels) or 6 (frame larger than a
/// buffer). Returns -1 for a null handle.
///
/// # Safety
/// `handle` must be a live handle. Must not be called from inside a decoder
/// callback, while `wave_process_data` holds the handle.
#[no_mangle]
pub unsafe extern "C" fn wave_take_format_error(handle: *mut WaveDecoderHandle) -> i32 {
    match handle.as_mut() {
        Some(handle) => handle
            .decoder
            .take_format_error()
            .map_or(0, |err| error_code(&err)),
        None => -1,
    }
}

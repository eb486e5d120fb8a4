//! Streaming decoder integration tests
//!
//! These tests drive the decoder the way a collaborator would: feed pieces,
//! keep what was not consumed, prefix it to the next piece.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use rstest::rstest;

use wavestream::sound::{
    BufferSlot, DecodeError, DecoderState, SampleBlock, WaveDecoder, WaveFormat,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Format(WaveFormat),
    Samples(Vec<u8>),
}

type Events = Rc<RefCell<Vec<Event>>>;

fn fmt_chunk(channels: u16, bits: u16, extra: &[u8]) -> Vec<u8> {
    let align = channels * (bits / 8);
    let mut v = Vec::new();
    v.extend_from_slice(b"fmt ");
    v.extend_from_slice(&(16 + extra.len() as u32).to_le_bytes());
    v.extend_from_slice(&1u16.to_le_bytes());
    v.extend_from_slice(&channels.to_le_bytes());
    v.extend_from_slice(&22050u32.to_le_bytes());
    v.extend_from_slice(&(22050u32 * u32::from(align)).to_le_bytes());
    v.extend_from_slice(&align.to_le_bytes());
    v.extend_from_slice(&bits.to_le_bytes());
    v.extend_from_slice(extra);
    if extra.len() % 2 == 1 {
        v.push(0);
    }
    v
}

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(id);
    v.extend_from_slice(&(body.len() as u32).to_le_bytes());
    v.extend_from_slice(body);
    if body.len() % 2 == 1 {
        v.push(0);
    }
    v
}

fn riff(parts: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = parts.concat();
    let mut v = Vec::new();
    v.extend_from_slice(b"RIFF");
    v.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
    v.extend_from_slice(b"WAVE");
    v.extend_from_slice(&body);
    v
}

/// A stream exercising format changes, skipped chunks and pad bytes
fn rich_stream() -> Vec<u8> {
    riff(&[
        fmt_chunk(1, 16, &[]),
        chunk(b"LIST", b"INFO!"),
        chunk(b"data", &[0x00, 0x80, 0xFF, 0x7F, 0x34, 0x12, 0xFF, 0xFF]),
        fmt_chunk(1, 32, &[0xAA, 0xBB]),
        chunk(b"data", &[0x00, 0x00, 0x00, 0x80, 0x10, 0x00, 0x00, 0x80]),
        chunk(b"id3 ", b"tag"),
    ])
}

fn recording_decoder<'a>(a: &'a mut [u8], b: &'a mut [u8], events: &Events) -> WaveDecoder<'a> {
    let mut decoder = WaveDecoder::new(a, b).unwrap();
    let e = Rc::clone(events);
    decoder.set_format_sink(move |fmt: &WaveFormat| e.borrow_mut().push(Event::Format(*fmt)));
    let e = Rc::clone(events);
    decoder.set_sample_sink(move |block: SampleBlock<'_>| {
        e.borrow_mut().push(Event::Samples(block.samples.to_vec()))
    });
    decoder
}

/// Feed `stream` in pieces of the given sizes (cycled), resubmitting leftovers.
/// Returns (total consumed, total submitted).
fn feed_in_pieces(decoder: &mut WaveDecoder<'_>, stream: &[u8], sizes: &[usize]) -> (u64, u64) {
    let mut pending = Vec::new();
    let mut consumed_total = 0u64;
    let mut submitted = 0u64;
    let mut pos = 0;
    let mut sizes = sizes.iter().cycle();

    while pos < stream.len() {
        let size = (*sizes.next().unwrap()).max(1);
        let end = (pos + size).min(stream.len());
        pending.extend_from_slice(&stream[pos..end]);
        submitted += (end - pos) as u64;
        pos = end;

        let mut offset = 0;
        loop {
            let n = decoder.process(&pending[offset..]).unwrap();
            if n == 0 {
                break;
            }
            offset += n;
            consumed_total += n as u64;
        }
        pending.drain(..offset);
    }
    (consumed_total, submitted)
}

/// Merge adjacent sample events so different chunkings compare equal
fn normalize(events: &[Event]) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::new();
    for event in events {
        match (out.last_mut(), event) {
            (Some(Event::Samples(prev)), Event::Samples(next)) => prev.extend_from_slice(next),
            _ => out.push(event.clone()),
        }
    }
    out
}

fn decode_whole(stream: &[u8]) -> Vec<Event> {
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);
    feed_in_pieces(&mut decoder, stream, &[stream.len()]);
    drop(decoder);
    let recorded = events.borrow().clone();
    normalize(&recorded)
}

#[test]
fn test_concrete_minimal_stream() {
    let stream = riff(&[fmt_chunk(1, 16, &[]), chunk(b"data", &[0x00, 0x80, 0xFF, 0x7F])]);
    assert_eq!(stream.len(), 48);

    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);

    assert_eq!(decoder.process(&stream).unwrap(), 48);
    assert_eq!(decoder.processed_bytes(), 48);
    drop(decoder);

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    match &events[0] {
        Event::Format(fmt) => {
            assert_eq!(fmt.channel_count, 1);
            assert_eq!(fmt.sample_width_bits, 16);
        }
        other => panic!("expected format first, got {:?}", other),
    }
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08, 0xFF, 0x07]));
}

#[test]
fn test_rich_stream_whole() {
    let events = decode_whole(&rich_stream());
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], Event::Format(f) if f.sample_width_bits == 16));
    // 0x8000 -> 2048, 0x7FFF -> 2047, 0x1234 -> 0x1234 - 0x7FFF + 2047.5, 0xFFFF saturates
    let third = (0x1234 as f64 - 32767.0 + 2047.5) as i16;
    let mut expected = vec![0x00, 0x08, 0xFF, 0x07];
    expected.extend_from_slice(&third.to_le_bytes());
    expected.extend_from_slice(&i16::MAX.to_le_bytes());
    assert_eq!(events[1], Event::Samples(expected));

    assert!(matches!(&events[2], Event::Format(f) if f.sample_width_bits == 32));
    let mut expected = 2048i32.to_le_bytes().to_vec();
    expected.extend_from_slice(&(0x10 + 2048i32).to_le_bytes());
    assert_eq!(events[3], Event::Samples(expected));
}

#[test]
fn test_one_byte_at_a_time() {
    let stream = rich_stream();
    let expected = decode_whole(&stream);

    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);
    let (consumed, submitted) = feed_in_pieces(&mut decoder, &stream, &[1]);
    assert_eq!(consumed, submitted);
    assert_eq!(decoder.processed_bytes(), stream.len() as u64);
    assert_eq!(decoder.state(), DecoderState::AwaitingSubchunkHeader);
    drop(decoder);

    assert_eq!(normalize(&events.borrow()), expected);
}

#[test]
fn test_foreign_top_level_chunk_skipped() {
    let mut stream = Vec::new();
    stream.extend_from_slice(b"RIFF");
    stream.extend_from_slice(&40u32.to_le_bytes());
    stream.extend_from_slice(b"AVI ");
    stream.extend_from_slice(&fmt_chunk(1, 16, &[])[..]);
    stream.extend_from_slice(&chunk(b"data", &[1, 2, 3, 4]));

    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);
    let (consumed, submitted) = feed_in_pieces(&mut decoder, &stream, &[7, 3, 11]);
    assert_eq!(consumed, submitted);
    assert_eq!(decoder.state(), DecoderState::AwaitingTopHeader);
    assert!(decoder.format().is_none());
    assert!(decoder.current_buffer().is_none());
    drop(decoder);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_foreign_chunk_then_wave() {
    let mut stream = chunk(b"JUNK", &[0xEE; 10]);
    stream.extend_from_slice(&riff(&[
        fmt_chunk(1, 16, &[]),
        chunk(b"data", &[0x00, 0x80]),
    ]));
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08]));
}

#[test]
fn test_unknown_subchunk_after_fmt() {
    let stream = riff(&[
        fmt_chunk(1, 16, &[]),
        chunk(b"fact", &[0x04, 0x00, 0x00, 0x00]),
        chunk(b"data", &[0xFF, 0x7F]),
    ]);
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::Samples(vec![0xFF, 0x07]));
}

#[test]
fn test_trailing_chunk_not_read_as_samples() {
    let stream = riff(&[
        fmt_chunk(1, 16, &[]),
        chunk(b"data", &[0xFF, 0x7F]),
        chunk(b"LIST", &[0x55; 12]),
    ]);
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events.last(), Some(&Event::Samples(vec![0xFF, 0x07])));
}

#[test]
fn test_extensible_fmt_extra_bytes_skipped() {
    let stream = riff(&[
        fmt_chunk(1, 16, &[0u8; 24]),
        chunk(b"data", &[0x00, 0x80]),
    ]);
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08]));
}

#[test]
fn test_data_without_format_is_skipped() {
    let stream = riff(&[chunk(b"data", &[0x00, 0x80]), fmt_chunk(1, 16, &[])]);
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Event::Format(_)));
}

#[test]
fn test_stereo_transforms_channel_zero_only() {
    let stream = riff(&[
        fmt_chunk(2, 16, &[]),
        chunk(b"data", &[0x00, 0x80, 0x11, 0x22, 0xFF, 0x7F, 0x33, 0x44]),
    ]);
    let mut a = [0xEEu8; 64];
    let mut b = [0xEEu8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);
    assert_eq!(decoder.process(&stream).unwrap(), stream.len());
    drop(decoder);
    assert_eq!(
        events.borrow()[1],
        Event::Samples(vec![0x00, 0x08, 0xEE, 0xEE, 0xFF, 0x07, 0xEE, 0xEE])
    );
}

#[test]
fn test_buffers_alternate_between_blocks() {
    let stream = riff(&[fmt_chunk(1, 16, &[]), chunk(b"data", &[0x00, 0x80, 0xFF, 0x7F])]);
    let slots = Rc::new(RefCell::new(Vec::new()));
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let mut decoder = WaveDecoder::new(&mut a, &mut b).unwrap();
    let s = Rc::clone(&slots);
    decoder.set_sample_sink(move |block: SampleBlock<'_>| s.borrow_mut().push(block.slot));

    // Split between the two samples so each one arrives in its own call
    assert_eq!(decoder.process(&stream[..46]).unwrap(), 46);
    assert_eq!(decoder.active_slot(), Some(BufferSlot::A));
    assert_eq!(decoder.free_slot(), BufferSlot::B);
    assert_eq!(decoder.process(&stream[46..]).unwrap(), 2);
    assert_eq!(decoder.active_slot(), Some(BufferSlot::B));
    assert_eq!(&decoder.free_buffer()[..2], &[0x00, 0x08]);
    assert_eq!(&decoder.current_buffer().unwrap()[..2], &[0xFF, 0x07]);
    drop(decoder);

    assert_eq!(*slots.borrow(), vec![BufferSlot::A, BufferSlot::B]);
}

#[test]
fn test_partial_sample_waits_for_more() {
    let stream = riff(&[fmt_chunk(1, 16, &[]), chunk(b"data", &[0x00, 0x80, 0xFF, 0x7F])]);
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let mut decoder = WaveDecoder::new(&mut a, &mut b).unwrap();

    assert_eq!(decoder.process(&stream[..45]).unwrap(), 44);
    assert_eq!(decoder.state(), DecoderState::ReadingSampleData);
    assert_eq!(decoder.data_remaining(), Some(4));
    assert_eq!(decoder.process(&stream[44..45]).unwrap(), 0);
    assert_eq!(decoder.process(&stream[44..]).unwrap(), 4);
    assert_eq!(decoder.data_remaining(), None);
}

#[test]
fn test_odd_data_tail_is_dropped() {
    // Three bytes of 16-bit mono: one whole sample, one stray byte, one pad byte
    let stream = riff(&[
        fmt_chunk(1, 16, &[]),
        chunk(b"data", &[0x00, 0x80, 0x99]),
        chunk(b"data", &[0xFF, 0x7F]),
    ]);
    let events = decode_whole(&stream);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08, 0xFF, 0x07]));
}

#[test]
fn test_rejected_format_then_good_format_in_one_call() {
    let stream = riff(&[
        fmt_chunk(1, 24, &[]),
        fmt_chunk(1, 16, &[]),
        chunk(b"data", &[0x00, 0x80, 0xFF, 0x7F]),
    ]);
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);

    assert_eq!(decoder.process(&stream), Ok(stream.len()));
    assert_eq!(decoder.processed_bytes(), stream.len() as u64);
    assert_eq!(
        decoder.take_format_error(),
        Some(DecodeError::UnsupportedSampleWidth(24))
    );
    assert!(decoder.format().is_some());
    drop(decoder);

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Format(f) if f.sample_width_bits == 16));
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08, 0xFF, 0x07]));
}

#[rstest]
#[case::odd_width(fmt_chunk(1, 12, &[]), DecodeError::UnsupportedSampleWidth(12))]
#[case::no_channels(fmt_chunk(0, 16, &[]), DecodeError::InvalidChannelCount(0))]
#[case::frame_too_large(
    fmt_chunk(17, 32, &[]),
    DecodeError::FrameTooLarge { frame: 68, capacity: 64 }
)]
fn test_rejected_format_skips_data(#[case] fmt: Vec<u8>, #[case] expected: DecodeError) {
    let stream = riff(&[fmt, chunk(b"data", &[0x00, 0x80, 0xFF])]);
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);

    let (consumed, submitted) = feed_in_pieces(&mut decoder, &stream, &[stream.len()]);
    assert_eq!(consumed, submitted);
    assert_eq!(decoder.state(), DecoderState::AwaitingSubchunkHeader);
    assert!(decoder.format().is_none());
    assert_eq!(decoder.take_format_error(), Some(expected));
    drop(decoder);
    assert!(events.borrow().is_empty());
}

#[rstest]
#[case::whole(vec![4096])]
#[case::fives(vec![5])]
#[case::uneven(vec![3, 1, 9])]
fn test_short_fmt_skipped_as_unknown(#[case] sizes: Vec<usize>) {
    let stream = riff(&[
        chunk(b"fmt ", &[0x01; 14]),
        fmt_chunk(1, 16, &[]),
        chunk(b"data", &[0x00, 0x80]),
    ]);
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);

    let (consumed, submitted) = feed_in_pieces(&mut decoder, &stream, &sizes);
    assert_eq!(consumed, submitted);
    assert_eq!(consumed, stream.len() as u64);
    assert!(decoder.format_error().is_none());
    drop(decoder);

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Format(f) if f.sample_width_bits == 16));
    assert_eq!(events[1], Event::Samples(vec![0x00, 0x08]));
}

#[rstest]
#[case::u8_mid(8, vec![0x80], 0.0, vec![0x7F])]
#[case::u16_unity(16, vec![0x00, 0x80], 1.0, vec![0x00, 0x08])]
#[case::u16_half(16, vec![0xFF, 0xFF], 0.5, vec![0xFF, 0x47])]
#[case::u16_silent(16, vec![0x12, 0x34], 0.0, vec![0xFF, 0x07])]
#[case::u32_unity(32, vec![0x00, 0x00, 0x00, 0x80], 1.0, vec![0x00, 0x08, 0x00, 0x00])]
fn test_transform_by_width(
    #[case] bits: u16,
    #[case] samples: Vec<u8>,
    #[case] gain: f32,
    #[case] expected: Vec<u8>,
) {
    let stream = riff(&[fmt_chunk(1, bits, &[]), chunk(b"data", &samples)]);
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    let events: Events = Rc::default();
    let mut decoder = recording_decoder(&mut a, &mut b, &events);
    decoder.set_gain(gain);
    feed_in_pieces(&mut decoder, &stream, &[stream.len()]);
    drop(decoder);
    assert_eq!(events.borrow().last(), Some(&Event::Samples(expected)));
}

proptest! {
    #[test]
    fn prop_any_split_matches_whole(sizes in prop::collection::vec(1usize..40, 1..64)) {
        let stream = rich_stream();
        let expected = decode_whole(&stream);

        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        let events: Events = Rc::default();
        let mut decoder = recording_decoder(&mut a, &mut b, &events);
        let (consumed, submitted) = feed_in_pieces(&mut decoder, &stream, &sizes);

        prop_assert_eq!(consumed, decoder.processed_bytes());
        prop_assert!(consumed <= submitted);
        prop_assert_eq!(consumed, stream.len() as u64);
        drop(decoder);
        prop_assert_eq!(normalize(&events.borrow()), expected);
    }

    #[test]
    fn prop_large_data_any_split(
        samples in prop::collection::vec(any::<u8>(), 0..400).prop_map(|mut v| { v.truncate(v.len() & !1); v }),
        sizes in prop::collection::vec(1usize..100, 1..16),
    ) {
        let stream = riff(&[fmt_chunk(1, 16, &[]), chunk(b"data", &samples)]);
        let expected = decode_whole(&stream);

        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        let events: Events = Rc::default();
        let mut decoder = recording_decoder(&mut a, &mut b, &events);
        feed_in_pieces(&mut decoder, &stream, &sizes);
        drop(decoder);

        let got = normalize(&events.borrow());
        prop_assert_eq!(&got, &expected);
        let produced: usize = got
            .iter()
            .map(|e| match e {
                Event::Samples(s) => s.len(),
                Event::Format(_) => 0,
            })
            .sum();
        prop_assert_eq!(produced, samples.len());
    }
}

//! Stream feeder
//!
//! Drives a [`WaveDecoder`] from any `Read` source the way an embedding
//! application would: read a piece, feed it, keep whatever the decoder did
//! not consume and put it in front of the next piece.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::{self, Read, Write};

use crate::config::Options;
use crate::sound::{SampleBlock, WaveDecoder, WaveFormat};

/// Totals for one decoded stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Last accepted format
    pub format: Option<WaveFormat>,
    /// Number of format records accepted
    pub format_changes: usize,
    /// Number of format records rejected
    pub rejected_formats: usize,
    /// Number of sample buffers produced
    pub blocks: usize,
    /// Bytes of transcoded samples produced
    pub sample_bytes: u64,
    /// Bytes the decoder consumed
    pub processed_bytes: u64,
    /// Bytes left over at end of input (a truncated stream)
    pub undecoded_bytes: usize,
}

#[derive(Default)]
struct Tally {
    summary: Summary,
    write_error: Option<io::Error>,
}

/// Decode everything `reader` yields, writing sample buffers to `output`.
pub fn decode_reader<R: Read, W: Write>(
    mut reader: R,
    output: Option<&mut W>,
    options: &Options,
) -> Result<Summary> {
    let mut buf_a = vec![0u8; options.buffer_size];
    let mut buf_b = vec![0u8; options.buffer_size];
    let mut piece = vec![0u8; options.read_size];
    let mut pending: Vec<u8> = Vec::with_capacity(options.read_size.saturating_mul(2));
    let tally = RefCell::new(Tally::default());

    let mut decoder =
        WaveDecoder::new(&mut buf_a, &mut buf_b).context("Failed to create decoder")?;
    decoder.set_gain(options.gain);
    decoder.set_format_sink(|fmt: &WaveFormat| {
        let mut tally = tally.borrow_mut();
        tally.summary.format = Some(*fmt);
        tally.summary.format_changes += 1;
    });
    let samples_tally = &tally;
    let mut output = output;
    decoder.set_sample_sink(move |block: SampleBlock<'_>| {
        let mut tally = samples_tally.borrow_mut();
        tally.summary.blocks += 1;
        tally.summary.sample_bytes += block.samples.len() as u64;
        if tally.write_error.is_some() {
            return;
        }
        if let Some(out) = output.as_mut() {
            if let Err(e) = out.write_all(block.samples) {
                tally.write_error = Some(e);
            }
        }
    });

    loop {
        let n = match reader.read(&mut piece) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read input"),
        };
        pending.extend_from_slice(&piece[..n]);

        let mut offset = 0;
        loop {
            let consumed = decoder
                .process(&pending[offset..])
                .with_context(|| format!("Decoding failed at byte {}", decoder.processed_bytes()))?;
            if let Some(e) = tally.borrow_mut().write_error.take() {
                return Err(e).context("Failed to write samples");
            }
            if let Some(e) = decoder.take_format_error() {
                log::warn!("skipping samples until a usable format: {}", e);
                tally.borrow_mut().summary.rejected_formats += 1;
            }
            if consumed == 0 {
                break;
            }
            offset += consumed;
        }
        pending.drain(..offset);
    }

    let processed_bytes = decoder.processed_bytes();
    drop(decoder);

    let mut summary = tally.into_inner().summary;
    summary.processed_bytes = processed_bytes;
    summary.undecoded_bytes = pending.len();
    if summary.undecoded_bytes > 0 {
        log::warn!(
            "stream ended with {} undecoded bytes",
            summary.undecoded_bytes
        );
    }
    Ok(summary)
}

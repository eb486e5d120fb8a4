use crate::config::{parse_buffer_size, parse_read_size, parse_volume, Options};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// wavestream - incremental RIFF/WAVE decoder
#[derive(Parser, Debug, Default)]
#[command(name = "wavestream")]
#[command(version)]
#[command(about = "Decode a RIFF/WAVE stream piece by piece", long_about = None)]
pub struct Cli {
    /// Input WAVE file ("-" reads standard input)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write decoded sample buffers to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Size of each output buffer in bytes (minimum 64)
    #[arg(short, long, value_name = "BYTES")]
    pub buffer_size: Option<String>,

    /// Bytes read from the input per step
    #[arg(short, long, value_name = "BYTES")]
    pub read_size: Option<String>,

    /// Output volume (0-100)
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Configuration file (key = value)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        opts.input = Some(self.input.clone());

        if let Some(ref output) = self.output {
            opts.output = Some(output.clone());
        }

        if let Some(ref size) = self.buffer_size {
            opts.buffer_size = parse_buffer_size(size).context("Invalid --buffer-size")?;
        }

        if let Some(ref size) = self.read_size {
            opts.read_size = parse_read_size(size).context("Invalid --read-size")?;
        }

        if let Some(ref vol) = self.volume {
            let int_vol: i32 = vol.parse().context("Invalid volume")?;
            opts.gain = parse_volume(int_vol);
        }

        Ok(opts)
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use wavestream::feeder::{decode_reader, Summary};
use wavestream::logging::{self, LogLevel};
use wavestream::{config, Cli};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    logging::log_init(LogLevel::from_verbosity(cli.verbose))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Config file first, command line overrides it
    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;

    log::info!(
        "buffer size {} bytes, read size {} bytes, gain {:.2}",
        options.buffer_size,
        options.read_size,
        options.gain
    );

    let input = cli.input.as_path();
    let reader: Box<dyn Read> = if input == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(
            File::open(input)
                .with_context(|| format!("Failed to open {}", input.display()))?,
        )
    };

    let summary = match &options.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let summary = decode_reader(reader, Some(&mut writer), &options)?;
            writer.flush().context("Failed to flush output")?;
            summary
        }
        None => decode_reader(reader, None::<&mut io::Sink>, &options)?,
    };

    report(&summary);
    Ok(())
}

fn report(summary: &Summary) {
    match &summary.format {
        Some(fmt) => println!(
            "format: tag {} / {} ch / {} Hz / {} bits / align {}",
            fmt.format_tag, fmt.channel_count, fmt.sample_rate, fmt.sample_width_bits, fmt.block_align
        ),
        None => println!("format: none"),
    }
    println!("consumed: {} bytes", summary.processed_bytes);
    println!(
        "samples: {} bytes in {} buffers",
        summary.sample_bytes, summary.blocks
    );
    if summary.rejected_formats > 0 {
        println!("rejected: {} format records", summary.rejected_formats);
    }
    if summary.undecoded_bytes > 0 {
        println!("undecoded: {} trailing bytes", summary.undecoded_bytes);
    }
}

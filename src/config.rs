use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sound::MIN_BUFFER_SIZE;

/// Default size of each decoder output buffer
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of bytes read from the input per step
pub const DEFAULT_READ_SIZE: usize = 512;

/// Largest accepted per-step read size
pub const MAX_READ_SIZE: usize = 16 * 1024 * 1024;

/// Options for a decoding run, from the config file and command line
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub buffer_size: usize,
    pub read_size: usize,
    pub gain: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_size: DEFAULT_READ_SIZE,
            gain: 1.0,
        }
    }
}

/// Load options from an optional `key = value` file.
///
/// Recognised keys are `buffer_size`, `read_size` and `volume`. Lines
/// starting with `#` are comments; unknown keys are ignored with a warning.
pub fn load_config(path: Option<&Path>) -> Result<Options> {
    let mut options = Options::default();
    let Some(path) = path else {
        return Ok(options);
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    for (lineno, line) in text.lines().enumerate() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .with_context(|| format!("{}:{}: expected key = value", path.display(), lineno + 1))?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "buffer_size" => options.buffer_size = parse_buffer_size(value)?,
            "read_size" => options.read_size = parse_read_size(value)?,
            "volume" => {
                let vol: i32 = value.parse().context("Invalid volume value")?;
                options.gain = parse_volume(vol);
            }
            _ => log::warn!("{}:{}: unknown key '{}'", path.display(), lineno + 1, key),
        }
    }

    Ok(options)
}

/// Parse an output buffer size, which must be at least the decoder minimum
pub fn parse_buffer_size(s: &str) -> Result<usize> {
    let size: usize = s.parse().context("Invalid buffer size")?;
    if size < MIN_BUFFER_SIZE {
        anyhow::bail!("Buffer size must be at least {} bytes", MIN_BUFFER_SIZE);
    }
    Ok(size)
}

/// Parse the per-step read size
pub fn parse_read_size(s: &str) -> Result<usize> {
    let size: usize = s.parse().context("Invalid read size")?;
    if size == 0 {
        anyhow::bail!("Read size must be positive");
    }
    if size > MAX_READ_SIZE {
        anyhow::bail!("Read size must be at most {} bytes", MAX_READ_SIZE);
    }
    Ok(size)
}

/// Parse a volume value (0-100) to a gain (0.0-1.0)
pub fn parse_volume(vol: i32) -> f32 {
    if vol < 0 {
        return 0.0;
    }
    if vol > 100 {
        return 1.0;
    }
    vol as f32 / 100.0
}

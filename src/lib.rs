// wavestream library
// Incremental RIFF/WAVE decoding over caller-supplied buffers

pub mod cli;
pub mod config;
pub mod feeder;
pub mod logging;
pub mod sound;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
pub use sound::{DecodeError, DecodeResult, WaveDecoder, WaveFormat};
